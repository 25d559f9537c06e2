//! Menu Bot Example
//!
//! A small ordering bot showing every Switchyard routing table:
//!
//! - messages: `/start`, `/help` (exact text)
//! - callbacks: `menu:open`, `menu:close` (exact) and `menu:item:*` (prefix)
//! - stages: `order:size`, `order:confirm` (exact) and `order:*` (prefix)
//! - inline queries: item search
//!
//! Events are read as JSON lines, one [`Event`] per line:
//!
//! ```text
//! {"type":"message","chat_id":1,"text":"/start"}
//! {"type":"callback","from_id":1,"data":"menu:item:coffee"}
//! {"type":"message","chat_id":1,"text":"large"}
//! {"type":"message","chat_id":1,"text":"yes"}
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package menu-bot -- --input demos/menu_bot/events.jsonl
//! cargo run --package menu-bot -- --routes
//! ```

use std::collections::HashMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use parking_lot::Mutex;
use switchyard::prelude::*;
use tracing::{debug, error, info, warn};

const ITEMS: [&str; 3] = ["coffee", "tea", "cocoa"];
const SIZES: [&str; 3] = ["small", "medium", "large"];

// ============================================================================
// Bot State
// ============================================================================

#[derive(Debug, Default)]
struct Order {
    item: String,
    size: Option<String>,
}

/// State shared by every handler through the dispatch context.
struct Shop {
    stages: Arc<MemoryStageStore>,
    orders: Mutex<HashMap<i64, Order>>,
}

impl Shop {
    fn new(stages: Arc<MemoryStageStore>) -> Self {
        Self {
            stages,
            orders: Mutex::new(HashMap::new()),
        }
    }

    fn reply(&self, chat_id: i64, text: impl Display) {
        println!("[chat {chat_id}] {text}");
    }

    fn finish(&self, chat_id: i64) -> Option<Order> {
        self.stages.clear(chat_id);
        self.orders.lock().remove(&chat_id)
    }
}

type Ctx = Context<Arc<Shop>>;

fn chat_of(event: EventRef<'_>) -> Result<i64, HandlerError> {
    event
        .chat_id()
        .ok_or_else(|| HandlerError::msg(format!("{} event without a chat", event.kind())))
}

// ============================================================================
// Handler Functions
// ============================================================================

/// Shows the menu. Serves both `/start` and the `menu:open` button.
fn show_menu(event: EventRef<'_>, ctx: &Ctx) -> HandlerResult {
    let chat_id = chat_of(event)?;
    let buttons: Vec<String> = ITEMS.iter().map(|item| format!("[menu:item:{item}]")).collect();
    ctx.data()
        .reply(chat_id, format!("Menu: {} [menu:close]", buttons.join(" ")));
    Ok(())
}

fn help(event: EventRef<'_>, ctx: &Ctx) -> HandlerResult {
    let help_text = r"╭──────────────────────────────╮
│     Menu Bot - Commands      │
├──────────────────────────────┤
│ /start  - Show the menu      │
│ /help   - This help          │
│ /cancel - Abandon your order │
╰──────────────────────────────╯";
    ctx.data().reply(chat_of(event)?, help_text);
    Ok(())
}

fn choose_item(event: EventRef<'_>, ctx: &Ctx) -> HandlerResult {
    let chat_id = chat_of(event)?;
    let shop = ctx.data();

    let item = event
        .as_callback()
        .and_then(|callback| callback.data.strip_prefix("menu:item:"))
        .filter(|item| ITEMS.contains(item));
    let Some(item) = item else {
        shop.reply(chat_id, "That item is no longer on the menu.");
        return Ok(());
    };

    shop.orders.lock().insert(
        chat_id,
        Order {
            item: item.to_string(),
            size: None,
        },
    );
    shop.stages.set(chat_id, "order:size".to_string());
    shop.reply(chat_id, format!("One {item}. What size? ({})", SIZES.join("/")));
    Ok(())
}

fn close_menu(event: EventRef<'_>, ctx: &Ctx) -> HandlerResult {
    ctx.data().reply(chat_of(event)?, "Menu closed.");
    Ok(())
}

/// Returns the message text wrapped in a stage event.
fn stage_text(event: EventRef<'_>) -> Option<&str> {
    event.text().map(str::trim)
}

fn order_size(event: EventRef<'_>, ctx: &Ctx) -> HandlerResult {
    let chat_id = chat_of(event)?;
    let shop = ctx.data();

    match stage_text(event) {
        Some("/cancel") => {
            shop.finish(chat_id);
            shop.reply(chat_id, "Order cancelled.");
        }
        Some(size) if SIZES.contains(&size) => {
            let summary = {
                let mut orders = shop.orders.lock();
                let order = orders
                    .get_mut(&chat_id)
                    .ok_or_else(|| HandlerError::msg("size chosen without an order"))?;
                order.size = Some(size.to_string());
                format!("{size} {}", order.item)
            };
            shop.stages.set(chat_id, "order:confirm".to_string());
            shop.reply(chat_id, format!("Confirm one {summary}? (yes/no)"));
        }
        _ => shop.reply(chat_id, format!("Please answer one of {}.", SIZES.join(", "))),
    }
    Ok(())
}

fn order_confirm(event: EventRef<'_>, ctx: &Ctx) -> HandlerResult {
    let chat_id = chat_of(event)?;
    let shop = ctx.data();

    match stage_text(event) {
        Some("yes") => {
            if let Some(order) = shop.finish(chat_id) {
                info!(chat_id, item = %order.item, size = ?order.size, "Order placed");
                shop.reply(chat_id, "Order placed. Thank you!");
            }
        }
        Some("no" | "/cancel") => {
            shop.finish(chat_id);
            shop.reply(chat_id, "Order cancelled.");
        }
        _ => shop.reply(chat_id, "Please answer yes or no."),
    }
    Ok(())
}

/// Catches order stages left over from older versions of the bot.
fn stale_order(event: EventRef<'_>, ctx: &Ctx) -> HandlerResult {
    let chat_id = chat_of(event)?;
    if let Some(stage) = event.as_stage() {
        warn!(chat_id, stage = %stage.stage_key, "Resetting stale order stage");
    }
    ctx.data().finish(chat_id);
    ctx.data().reply(chat_id, "Your order expired. Send /start to begin again.");
    Ok(())
}

fn search(event: EventRef<'_>, _ctx: &Ctx) {
    if let Some(query) = event.as_inline_query() {
        let needle = query.query.to_lowercase();
        let hits: Vec<&str> = ITEMS
            .iter()
            .copied()
            .filter(|item| item.contains(needle.as_str()))
            .collect();
        println!("[inline {}] {}", query.from_id, hits.join(", "));
    }
}

fn handlers() -> HandlerSet<Arc<Shop>> {
    HandlerSet::new()
        .handler(
            "menu",
            [
                TriggerMarker::message("/start"),
                TriggerMarker::callback("menu:open"),
            ],
            show_menu,
        )
        .on_message("/help", help)
        .on_callback_prefix("menu:item:", choose_item)
        .on_callback("menu:close", close_menu)
        .on_stage("order:size", order_size)
        .on_stage("order:confirm", order_confirm)
        .on_stage_prefix("order:", stale_order)
        .on_inline_query(search)
}

// ============================================================================
// Fallback
// ============================================================================

struct Polite;

impl Fallback<Arc<Shop>> for Polite {
    fn on_unknown_message(&self, message: &IncomingMessage, ctx: &Ctx) -> HandlerResult {
        ctx.data().reply(
            message.chat_id,
            format!("Sorry, I don't know '{}'. Try /help.", message.text),
        );
        Ok(())
    }

    fn on_unknown_action(&self, callback: &CallbackEvent) -> HandlerResult {
        warn!(data = %callback.data, chat_id = callback.chat_id(), "Ignoring stale button");
        Ok(())
    }

    fn on_unknown_stage(&self, stage: &StageEvent, ctx: &Ctx) -> HandlerResult {
        if let Some(chat_id) = EventRef::Stage(stage).chat_id() {
            warn!(chat_id, stage = %stage.stage_key, "Unknown stage, resetting conversation");
            ctx.data().finish(chat_id);
        }
        Ok(())
    }
}

// ============================================================================
// Main
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "menu-bot", about = "Route JSON-lines chat events through a menu bot")]
struct Args {
    /// Configuration file (searched in the current directory when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. "production"
    #[arg(short, long)]
    profile: Option<String>,

    /// Read events from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Print the route table and exit
    #[arg(long)]
    routes: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let stages = Arc::new(MemoryStageStore::new());
    let shop = Arc::new(Shop::new(Arc::clone(&stages)));

    let mut builder = BotRuntime::builder()
        .handlers(handlers())
        .fallback(Polite)
        .stage_store(stages);
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build().context("failed to start the menu bot")?;

    if args.routes {
        for route in runtime.dispatcher().tables().routes() {
            println!("{route}");
        }
        return Ok(());
    }

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let event: Event = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = index + 1, error = %e, "Skipping undecodable event");
                continue;
            }
        };

        match runtime.route(event, Arc::clone(&shop)) {
            Ok(outcome) => debug!(line = index + 1, ?outcome, "Event routed"),
            Err(e) => error!(line = index + 1, error = %e, "Handler failed"),
        }
    }

    info!("Input exhausted, shutting down");
    runtime.shutdown();
    Ok(())
}
