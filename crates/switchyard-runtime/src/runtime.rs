//! Bot runtime: configuration, handler tables and stage-aware routing.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use switchyard_runtime::BotRuntime;
//!
//! let runtime = BotRuntime::builder()
//!     .config_file("config/switchyard.toml")
//!     .handlers(handlers)
//!     .fallback(Polite)
//!     .build()?;
//!
//! // Messages and callbacks go through the chat's stage first, if it has one.
//! runtime.route(event, app_state.clone())?;
//! ```

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use switchyard_core::{
    CallbackEvent, CancellationToken, Context, Event, IncomingMessage, StageEvent, StagePayload,
};
use switchyard_framework::{DispatchResult, Dispatcher, Fallback, HandlerSet, Outcome};

use crate::config::{ConfigLoader, SwitchyardConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;
use crate::stage::{MemoryStageStore, StageStore};

/// A configured bot ready to route events.
///
/// The runtime owns one [`Dispatcher`] and one [`StageStore`]. Every routed
/// event gets a fresh [`Context`] carrying the caller's data, a child of the
/// runtime's shutdown token, and the configured handler deadline.
pub struct BotRuntime<C = ()> {
    config: SwitchyardConfig,
    dispatcher: Dispatcher<C>,
    stages: Arc<dyn StageStore>,
    shutdown: CancellationToken,
}

impl<C: 'static> BotRuntime<C> {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder<C> {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from a pre-loaded configuration.
    ///
    /// Initializes logging from `config.logging`.
    pub fn from_config(config: SwitchyardConfig, handlers: &HandlerSet<C>) -> RuntimeResult<Self> {
        Self::builder().config(config).handlers(handlers.clone()).build()
    }
}

impl<C> BotRuntime<C> {
    /// Returns the configuration.
    pub fn config(&self) -> &SwitchyardConfig {
        &self.config
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher<C> {
        &self.dispatcher
    }

    /// Returns the stage store shared with handlers.
    pub fn stages(&self) -> &Arc<dyn StageStore> {
        &self.stages
    }

    /// Returns the token that [`shutdown`](Self::shutdown) cancels.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Stops routing: every later call returns [`Outcome::Cancelled`].
    pub fn shutdown(&self) {
        info!("Runtime shutting down");
        self.shutdown.cancel();
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Builds the per-dispatch context for `data`.
    pub fn context(&self, data: C) -> Context<C> {
        let ctx = Context::new(data).with_cancellation(self.shutdown.child_token());
        match self.config.dispatch.handler_timeout() {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    /// Dispatches `event` as-is, ignoring stages.
    pub fn handle(&self, event: &Event, data: C) -> DispatchResult {
        self.dispatcher.dispatch(event, &self.context(data))
    }

    /// Dispatches `event`, sending messages and callbacks through the chat's
    /// stage when it has one.
    pub fn route(&self, event: Event, data: C) -> DispatchResult {
        match event {
            Event::Message(message) => self.route_message(message, data),
            Event::Callback(callback) => self.route_callback(callback, data),
            other => self.handle(&other, data),
        }
    }

    /// Dispatches a message, as a stage event if its chat has a stage.
    pub fn route_message(&self, message: IncomingMessage, data: C) -> DispatchResult {
        let ctx = self.context(data);
        match self.stages.get(message.chat_id) {
            Some(stage) => {
                debug!(chat_id = message.chat_id, stage = %stage, "Routing message through stage");
                let event = StageEvent::new(stage, StagePayload::Message(message));
                self.dispatcher.dispatch_stage(&event, &ctx)
            }
            None => self.dispatcher.dispatch_message(&message, &ctx),
        }
    }

    /// Dispatches a callback, as a stage event if its chat has a stage.
    pub fn route_callback(&self, callback: CallbackEvent, data: C) -> DispatchResult {
        let ctx = self.context(data);
        let chat_id = callback.chat_id();
        match self.stages.get(chat_id) {
            Some(stage) => {
                debug!(chat_id, stage = %stage, "Routing callback through stage");
                let event = StageEvent::new(stage, StagePayload::Callback(callback));
                self.dispatcher.dispatch_stage(&event, &ctx)
            }
            None => self.dispatcher.dispatch_callback(&callback, &ctx),
        }
    }

    /// Delivers caller-defined data to the current stage of `chat_id`.
    ///
    /// Returns [`Outcome::Unmatched`] without dispatching when the chat has
    /// no stage.
    pub fn route_data(&self, chat_id: i64, value: Value, data: C) -> DispatchResult {
        match self.stages.get(chat_id) {
            Some(stage) => {
                let event = StageEvent::new(stage, StagePayload::Data(value));
                self.dispatcher.dispatch_stage(&event, &self.context(data))
            }
            None => {
                debug!(chat_id, "No stage for data event");
                Ok(Outcome::Unmatched)
            }
        }
    }
}

impl<C> std::fmt::Debug for BotRuntime<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotRuntime")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`BotRuntime`].
pub struct RuntimeBuilder<C> {
    config_loader: ConfigLoader,
    config: Option<SwitchyardConfig>,
    handlers: HandlerSet<C>,
    fallback: Option<Arc<dyn Fallback<C>>>,
    stages: Option<Arc<dyn StageStore>>,
    init_logging: bool,
}

impl<C: 'static> Default for RuntimeBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> RuntimeBuilder<C> {
    /// Creates a new runtime builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            config: None,
            handlers: HandlerSet::new(),
            fallback: None,
            stages: None,
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: SwitchyardConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses `config` as-is instead of loading one.
    pub fn config(mut self, config: SwitchyardConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the handler declarations.
    pub fn handlers(mut self, handlers: HandlerSet<C>) -> Self {
        self.handlers = handlers;
        self
    }

    /// Sets the fallback.
    pub fn fallback(mut self, fallback: impl Fallback<C> + 'static) -> Self {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    /// Shares `store` instead of a fresh [`MemoryStageStore`].
    pub fn stage_store(mut self, store: Arc<dyn StageStore>) -> Self {
        self.stages = Some(store);
        self
    }

    /// Skips installing the global tracing subscriber.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads configuration, builds the handler tables and assembles the runtime.
    pub fn build(self) -> RuntimeResult<BotRuntime<C>> {
        let config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let tables = self.handlers.build_with(config.dispatch.conflict_policy)?;
        let mut dispatcher = Dispatcher::new(tables);
        if let Some(fallback) = self.fallback {
            dispatcher = dispatcher.with_shared_fallback(fallback);
        }

        info!(
            routes = dispatcher.tables().len(),
            conflict_policy = ?config.dispatch.conflict_policy,
            handler_timeout_ms = ?config.dispatch.handler_timeout_ms,
            "Runtime ready"
        );

        Ok(BotRuntime {
            config,
            dispatcher,
            stages: self
                .stages
                .unwrap_or_else(|| Arc::new(MemoryStageStore::new())),
            shutdown: CancellationToken::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchConfig;
    use crate::error::RuntimeError;
    use parking_lot::Mutex;
    use switchyard_core::EventRef;
    use switchyard_framework::{BuildError, ConflictPolicy, Fallbacks};

    type Log = Arc<Mutex<Vec<String>>>;

    fn runtime(handlers: HandlerSet<Log>, config: SwitchyardConfig) -> BotRuntime<Log> {
        BotRuntime::builder()
            .config(config)
            .handlers(handlers)
            .without_logging()
            .build()
            .unwrap()
    }

    fn entry(name: &'static str) -> impl Fn(EventRef<'_>, &Context<Log>) + Send + Sync + 'static {
        move |_event: EventRef<'_>, ctx: &Context<Log>| ctx.data().lock().push(name.to_string())
    }

    #[test]
    fn test_stage_takes_priority() {
        let handlers = HandlerSet::new()
            .on_message("/start", entry("start"))
            .on_stage("ask_name", |event: EventRef<'_>, ctx: &Context<Log>| {
                let text = event
                    .as_stage()
                    .and_then(|stage| stage.payload.as_message())
                    .map(|message| message.text.clone())
                    .unwrap_or_default();
                ctx.data().lock().push(format!("name={text}"));
            });
        let runtime = runtime(handlers, SwitchyardConfig::default());
        let log = Log::default();

        runtime
            .route(IncomingMessage::new("/start").in_chat(5).into(), Arc::clone(&log))
            .unwrap();
        runtime.stages().set(5, "ask_name".into());
        runtime
            .route(IncomingMessage::new("Ada").in_chat(5).into(), Arc::clone(&log))
            .unwrap();
        runtime
            .route(IncomingMessage::new("/start").in_chat(6).into(), Arc::clone(&log))
            .unwrap();

        assert_eq!(*log.lock(), vec!["start", "name=Ada", "start"]);
    }

    #[test]
    fn test_callback_uses_originating_chat() {
        let handlers = HandlerSet::new()
            .on_callback_prefix("menu:", entry("menu"))
            .on_stage_prefix("order:", entry("order"));
        let runtime = runtime(handlers, SwitchyardConfig::default());
        runtime.stages().set(9, "order:size".into());
        let log = Log::default();

        let in_stage =
            CallbackEvent::new("menu:small").with_message(IncomingMessage::new("").in_chat(9));
        let free =
            CallbackEvent::new("menu:small").with_message(IncomingMessage::new("").in_chat(10));
        runtime.route_callback(in_stage, Arc::clone(&log)).unwrap();
        runtime.route_callback(free, Arc::clone(&log)).unwrap();

        assert_eq!(*log.lock(), vec!["order", "menu"]);
    }

    #[test]
    fn test_route_data_without_stage() {
        let runtime = runtime(HandlerSet::new(), SwitchyardConfig::default());
        let outcome = runtime
            .route_data(1, serde_json::json!({"ok": true}), Log::default())
            .unwrap();
        assert_eq!(outcome, Outcome::Unmatched);
    }

    #[test]
    fn test_timeout_sets_deadline() {
        let config = SwitchyardConfig {
            dispatch: DispatchConfig {
                handler_timeout_ms: Some(60_000),
                ..Default::default()
            },
            ..Default::default()
        };
        let runtime = runtime(
            HandlerSet::new().on_message("/x", |_event: EventRef<'_>, ctx: &Context<Log>| {
                ctx.data().lock().push(format!("deadline={}", ctx.deadline().is_some()));
            }),
            config,
        );
        let log = Log::default();

        runtime
            .handle(&IncomingMessage::new("/x").into(), Arc::clone(&log))
            .unwrap();
        assert_eq!(*log.lock(), vec!["deadline=true"]);
    }

    #[test]
    fn test_reject_policy_fails_build() {
        let config = SwitchyardConfig {
            dispatch: DispatchConfig {
                conflict_policy: ConflictPolicy::Reject,
                ..Default::default()
            },
            ..Default::default()
        };
        let handlers = HandlerSet::<Log>::new()
            .on_message("/x", entry("a"))
            .on_message("/x", entry("b"));

        let err = BotRuntime::builder()
            .config(config)
            .handlers(handlers)
            .without_logging()
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Build(BuildError::RegistrationConflict { .. })
        ));
    }

    #[test]
    fn test_invalid_config_fails_build() {
        let mut config = SwitchyardConfig::default();
        config.dispatch.handler_timeout_ms = Some(0);

        let err = BotRuntime::<()>::builder()
            .config(config)
            .without_logging()
            .build()
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
    }

    #[test]
    fn test_shutdown_cancels_routing() {
        let log = Log::default();
        let fallback_log = Arc::clone(&log);
        let runtime = BotRuntime::builder()
            .config(SwitchyardConfig::default())
            .handlers(HandlerSet::new().on_message("/x", entry("x")))
            .fallback(Fallbacks::<Log>::new().unknown_message(move |_message, _ctx| {
                fallback_log.lock().push("fallback".to_string());
            }))
            .without_logging()
            .build()
            .unwrap();

        runtime.shutdown();
        let outcome = runtime
            .route(IncomingMessage::new("/x").into(), Arc::clone(&log))
            .unwrap();

        assert!(runtime.is_shut_down());
        assert_eq!(outcome, Outcome::Cancelled);
        assert!(log.lock().is_empty());
    }
}
