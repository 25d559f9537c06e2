//! Frozen lookup tables produced by a registry build.
//!
//! Each kind gets its own table:
//!
//! - messages: exact map only
//! - callbacks and stages: a [`KeyTable`] (exact map plus an ordered prefix list)
//! - inline queries: a single slot
//!
//! Tables expose read accessors only. Once [`HandlerSet::build`] returns, the
//! contents never change.
//!
//! [`HandlerSet::build`]: super::HandlerSet::build

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use switchyard_core::{MatchRule, TriggerKind};

use crate::handler::BoxedHandler;

// =============================================================================
// Entry
// =============================================================================

/// A registered handler together with the label of its declaration.
pub struct Entry<C> {
    label: String,
    handler: BoxedHandler<C>,
}

impl<C> Entry<C> {
    pub(crate) fn new(label: String, handler: BoxedHandler<C>) -> Self {
        Self { label, handler }
    }

    /// Returns the declaration label (its name, or `#<index>` when unnamed).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the handler.
    pub fn handler(&self) -> &BoxedHandler<C> {
        &self.handler
    }
}

impl<C> Clone for Entry<C> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<C> fmt::Debug for Entry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// KeyTable
// =============================================================================

/// Exact-then-prefix lookup table used for callbacks and stages.
pub struct KeyTable<C> {
    exact: HashMap<String, Entry<C>>,
    /// Registration order is the prefix tie-break.
    prefixed: Vec<(String, Entry<C>)>,
}

impl<C> Default for KeyTable<C> {
    fn default() -> Self {
        Self {
            exact: HashMap::new(),
            prefixed: Vec::new(),
        }
    }
}

impl<C> KeyTable<C> {
    /// Inserts an exact entry, returning the one it replaced.
    pub(crate) fn insert_exact(&mut self, key: String, entry: Entry<C>) -> Option<Entry<C>> {
        self.exact.insert(key, entry)
    }

    /// Inserts a prefix entry, returning the one it replaced.
    ///
    /// A re-registered prefix keeps the position of its first registration.
    pub(crate) fn insert_prefix(&mut self, prefix: String, entry: Entry<C>) -> Option<Entry<C>> {
        match self.prefixed.iter_mut().find(|(p, _)| *p == prefix) {
            Some((_, slot)) => Some(std::mem::replace(slot, entry)),
            None => {
                self.prefixed.push((prefix, entry));
                None
            }
        }
    }

    /// Looks up `key`: exact match first, then the first registered prefix of `key`.
    pub fn lookup(&self, key: &str) -> Option<&Entry<C>> {
        self.exact.get(key).or_else(|| self.lookup_prefix(key))
    }

    /// Looks up an exact entry only.
    pub fn lookup_exact(&self, key: &str) -> Option<&Entry<C>> {
        self.exact.get(key)
    }

    /// Scans prefixes in registration order.
    pub fn lookup_prefix(&self, key: &str) -> Option<&Entry<C>> {
        self.prefixed
            .iter()
            .find(|(prefix, _)| key.starts_with(prefix.as_str()))
            .map(|(_, entry)| entry)
    }

    /// Returns the registered prefixes in tie-break order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.prefixed.iter().map(|(prefix, _)| prefix.as_str())
    }

    /// Returns the number of exact entries.
    pub fn exact_len(&self) -> usize {
        self.exact.len()
    }

    /// Returns the number of prefix entries.
    pub fn prefix_len(&self) -> usize {
        self.prefixed.len()
    }

    /// Returns `true` if the table has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixed.is_empty()
    }

    fn routes(&self, kind: TriggerKind, out: &mut Vec<RouteInfo>) {
        let mut exact: Vec<_> = self.exact.iter().collect();
        exact.sort_by(|a, b| a.0.cmp(b.0));
        out.extend(exact.into_iter().map(|(key, entry)| RouteInfo {
            kind,
            rule: MatchRule::Exact(key.clone()),
            handler: entry.label.clone(),
        }));
        out.extend(self.prefixed.iter().map(|(prefix, entry)| RouteInfo {
            kind,
            rule: MatchRule::Prefix(prefix.clone()),
            handler: entry.label.clone(),
        }));
    }
}

// =============================================================================
// HandlerTables
// =============================================================================

/// One installed route, as reported by [`HandlerTables::routes`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteInfo {
    /// The table the route lives in.
    pub kind: TriggerKind,
    /// How the route is matched.
    pub rule: MatchRule,
    /// The label of the handler serving the route.
    pub handler: String,
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            MatchRule::Exact(key) => write!(f, "{} {key:?} -> {}", self.kind, self.handler),
            MatchRule::Prefix(prefix) => {
                write!(f, "{} {prefix:?}* -> {}", self.kind, self.handler)
            }
            MatchRule::Single => write!(f, "{} -> {}", self.kind, self.handler),
        }
    }
}

/// The complete, frozen set of lookup tables for one bot.
pub struct HandlerTables<C> {
    pub(crate) message: HashMap<String, Entry<C>>,
    pub(crate) callback: KeyTable<C>,
    pub(crate) stage: KeyTable<C>,
    pub(crate) inline_query: Option<Entry<C>>,
    pub(crate) report: super::BuildReport,
}

impl<C> Default for HandlerTables<C> {
    fn default() -> Self {
        Self {
            message: HashMap::new(),
            callback: KeyTable::default(),
            stage: KeyTable::default(),
            inline_query: None,
            report: super::BuildReport::default(),
        }
    }
}

impl<C> HandlerTables<C> {
    /// Places one resolved rule, returning the entry it displaced.
    pub(crate) fn insert(
        &mut self,
        kind: TriggerKind,
        rule: MatchRule,
        entry: Entry<C>,
    ) -> Option<Entry<C>> {
        match (kind, rule) {
            (TriggerKind::InlineQuery, _) => self.inline_query.replace(entry),
            (TriggerKind::Message, MatchRule::Exact(key)) => self.message.insert(key, entry),
            (TriggerKind::Callback, MatchRule::Exact(key)) => {
                self.callback.insert_exact(key, entry)
            }
            (TriggerKind::Callback, MatchRule::Prefix(prefix)) => {
                self.callback.insert_prefix(prefix, entry)
            }
            (TriggerKind::Stage, MatchRule::Exact(key)) => self.stage.insert_exact(key, entry),
            (TriggerKind::Stage, MatchRule::Prefix(prefix)) => {
                self.stage.insert_prefix(prefix, entry)
            }
            // `TriggerMarker::resolve` never yields these combinations.
            (TriggerKind::Message, MatchRule::Prefix(_) | MatchRule::Single)
            | (TriggerKind::Callback | TriggerKind::Stage, MatchRule::Single) => None,
        }
    }

    /// Looks up a message handler by exact text.
    pub fn message(&self, text: &str) -> Option<&Entry<C>> {
        self.message.get(text)
    }

    /// Returns the callback table.
    pub fn callback(&self) -> &KeyTable<C> {
        &self.callback
    }

    /// Returns the stage table.
    pub fn stage(&self) -> &KeyTable<C> {
        &self.stage
    }

    /// Returns the inline-query handler, if one is registered.
    pub fn inline_query(&self) -> Option<&Entry<C>> {
        self.inline_query.as_ref()
    }

    /// Returns what happened during the build that produced these tables.
    pub fn report(&self) -> &super::BuildReport {
        &self.report
    }

    /// Returns the total number of installed routes.
    pub fn len(&self) -> usize {
        self.message.len()
            + self.callback.exact_len()
            + self.callback.prefix_len()
            + self.stage.exact_len()
            + self.stage.prefix_len()
            + usize::from(self.inline_query.is_some())
    }

    /// Returns `true` if no routes are installed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lists every installed route.
    ///
    /// Exact keys are sorted, prefixes keep their tie-break order, so two
    /// builds of the same declarations list identical routes.
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut out = Vec::with_capacity(self.len());

        let mut messages: Vec<_> = self.message.iter().collect();
        messages.sort_by(|a, b| a.0.cmp(b.0));
        out.extend(messages.into_iter().map(|(text, entry)| RouteInfo {
            kind: TriggerKind::Message,
            rule: MatchRule::Exact(text.clone()),
            handler: entry.label.clone(),
        }));

        self.callback.routes(TriggerKind::Callback, &mut out);
        self.stage.routes(TriggerKind::Stage, &mut out);

        if let Some(entry) = &self.inline_query {
            out.push(RouteInfo {
                kind: TriggerKind::InlineQuery,
                rule: MatchRule::Single,
                handler: entry.label.clone(),
            });
        }

        out
    }
}

impl<C> fmt::Debug for HandlerTables<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTables")
            .field("message", &self.message.len())
            .field("callback_exact", &self.callback.exact_len())
            .field("callback_prefix", &self.callback.prefix_len())
            .field("stage_exact", &self.stage.exact_len())
            .field("stage_prefix", &self.stage.prefix_len())
            .field("inline_query", &self.inline_query.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::into_handler;
    use switchyard_core::{Context, EventRef};

    fn entry(label: &str) -> Entry<()> {
        Entry::new(
            label.to_string(),
            into_handler(|_event: EventRef<'_>, _ctx: &Context| {}),
        )
    }

    #[test]
    fn test_exact_before_prefix() {
        let mut table = KeyTable::default();
        table.insert_prefix("admin".into(), entry("prefix"));
        table.insert_exact("admin_panel".into(), entry("exact"));

        assert_eq!(table.lookup("admin_panel").unwrap().label(), "exact");
        assert_eq!(table.lookup("admin_settings").unwrap().label(), "prefix");
        assert!(table.lookup("user").is_none());
    }

    #[test]
    fn test_first_registered_prefix_wins() {
        let mut table = KeyTable::default();
        table.insert_prefix("admin".into(), entry("short"));
        table.insert_prefix("admin_panel".into(), entry("long"));

        assert_eq!(table.lookup("admin_panel_open").unwrap().label(), "short");
    }

    #[test]
    fn test_reregistered_prefix_keeps_position() {
        let mut table = KeyTable::default();
        table.insert_prefix("a".into(), entry("first"));
        table.insert_prefix("ab".into(), entry("second"));
        let replaced = table.insert_prefix("a".into(), entry("third"));

        assert_eq!(replaced.unwrap().label(), "first");
        assert_eq!(table.prefixes().collect::<Vec<_>>(), vec!["a", "ab"]);
        assert_eq!(table.lookup("abc").unwrap().label(), "third");
    }

    #[test]
    fn test_empty_prefix_is_catch_all() {
        let mut table = KeyTable::default();
        table.insert_prefix(String::new(), entry("any"));
        assert_eq!(table.lookup("whatever").unwrap().label(), "any");
    }

    #[test]
    fn test_inline_slot_replaces() {
        let mut tables = HandlerTables::default();
        assert!(
            tables
                .insert(TriggerKind::InlineQuery, MatchRule::Single, entry("a"))
                .is_none()
        );
        let replaced = tables.insert(TriggerKind::InlineQuery, MatchRule::Single, entry("b"));

        assert_eq!(replaced.unwrap().label(), "a");
        assert_eq!(tables.inline_query().unwrap().label(), "b");
        assert_eq!(tables.len(), 1);
    }
}
