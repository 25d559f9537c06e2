//! Handler registry.
//!
//! Handlers are declared explicitly and in order on a [`HandlerSet`]. Each
//! [`Declaration`] pairs one handler with one or more [`TriggerMarker`]s. The
//! set is turned into frozen [`HandlerTables`] by [`HandlerSet::build`]:
//!
//! 1. Declarations are visited in the order they were added
//! 2. Each marker is resolved and inserted into the table its kind selects
//! 3. A later declaration claiming the same key replaces the earlier one
//! 4. Declarations that cannot be resolved are skipped, never fatal
//!
//! ```rust,ignore
//! use switchyard_framework::{HandlerSet, TriggerMarker};
//!
//! let set = HandlerSet::new()
//!     .on_message("/start", start)
//!     .on_callback_prefix("admin", admin_menu)
//!     .handler("help", [TriggerMarker::message("/help"), TriggerMarker::callback("help")], help)
//!     .on_inline_query(inline);
//!
//! let tables = set.build();
//! ```
//!
//! [`ConflictPolicy::Reject`] turns duplicate keys into a [`BuildError`]
//! instead of overwriting.

mod table;

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use switchyard_core::{
    BoxError, Context, EventRef, MarkerError, MatchRule, TriggerKind, TriggerMarker,
};

use crate::error::{BuildError, BuildResult};
use crate::handler::{BoxedHandler, IntoHandlerResult, into_handler};

pub use table::{Entry, HandlerTables, KeyTable, RouteInfo};

/// A deferred handler lookup that may fail at build time.
pub type HandlerFactory<C> = Arc<dyn Fn() -> Result<BoxedHandler<C>, BoxError> + Send + Sync>;

// =============================================================================
// Conflict Policy
// =============================================================================

/// What a build does when two declarations claim the same key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The later declaration replaces the earlier one.
    #[default]
    Overwrite,
    /// The build fails with [`BuildError::RegistrationConflict`].
    Reject,
}

// =============================================================================
// Declaration
// =============================================================================

enum Source<C> {
    Ready(BoxedHandler<C>),
    Deferred(HandlerFactory<C>),
}

impl<C> Clone for Source<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Ready(handler) => Self::Ready(Arc::clone(handler)),
            Self::Deferred(factory) => Self::Deferred(Arc::clone(factory)),
        }
    }
}

/// One declared handler and the triggers it answers to.
pub struct Declaration<C> {
    name: Option<String>,
    markers: Vec<TriggerMarker>,
    source: Source<C>,
}

impl<C> Clone for Declaration<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            markers: self.markers.clone(),
            source: self.source.clone(),
        }
    }
}

impl<C: 'static> Declaration<C> {
    /// Declares a handler function.
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(EventRef<'_>, &Context<C>) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        Self::boxed(into_handler(f))
    }

    /// Declares a handler that is looked up when the set is built.
    ///
    /// If `factory` fails, the build logs the error and skips this
    /// declaration; every other declaration is still registered.
    pub fn deferred<G, E>(factory: G) -> Self
    where
        G: Fn() -> Result<BoxedHandler<C>, E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        Self {
            name: None,
            markers: Vec::new(),
            source: Source::Deferred(Arc::new(
                move || -> Result<BoxedHandler<C>, BoxError> { factory().map_err(Into::into) },
            )),
        }
    }
}

impl<C> Declaration<C> {
    /// Declares a pre-built handler.
    pub fn boxed(handler: BoxedHandler<C>) -> Self {
        Self {
            name: None,
            markers: Vec::new(),
            source: Source::Ready(handler),
        }
    }

    /// Names the declaration for diagnostics.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a trigger.
    pub fn trigger(mut self, marker: TriggerMarker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Adds several triggers, in order.
    pub fn triggers(mut self, markers: impl IntoIterator<Item = TriggerMarker>) -> Self {
        self.markers.extend(markers);
        self
    }

    /// Returns the name, if set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the triggers in declaration order.
    pub fn markers(&self) -> &[TriggerMarker] {
        &self.markers
    }

    fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{index}"),
        }
    }

    fn resolve_handler(&self) -> Result<BoxedHandler<C>, BoxError> {
        match &self.source {
            Source::Ready(handler) => Ok(Arc::clone(handler)),
            Source::Deferred(factory) => factory(),
        }
    }
}

impl<C> fmt::Debug for Declaration<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("name", &self.name)
            .field("markers", &self.markers)
            .field("deferred", &matches!(self.source, Source::Deferred(_)))
            .finish()
    }
}

// =============================================================================
// HandlerSource
// =============================================================================

/// A group of handlers that declares itself onto a [`HandlerSet`].
///
/// Useful for splitting a bot into modules:
///
/// ```rust,ignore
/// struct AdminModule;
///
/// impl HandlerSource<AppState> for AdminModule {
///     fn declare(&self, set: HandlerSet<AppState>) -> HandlerSet<AppState> {
///         set.on_callback_prefix("admin:", admin_menu)
///            .on_message("/admin", admin_entry)
///     }
/// }
///
/// let set = HandlerSet::new().mount(&AdminModule);
/// ```
pub trait HandlerSource<C> {
    /// Adds this source's declarations to `set`.
    fn declare(&self, set: HandlerSet<C>) -> HandlerSet<C>;
}

// =============================================================================
// Build Report
// =============================================================================

/// Why a declaration or one of its markers was not registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The deferred handler lookup failed.
    Unavailable(String),
    /// A marker could not be placed.
    Malformed {
        /// The offending marker.
        marker: TriggerMarker,
        /// What is wrong with it.
        error: MarkerError,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "handler unavailable: {reason}"),
            Self::Malformed { marker, error } => write!(f, "malformed trigger {marker}: {error}"),
        }
    }
}

/// A declaration (or marker) the build skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    /// The declaration's label.
    pub declaration: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// A key that was claimed by more than one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overwrite {
    /// The table the key lives in.
    pub kind: TriggerKind,
    /// The contested key or prefix (empty for the inline slot).
    pub key: String,
    /// The declaration that lost.
    pub replaced: String,
    /// The declaration that now serves the key.
    pub winner: String,
}

/// What happened during a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Number of markers inserted (including ones later overwritten).
    pub registered: usize,
    /// Declarations or markers that were skipped.
    pub skipped: Vec<Skipped>,
    /// Keys claimed more than once, in the order the collisions happened.
    pub overwritten: Vec<Overwrite>,
}

impl BuildReport {
    /// Returns `true` if nothing was skipped or overwritten.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.overwritten.is_empty()
    }
}

// =============================================================================
// HandlerSet
// =============================================================================

/// An ordered list of handler declarations.
pub struct HandlerSet<C = ()> {
    declarations: Vec<Declaration<C>>,
}

impl<C> Default for HandlerSet<C> {
    fn default() -> Self {
        Self {
            declarations: Vec::new(),
        }
    }
}

impl<C> Clone for HandlerSet<C> {
    fn clone(&self) -> Self {
        Self {
            declarations: self.declarations.clone(),
        }
    }
}

impl<C> fmt::Debug for HandlerSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSet")
            .field("declarations", &self.declarations)
            .finish()
    }
}

impl<C: 'static> HandlerSet<C> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declaration.
    pub fn push(&mut self, declaration: Declaration<C>) {
        self.declarations.push(declaration);
    }

    /// Adds a declaration (builder pattern).
    pub fn declare(mut self, declaration: Declaration<C>) -> Self {
        self.push(declaration);
        self
    }

    /// Lets a [`HandlerSource`] add its declarations.
    pub fn mount(self, source: &impl HandlerSource<C>) -> Self {
        source.declare(self)
    }

    /// Declares a named handler with any number of triggers.
    pub fn handler<F, R>(
        self,
        name: impl Into<String>,
        markers: impl IntoIterator<Item = TriggerMarker>,
        f: F,
    ) -> Self
    where
        F: Fn(EventRef<'_>, &Context<C>) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.declare(Declaration::new(f).named(name).triggers(markers))
    }

    /// Declares a named handler whose lookup may fail at build time.
    pub fn try_handler<G, E>(
        self,
        name: impl Into<String>,
        markers: impl IntoIterator<Item = TriggerMarker>,
        factory: G,
    ) -> Self
    where
        G: Fn() -> Result<BoxedHandler<C>, E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        self.declare(Declaration::deferred(factory).named(name).triggers(markers))
    }

    /// Declares a message handler matching `text` exactly.
    pub fn on_message<F, R>(self, text: impl Into<String>, f: F) -> Self
    where
        F: Fn(EventRef<'_>, &Context<C>) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.declare(Declaration::new(f).trigger(TriggerMarker::message(text)))
    }

    /// Declares a callback handler matching `data` exactly.
    pub fn on_callback<F, R>(self, data: impl Into<String>, f: F) -> Self
    where
        F: Fn(EventRef<'_>, &Context<C>) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.declare(Declaration::new(f).trigger(TriggerMarker::callback(data)))
    }

    /// Declares a callback handler matching data that starts with `prefix`.
    pub fn on_callback_prefix<F, R>(self, prefix: impl Into<String>, f: F) -> Self
    where
        F: Fn(EventRef<'_>, &Context<C>) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.declare(Declaration::new(f).trigger(TriggerMarker::callback_prefix(prefix)))
    }

    /// Declares a stage handler matching `stage` exactly.
    pub fn on_stage<F, R>(self, stage: impl Into<String>, f: F) -> Self
    where
        F: Fn(EventRef<'_>, &Context<C>) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.declare(Declaration::new(f).trigger(TriggerMarker::stage(stage)))
    }

    /// Declares a stage handler matching stage keys that start with `prefix`.
    pub fn on_stage_prefix<F, R>(self, prefix: impl Into<String>, f: F) -> Self
    where
        F: Fn(EventRef<'_>, &Context<C>) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.declare(Declaration::new(f).trigger(TriggerMarker::stage_prefix(prefix)))
    }

    /// Declares the inline-query handler. A later call replaces this one.
    pub fn on_inline_query<F, R>(self, f: F) -> Self
    where
        F: Fn(EventRef<'_>, &Context<C>) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.declare(Declaration::new(f).trigger(TriggerMarker::inline_query()))
    }
}

impl<C> HandlerSet<C> {
    /// Returns the declarations in order.
    pub fn declarations(&self) -> &[Declaration<C>] {
        &self.declarations
    }

    /// Returns the number of declarations.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Returns `true` if nothing has been declared.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Builds the lookup tables, letting later declarations win on duplicate keys.
    ///
    /// The set itself is not consumed, so building twice yields two tables
    /// with identical routes.
    pub fn build(&self) -> HandlerTables<C> {
        let Ok(tables) = self.assemble(|_| Ok::<(), Infallible>(()));
        tables
    }

    /// Builds the lookup tables under the given conflict policy.
    ///
    /// Under [`ConflictPolicy::Reject`] the build stops at the first key
    /// claimed twice.
    pub fn build_with(&self, policy: ConflictPolicy) -> BuildResult<HandlerTables<C>> {
        match policy {
            ConflictPolicy::Overwrite => Ok(self.build()),
            ConflictPolicy::Reject => self.assemble(|conflict| {
                Err(BuildError::RegistrationConflict {
                    kind: conflict.kind,
                    key: conflict.key.clone(),
                    first: conflict.replaced.clone(),
                    second: conflict.winner.clone(),
                })
            }),
        }
    }

    /// `on_conflict` sees every duplicate key before it is recorded as an
    /// overwrite. An error from it aborts the build.
    fn assemble<E>(
        &self,
        mut on_conflict: impl FnMut(&Overwrite) -> Result<(), E>,
    ) -> Result<HandlerTables<C>, E> {
        let mut tables = HandlerTables::default();
        let mut report = BuildReport::default();

        for (index, declaration) in self.declarations.iter().enumerate() {
            let label = declaration.label(index);

            if declaration.markers.is_empty() {
                trace!(declaration = %label, "Declaration has no triggers, ignoring");
                continue;
            }

            let handler = match declaration.resolve_handler() {
                Ok(handler) => handler,
                Err(e) => {
                    warn!(declaration = %label, error = %e, "Skipping unavailable handler");
                    report.skipped.push(Skipped {
                        declaration: label,
                        reason: SkipReason::Unavailable(e.to_string()),
                    });
                    continue;
                }
            };

            for marker in &declaration.markers {
                let rule = match marker.resolve() {
                    Ok(rule) => rule,
                    Err(error) => {
                        warn!(
                            declaration = %label,
                            marker = %marker,
                            %error,
                            "Skipping malformed trigger"
                        );
                        report.skipped.push(Skipped {
                            declaration: label.clone(),
                            reason: SkipReason::Malformed {
                                marker: marker.clone(),
                                error,
                            },
                        });
                        continue;
                    }
                };

                let kind = marker.kind();
                let key = match &rule {
                    MatchRule::Exact(key) | MatchRule::Prefix(key) => key.clone(),
                    MatchRule::Single => String::new(),
                };

                let entry = Entry::new(label.clone(), Arc::clone(&handler));
                if let Some(previous) = tables.insert(kind, rule, entry) {
                    let overwrite = Overwrite {
                        kind,
                        key,
                        replaced: previous.label().to_string(),
                        winner: label.clone(),
                    };
                    on_conflict(&overwrite)?;
                    warn!(
                        kind = %kind,
                        key = %overwrite.key,
                        replaced = %overwrite.replaced,
                        winner = %label,
                        "Trigger registered twice, later declaration wins"
                    );
                    report.overwritten.push(overwrite);
                } else {
                    debug!(declaration = %label, marker = %marker, "Registered trigger");
                }
                report.registered += 1;
            }
        }

        info!(
            declarations = self.declarations.len(),
            routes = tables.len(),
            skipped = report.skipped.len(),
            overwritten = report.overwritten.len(),
            "Handler tables built"
        );

        tables.report = report;
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::mark;

    fn noop(_event: EventRef<'_>, _ctx: &Context) {}

    #[test]
    fn test_build_places_each_kind() {
        let tables = HandlerSet::new()
            .on_message("/start", noop)
            .on_callback("menu", noop)
            .on_callback_prefix("menu:", noop)
            .on_stage("ask_name", noop)
            .on_stage_prefix("order:", noop)
            .on_inline_query(noop)
            .build();

        assert!(tables.message("/start").is_some());
        assert_eq!(tables.callback().exact_len(), 1);
        assert_eq!(tables.callback().prefix_len(), 1);
        assert_eq!(tables.stage().exact_len(), 1);
        assert_eq!(tables.stage().prefix_len(), 1);
        assert!(tables.inline_query().is_some());
        assert_eq!(tables.len(), 6);
        assert!(tables.report().is_clean());
    }

    #[test]
    fn test_stacked_markers_share_one_handler() {
        let tables = HandlerSet::new()
            .handler(
                "help",
                [
                    TriggerMarker::message("/help"),
                    TriggerMarker::callback("help"),
                    TriggerMarker::stage_prefix("help:"),
                ],
                noop,
            )
            .build();

        assert_eq!(tables.message("/help").unwrap().label(), "help");
        assert_eq!(tables.callback().lookup("help").unwrap().label(), "help");
        assert_eq!(tables.stage().lookup("help:faq").unwrap().label(), "help");
        assert_eq!(tables.report().registered, 3);
    }

    #[test]
    fn test_unnamed_declarations_are_labelled_by_index() {
        let tables = HandlerSet::new()
            .on_message("a", noop)
            .on_message("b", noop)
            .build();

        assert_eq!(tables.message("b").unwrap().label(), "#1");
    }

    #[test]
    fn test_declaration_without_triggers_is_ignored() {
        let set = HandlerSet::new()
            .declare(Declaration::new(noop).named("lifecycle"))
            .on_message("/start", noop);
        let tables = set.build();

        assert_eq!(tables.len(), 1);
        assert!(tables.report().is_clean());
    }

    #[test]
    fn test_malformed_marker_is_skipped_but_siblings_register() {
        let tables = HandlerSet::new()
            .declare(
                Declaration::new(noop)
                    .named("mixed")
                    .trigger(mark(TriggerKind::Message, None, Some("/")))
                    .trigger(TriggerMarker::message("/ok")),
            )
            .build();

        assert!(tables.message("/ok").is_some());
        assert_eq!(tables.report().skipped.len(), 1);
        assert!(matches!(
            tables.report().skipped[0].reason,
            SkipReason::Malformed {
                error: MarkerError::PrefixNotSupported(TriggerKind::Message),
                ..
            }
        ));
    }

    #[test]
    fn test_failing_factory_is_skipped() {
        let tables = HandlerSet::new()
            .try_handler("broken", [TriggerMarker::message("/broken")], || {
                Err::<BoxedHandler<()>, _>("member is private")
            })
            .try_handler("ok", [TriggerMarker::message("/ok")], || {
                Ok::<_, BoxError>(into_handler(noop))
            })
            .build();

        assert!(tables.message("/broken").is_none());
        assert!(tables.message("/ok").is_some());
        assert_eq!(
            tables.report().skipped,
            vec![Skipped {
                declaration: "broken".into(),
                reason: SkipReason::Unavailable("member is private".into()),
            }]
        );
    }

    #[test]
    fn test_reject_policy_reports_conflict() {
        let set = HandlerSet::new()
            .handler("first", [TriggerMarker::callback("x")], noop)
            .handler("second", [TriggerMarker::callback("x")], noop);

        let err = set.build_with(ConflictPolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            BuildError::RegistrationConflict {
                kind: TriggerKind::Callback,
                key: "x".into(),
                first: "first".into(),
                second: "second".into(),
            }
        );

        let tables = set.build_with(ConflictPolicy::Overwrite).unwrap();
        assert_eq!(tables.callback().lookup("x").unwrap().label(), "second");
    }

    #[test]
    fn test_reject_policy_stops_at_first_conflict() {
        let set = HandlerSet::new()
            .handler("stage_a", [TriggerMarker::stage("ask")], noop)
            .handler("inline_a", [TriggerMarker::inline_query()], noop)
            .handler("stage_b", [TriggerMarker::stage("ask")], noop)
            .handler("inline_b", [TriggerMarker::inline_query()], noop);

        let err = set.build_with(ConflictPolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            BuildError::RegistrationConflict {
                kind: TriggerKind::Stage,
                key: "ask".into(),
                first: "stage_a".into(),
                second: "stage_b".into(),
            }
        );

        let tables = set.build_with(ConflictPolicy::Overwrite).unwrap();
        assert_eq!(tables.report().overwritten.len(), 2);
    }

    #[test]
    fn test_inline_query_is_singleton() {
        let tables = HandlerSet::new()
            .handler("old", [TriggerMarker::inline_query()], noop)
            .handler("new", [TriggerMarker::inline_query()], noop)
            .build();

        assert_eq!(tables.inline_query().unwrap().label(), "new");
        assert_eq!(tables.report().overwritten.len(), 1);
        assert_eq!(tables.report().overwritten[0].key, "");
    }

    #[test]
    fn test_routes_listing() {
        let tables = HandlerSet::new()
            .handler("b", [TriggerMarker::message("/b")], noop)
            .handler("a", [TriggerMarker::message("/a")], noop)
            .handler("p2", [TriggerMarker::callback_prefix("z")], noop)
            .handler("p1", [TriggerMarker::callback_prefix("y")], noop)
            .build();

        let routes: Vec<_> = tables.routes().iter().map(ToString::to_string).collect();
        assert_eq!(
            routes,
            vec![
                r#"message "/a" -> a"#,
                r#"message "/b" -> b"#,
                r#"callback "z"* -> p2"#,
                r#"callback "y"* -> p1"#,
            ]
        );
        assert_eq!(tables.routes()[0].rule, MatchRule::Exact("/a".into()));
    }

    struct Admin;

    impl HandlerSource<()> for Admin {
        fn declare(&self, set: HandlerSet<()>) -> HandlerSet<()> {
            set.on_callback_prefix("admin:", noop).on_message("/admin", noop)
        }
    }

    #[test]
    fn test_mount_source() {
        let set = HandlerSet::new().on_message("/start", noop).mount(&Admin);
        assert_eq!(set.len(), 3);
        assert_eq!(set.build().len(), 3);
    }
}
