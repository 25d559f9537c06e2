//! Trigger markers.
//!
//! A [`TriggerMarker`] describes *when* a handler should run: which table it
//! belongs to ([`TriggerKind`]) and the key it is matched by. Markers are
//! purely declarative. Creating one performs no table insertion and no
//! uniqueness check; that is the registry's job at build time.
//!
//! | kind           | accepted parameters            |
//! |----------------|--------------------------------|
//! | `message`      | exact text                     |
//! | `callback`     | exact data, or prefix          |
//! | `stage`        | exact stage key, or prefix     |
//! | `inline_query` | none (singleton registration)  |
//!
//! Messages have no prefix form. Commands are expected to match exactly,
//! while callback data and stage keys are namespaced hierarchically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MarkerError;

/// The table a trigger points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Plain text messages.
    Message,
    /// Callback queries.
    Callback,
    /// Stage-scoped events.
    Stage,
    /// Inline queries.
    InlineQuery,
}

impl TriggerKind {
    /// All kinds, in table order.
    pub const ALL: [Self; 4] = [Self::Message, Self::Callback, Self::Stage, Self::InlineQuery];

    /// Returns the kind's canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Callback => "callback",
            Self::Stage => "stage",
            Self::InlineQuery => "inline_query",
        }
    }

    /// Returns `true` if this kind supports prefix matching.
    pub fn supports_prefix(self) -> bool {
        matches!(self, Self::Callback | Self::Stage)
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = MarkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "message" => Ok(Self::Message),
            "callback" | "callback_query" => Ok(Self::Callback),
            "stage" => Ok(Self::Stage),
            "inline_query" | "inline" => Ok(Self::InlineQuery),
            other => Err(MarkerError::UnknownKind(other.to_string())),
        }
    }
}

/// How a resolved marker is placed into its table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchRule {
    /// Exact key lookup.
    Exact(String),
    /// Ordered prefix scan.
    Prefix(String),
    /// The single inline-query slot.
    Single,
}

/// An immutable trigger descriptor attached to a handler declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerMarker {
    kind: TriggerKind,
    #[serde(default)]
    exact: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
}

/// Creates a trigger marker from raw parameters.
///
/// This is the general form; the associated constructors on
/// [`TriggerMarker`] cover the well-formed combinations. A marker built here
/// is validated only when the registry resolves it.
pub fn mark(kind: TriggerKind, exact: Option<&str>, prefix: Option<&str>) -> TriggerMarker {
    TriggerMarker {
        kind,
        exact: exact.map(str::to_owned),
        prefix: prefix.map(str::to_owned),
    }
}

impl TriggerMarker {
    /// Matches a message whose text equals `text`.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            kind: TriggerKind::Message,
            exact: Some(text.into()),
            prefix: None,
        }
    }

    /// Matches callback data equal to `data`.
    pub fn callback(data: impl Into<String>) -> Self {
        Self {
            kind: TriggerKind::Callback,
            exact: Some(data.into()),
            prefix: None,
        }
    }

    /// Matches callback data starting with `prefix`.
    pub fn callback_prefix(prefix: impl Into<String>) -> Self {
        Self {
            kind: TriggerKind::Callback,
            exact: None,
            prefix: Some(prefix.into()),
        }
    }

    /// Matches the stage key `stage`.
    pub fn stage(stage: impl Into<String>) -> Self {
        Self {
            kind: TriggerKind::Stage,
            exact: Some(stage.into()),
            prefix: None,
        }
    }

    /// Matches stage keys starting with `prefix`.
    pub fn stage_prefix(prefix: impl Into<String>) -> Self {
        Self {
            kind: TriggerKind::Stage,
            exact: None,
            prefix: Some(prefix.into()),
        }
    }

    /// Matches every inline query.
    pub fn inline_query() -> Self {
        Self {
            kind: TriggerKind::InlineQuery,
            exact: None,
            prefix: None,
        }
    }

    /// Returns the table kind.
    pub fn kind(&self) -> TriggerKind {
        self.kind
    }

    /// Returns the exact key, if set.
    pub fn exact(&self) -> Option<&str> {
        self.exact.as_deref()
    }

    /// Returns the prefix, if set.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Resolves where this marker goes in its table.
    ///
    /// An exact key takes precedence over a prefix when both are present.
    /// Messages only accept an exact key, and inline-query markers ignore any
    /// parameters.
    pub fn resolve(&self) -> Result<MatchRule, MarkerError> {
        match self.kind {
            TriggerKind::InlineQuery => Ok(MatchRule::Single),
            TriggerKind::Message => match &self.exact {
                Some(text) => Ok(MatchRule::Exact(text.clone())),
                None if self.prefix.is_some() => Err(MarkerError::PrefixNotSupported(self.kind)),
                None => Err(MarkerError::MissingKey(self.kind)),
            },
            TriggerKind::Callback | TriggerKind::Stage => {
                match (&self.exact, &self.prefix) {
                    (Some(key), _) => Ok(MatchRule::Exact(key.clone())),
                    (None, Some(prefix)) => Ok(MatchRule::Prefix(prefix.clone())),
                    (None, None) => Err(MarkerError::MissingKey(self.kind)),
                }
            }
        }
    }
}

impl fmt::Display for TriggerMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.exact, &self.prefix) {
            (Some(key), _) => write!(f, "{}={key:?}", self.kind),
            (None, Some(prefix)) => write!(f, "{}*={prefix:?}", self.kind),
            (None, None) => write!(f, "{}", self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_wins_over_prefix() {
        let marker = mark(TriggerKind::Callback, Some("open"), Some("op"));
        assert_eq!(marker.resolve().unwrap(), MatchRule::Exact("open".into()));
    }

    #[test]
    fn test_prefix_only_marker() {
        let marker = TriggerMarker::stage_prefix("order:");
        assert_eq!(marker.resolve().unwrap(), MatchRule::Prefix("order:".into()));
    }

    #[test]
    fn test_message_prefix_is_rejected() {
        let marker = mark(TriggerKind::Message, None, Some("/"));
        assert!(matches!(
            marker.resolve(),
            Err(MarkerError::PrefixNotSupported(TriggerKind::Message))
        ));
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let marker = mark(TriggerKind::Callback, None, None);
        assert!(matches!(
            marker.resolve(),
            Err(MarkerError::MissingKey(TriggerKind::Callback))
        ));
    }

    #[test]
    fn test_inline_query_ignores_parameters() {
        let marker = mark(TriggerKind::InlineQuery, Some("ignored"), None);
        assert_eq!(marker.resolve().unwrap(), MatchRule::Single);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Callback".parse::<TriggerKind>().unwrap(), TriggerKind::Callback);
        assert_eq!("inline".parse::<TriggerKind>().unwrap(), TriggerKind::InlineQuery);
        assert!("poll".parse::<TriggerKind>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(TriggerMarker::message("/help").to_string(), r#"message="/help""#);
        assert_eq!(
            TriggerMarker::callback_prefix("admin").to_string(),
            r#"callback*="admin""#
        );
        assert_eq!(TriggerMarker::inline_query().to_string(), "inline_query");
    }
}
