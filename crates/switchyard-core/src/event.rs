//! Event model for the Switchyard dispatch core.
//!
//! Events are produced by an upstream decoder (out of scope for this crate)
//! and handed to the dispatcher one at a time. Exactly one [`Event`] variant
//! is active per dispatch call:
//!
//! ```text
//! Event
//! ├── Message(IncomingMessage)       routed by exact text
//! ├── Callback(CallbackEvent)        routed by exact data, then prefix
//! │   └── message: Option<IncomingMessage>
//! ├── InlineQuery(InlineQueryEvent)  routed to the single inline handler
//! └── Stage(StageEvent)              routed by exact stage key, then prefix
//!     └── payload: StagePayload
//! ```
//!
//! All types implement serde's `Serialize`/`Deserialize`, so a decoder (or a
//! test) can build them straight from JSON:
//!
//! ```rust,ignore
//! let event: Event = serde_json::from_str(r#"{"type":"message","chat_id":7,"text":"/start"}"#)?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::trigger::TriggerKind;

// ============================================================================
// Leaf event shapes
// ============================================================================

/// A plain text message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Provider-assigned message identifier.
    #[serde(default)]
    pub message_id: i64,
    /// The chat the message was posted in.
    #[serde(default)]
    pub chat_id: i64,
    /// The literal message text.
    #[serde(default)]
    pub text: String,
}

impl IncomingMessage {
    /// Creates a message with the given text and zeroed identifiers.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Sets the chat identifier.
    pub fn in_chat(mut self, chat_id: i64) -> Self {
        self.chat_id = chat_id;
        self
    }
}

/// A callback query raised by pressing an inline keyboard button.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackEvent {
    /// Provider-assigned query identifier.
    #[serde(default)]
    pub id: String,
    /// The user that pressed the button.
    #[serde(default)]
    pub from_id: i64,
    /// The callback data attached to the button.
    #[serde(default)]
    pub data: String,
    /// The message the button was attached to, if the provider sent it.
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

impl CallbackEvent {
    /// Creates a callback event carrying the given data.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    /// Attaches the originating message.
    pub fn with_message(mut self, message: IncomingMessage) -> Self {
        self.message = Some(message);
        self
    }

    /// Returns the chat this callback belongs to.
    ///
    /// Falls back to the sender's id when the originating message is absent,
    /// which is what private chats use as their chat id.
    pub fn chat_id(&self) -> i64 {
        self.message
            .as_ref()
            .map_or(self.from_id, |message| message.chat_id)
    }
}

/// An inline query typed into the input field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineQueryEvent {
    /// Provider-assigned query identifier.
    #[serde(default)]
    pub id: String,
    /// The user issuing the query.
    #[serde(default)]
    pub from_id: i64,
    /// The query text.
    #[serde(default)]
    pub query: String,
}

/// The data carried alongside a stage key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StagePayload {
    /// A message that arrived while the conversation was in the stage.
    Message(IncomingMessage),
    /// A callback that arrived while the conversation was in the stage.
    Callback(CallbackEvent),
    /// Arbitrary caller-defined data.
    Data(Value),
}

impl Default for StagePayload {
    fn default() -> Self {
        Self::Data(Value::Null)
    }
}

impl StagePayload {
    /// Returns the message, if this payload wraps one.
    pub fn as_message(&self) -> Option<&IncomingMessage> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Returns the callback, if this payload wraps one.
    pub fn as_callback(&self) -> Option<&CallbackEvent> {
        match self {
            Self::Callback(callback) => Some(callback),
            _ => None,
        }
    }
}

/// An event scoped to an externally owned conversation stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    /// The current stage of the conversation, as tracked by the caller.
    pub stage_key: String,
    /// What happened while in that stage.
    #[serde(default)]
    pub payload: StagePayload,
}

impl StageEvent {
    /// Creates a stage event.
    pub fn new(stage_key: impl Into<String>, payload: StagePayload) -> Self {
        Self {
            stage_key: stage_key.into(),
            payload,
        }
    }
}

// ============================================================================
// Event union
// ============================================================================

/// One decoded inbound update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A plain text message.
    Message(IncomingMessage),
    /// A callback query.
    Callback(CallbackEvent),
    /// An inline query.
    InlineQuery(InlineQueryEvent),
    /// A stage-scoped event.
    Stage(StageEvent),
}

impl Event {
    /// Returns the table kind this event is routed through.
    pub fn kind(&self) -> TriggerKind {
        match self {
            Self::Message(_) => TriggerKind::Message,
            Self::Callback(_) => TriggerKind::Callback,
            Self::InlineQuery(_) => TriggerKind::InlineQuery,
            Self::Stage(_) => TriggerKind::Stage,
        }
    }

    /// Returns the message, if this is a message event.
    pub fn as_message(&self) -> Option<&IncomingMessage> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Returns the callback, if this is a callback event.
    pub fn as_callback(&self) -> Option<&CallbackEvent> {
        match self {
            Self::Callback(callback) => Some(callback),
            _ => None,
        }
    }

    /// Returns the inline query, if this is an inline query event.
    pub fn as_inline_query(&self) -> Option<&InlineQueryEvent> {
        match self {
            Self::InlineQuery(query) => Some(query),
            _ => None,
        }
    }

    /// Returns the stage event, if this is a stage event.
    pub fn as_stage(&self) -> Option<&StageEvent> {
        match self {
            Self::Stage(stage) => Some(stage),
            _ => None,
        }
    }

    /// Returns a borrowed view of this event.
    pub fn view(&self) -> EventRef<'_> {
        match self {
            Self::Message(message) => EventRef::Message(message),
            Self::Callback(callback) => EventRef::Callback(callback),
            Self::InlineQuery(query) => EventRef::InlineQuery(query),
            Self::Stage(stage) => EventRef::Stage(stage),
        }
    }

    /// Returns the chat this event belongs to, when it has one.
    pub fn chat_id(&self) -> Option<i64> {
        self.view().chat_id()
    }
}

// ============================================================================
// Borrowed view
// ============================================================================

/// A borrowed view of an [`Event`], as handed to handlers.
///
/// The typed dispatch entry points only hold a reference to one leaf shape,
/// so handlers receive this instead of an owned [`Event`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventRef<'a> {
    /// A plain text message.
    Message(&'a IncomingMessage),
    /// A callback query.
    Callback(&'a CallbackEvent),
    /// An inline query.
    InlineQuery(&'a InlineQueryEvent),
    /// A stage-scoped event.
    Stage(&'a StageEvent),
}

impl<'a> EventRef<'a> {
    /// Returns the table kind this event is routed through.
    pub fn kind(self) -> TriggerKind {
        match self {
            Self::Message(_) => TriggerKind::Message,
            Self::Callback(_) => TriggerKind::Callback,
            Self::InlineQuery(_) => TriggerKind::InlineQuery,
            Self::Stage(_) => TriggerKind::Stage,
        }
    }

    /// Returns the message, if this is a message event.
    pub fn as_message(self) -> Option<&'a IncomingMessage> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Returns the callback, if this is a callback event.
    pub fn as_callback(self) -> Option<&'a CallbackEvent> {
        match self {
            Self::Callback(callback) => Some(callback),
            _ => None,
        }
    }

    /// Returns the inline query, if this is an inline query event.
    pub fn as_inline_query(self) -> Option<&'a InlineQueryEvent> {
        match self {
            Self::InlineQuery(query) => Some(query),
            _ => None,
        }
    }

    /// Returns the stage event, if this is a stage event.
    pub fn as_stage(self) -> Option<&'a StageEvent> {
        match self {
            Self::Stage(stage) => Some(stage),
            _ => None,
        }
    }

    /// Returns the text a handler would usually reply to.
    ///
    /// That is the message text, the callback data, the inline query string,
    /// or the text of a message wrapped in a stage payload.
    pub fn text(self) -> Option<&'a str> {
        match self {
            Self::Message(message) => Some(&message.text),
            Self::Callback(callback) => Some(&callback.data),
            Self::InlineQuery(query) => Some(&query.query),
            Self::Stage(stage) => stage.payload.as_message().map(|m| m.text.as_str()),
        }
    }

    /// Returns the chat this event belongs to, when it has one.
    ///
    /// Inline queries and stage events carrying caller data have no chat.
    pub fn chat_id(self) -> Option<i64> {
        match self {
            Self::Message(message) => Some(message.chat_id),
            Self::Callback(callback) => Some(callback.chat_id()),
            Self::InlineQuery(_) => None,
            Self::Stage(stage) => match &stage.payload {
                StagePayload::Message(message) => Some(message.chat_id),
                StagePayload::Callback(callback) => Some(callback.chat_id()),
                StagePayload::Data(_) => None,
            },
        }
    }

    /// Clones the viewed event into an owned [`Event`].
    pub fn to_event(self) -> Event {
        match self {
            Self::Message(message) => Event::Message(message.clone()),
            Self::Callback(callback) => Event::Callback(callback.clone()),
            Self::InlineQuery(query) => Event::InlineQuery(query.clone()),
            Self::Stage(stage) => Event::Stage(stage.clone()),
        }
    }
}

impl<'a> From<&'a Event> for EventRef<'a> {
    fn from(event: &'a Event) -> Self {
        event.view()
    }
}

impl From<IncomingMessage> for Event {
    fn from(message: IncomingMessage) -> Self {
        Self::Message(message)
    }
}

impl From<CallbackEvent> for Event {
    fn from(callback: CallbackEvent) -> Self {
        Self::Callback(callback)
    }
}

impl From<InlineQueryEvent> for Event {
    fn from(query: InlineQueryEvent) -> Self {
        Self::InlineQuery(query)
    }
}

impl From<StageEvent> for Event {
    fn from(stage: StageEvent) -> Self {
        Self::Stage(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_message_event() {
        let event: Event =
            serde_json::from_value(json!({"type": "message", "chat_id": 7, "text": "/start"}))
                .unwrap();

        assert_eq!(event.kind(), TriggerKind::Message);
        assert_eq!(event.as_message().unwrap().text, "/start");
        assert_eq!(event.chat_id(), Some(7));
    }

    #[test]
    fn test_decode_callback_with_nested_message() {
        let event: Event = serde_json::from_value(json!({
            "type": "callback",
            "id": "q1",
            "from_id": 3,
            "data": "menu:open",
            "message": {"message_id": 10, "chat_id": 42, "text": "pick one"}
        }))
        .unwrap();

        let callback = event.as_callback().unwrap();
        assert_eq!(callback.data, "menu:open");
        assert_eq!(callback.chat_id(), 42);
    }

    #[test]
    fn test_callback_chat_id_falls_back_to_sender() {
        let mut callback = CallbackEvent::new("x");
        callback.from_id = 99;
        assert_eq!(callback.chat_id(), 99);
    }

    #[test]
    fn test_decode_stage_event_with_data_payload() {
        let event: Event = serde_json::from_value(json!({
            "type": "stage",
            "stage_key": "ask_name",
            "payload": {"kind": "data", "value": {"attempt": 2}}
        }))
        .unwrap();

        let stage = event.as_stage().unwrap();
        assert_eq!(stage.stage_key, "ask_name");
        assert_eq!(stage.payload, StagePayload::Data(json!({"attempt": 2})));
        assert_eq!(event.chat_id(), None);
    }

    #[test]
    fn test_view_text() {
        let stage = Event::Stage(StageEvent::new(
            "ask_name",
            StagePayload::Message(IncomingMessage::new("Ada")),
        ));
        assert_eq!(stage.view().text(), Some("Ada"));
        assert_eq!(stage.view().kind(), TriggerKind::Stage);
        assert_eq!(stage.view().to_event(), stage);

        let callback = Event::Callback(CallbackEvent::new("menu:open"));
        assert_eq!(callback.view().text(), Some("menu:open"));
    }

    #[test]
    fn test_stage_payload_defaults_to_null_data() {
        let stage: StageEvent = serde_json::from_value(json!({"stage_key": "idle"})).unwrap();
        assert_eq!(stage.payload, StagePayload::Data(Value::Null));
    }
}
