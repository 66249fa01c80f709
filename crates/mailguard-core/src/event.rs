//! Push-channel events and their dispatch.
//!
//! Both push transports deliver a named event with a JSON payload: the event
//! stream puts the name in a `type` field of each `data:` object, the socket
//! transport sends `["name", payload]`. [`decode_event`] turns either into a
//! [`PushEvent`] through a decoder table keyed by event kind, and a
//! [`Dispatcher`] routes each kind to one handler.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::model::EmailRecord;
use crate::{Error, Result};

/// Recognised event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Connection acknowledgement.
    Connected,
    /// A newly processed email.
    NewEmail,
    /// Server-reported error.
    Error,
    /// The server closed the logical connection.
    Disconnect,
}

impl EventKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::NewEmail => "new_email",
            Self::Error => "error",
            Self::Disconnect => "disconnect",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        DECODERS
            .iter()
            .map(|(kind, _)| *kind)
            .find(|kind| kind.as_str() == name)
    }
}

/// A decoded push event.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// The server acknowledged the connection.
    Connected {
        /// Server-assigned client or socket id.
        client_id: Option<String>,
    },
    /// A new email record.
    NewEmail(Box<EmailRecord>),
    /// The server reported an error.
    Error {
        /// Error text.
        message: String,
    },
    /// The server ended the logical session.
    Disconnect {
        /// Reason, when given.
        reason: Option<String>,
    },
}

impl PushEvent {
    /// Kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Connected { .. } => EventKind::Connected,
            Self::NewEmail(_) => EventKind::NewEmail,
            Self::Error { .. } => EventKind::Error,
            Self::Disconnect { .. } => EventKind::Disconnect,
        }
    }
}

type Decoder = fn(Value) -> Result<PushEvent>;

const DECODERS: [(EventKind, Decoder); 4] = [
    (EventKind::Connected, decode_connected),
    (EventKind::NewEmail, decode_new_email),
    (EventKind::Error, decode_error),
    (EventKind::Disconnect, decode_disconnect),
];

/// Decodes the payload of event `kind`.
///
/// Unknown kinds are not an error: they yield `Ok(None)`.
///
/// # Errors
///
/// Returns an error when a known kind carries a payload of the wrong shape.
pub fn decode_event(kind: &str, payload: Value) -> Result<Option<PushEvent>> {
    let Some((_, decoder)) = DECODERS.iter().find(|(k, _)| k.as_str() == kind) else {
        debug!(kind, "Ignoring unrecognised push event");
        return Ok(None);
    };
    decoder(payload).map(Some)
}

/// Decodes the `data:` field of one event-stream message.
///
/// The object names its kind in `type`; the event body is under `data` when
/// present, otherwise the object itself.
///
/// # Errors
///
/// Returns an error for non-JSON data, a missing `type`, or a malformed body.
pub fn decode_sse_data(data: &str) -> Result<Option<PushEvent>> {
    let value: Value = serde_json::from_str(data)?;
    let Value::Object(mut object) = value else {
        return Err(Error::MalformedEvent("event data is not an object".into()));
    };
    let kind = match object.remove("type") {
        Some(Value::String(kind)) => kind,
        _ => return Err(Error::MalformedEvent("event data has no type".into())),
    };
    let payload = object
        .remove("data")
        .unwrap_or(Value::Object(object));
    decode_event(&kind, payload)
}

fn decode_connected(payload: Value) -> Result<PushEvent> {
    let client_id = ["client_id", "socket_id"]
        .iter()
        .find_map(|key| payload.get(key).and_then(Value::as_str))
        .map(ToString::to_string);
    Ok(PushEvent::Connected { client_id })
}

fn decode_new_email(payload: Value) -> Result<PushEvent> {
    let record: EmailRecord = serde_json::from_value(payload)?;
    Ok(PushEvent::NewEmail(Box::new(record)))
}

fn decode_error(payload: Value) -> Result<PushEvent> {
    let message = text_of(&payload, &["message", "error"]).unwrap_or_else(|| payload.to_string());
    Ok(PushEvent::Error { message })
}

fn decode_disconnect(payload: Value) -> Result<PushEvent> {
    Ok(PushEvent::Disconnect {
        reason: text_of(&payload, &["reason"]),
    })
}

/// A bare string payload, or the first string field among `keys`.
fn text_of(payload: &Value, keys: &[&str]) -> Option<String> {
    match payload {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => keys
            .iter()
            .find_map(|key| payload.get(key).and_then(Value::as_str))
            .map(ToString::to_string),
        _ => None,
    }
}

/// Handler for one event kind.
pub type Handler<S> = fn(&mut S, PushEvent);

/// Routes decoded events to one handler per kind.
pub struct Dispatcher<S> {
    handlers: HashMap<EventKind, Handler<S>>,
}

impl<S> Default for Dispatcher<S> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<S> std::fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<S> Dispatcher<S> {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind`, replacing any previous one.
    #[must_use]
    pub fn on(mut self, kind: EventKind, handler: Handler<S>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    /// Sends `event` to its handler. Returns `false` when no handler is
    /// registered for its kind.
    pub fn dispatch(&self, state: &mut S, event: PushEvent) -> bool {
        match self.handlers.get(&event.kind()) {
            Some(handler) => {
                handler(state, event);
                true
            }
            None => {
                debug!(kind = event.kind().as_str(), "No handler registered");
                false
            }
        }
    }
}
