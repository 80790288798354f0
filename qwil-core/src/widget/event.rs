//! Events emitted by a live widget instance

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Kind of a widget event, keyed by its wire name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AuthExpired,
    ClickOnContact,
    AppError,
    DownloadRequest,
    MeetingJoin,
    ChatListBack,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::AuthExpired,
        EventKind::ClickOnContact,
        EventKind::AppError,
        EventKind::DownloadRequest,
        EventKind::MeetingJoin,
        EventKind::ChatListBack,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::AuthExpired => "auth-expired",
            EventKind::ClickOnContact => "click-on-contact",
            EventKind::AppError => "app-error",
            EventKind::DownloadRequest => "download-request",
            EventKind::MeetingJoin => "meeting-join",
            EventKind::ChatListBack => "chat-list-back",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded widget event
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    /// The session token expired; the widget waits for reauthenticate
    AuthExpired,
    /// A contact was tapped (only with `contactsTappable`)
    ClickOnContact(Value),
    /// An in-app error the user should see
    AppError { message: String },
    /// A file download the host must perform
    DownloadRequest { filename: String, url: String },
    /// A meeting link the host must open in a new browsing context
    MeetingJoin { url: String },
    /// Back button in the chat list header
    ChatListBack,
}

/// A widget event that could not be decoded
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("Unknown widget event: {0}")]
    UnknownEvent(String),

    #[error("Malformed {kind} payload: {source}")]
    MalformedPayload {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct AppErrorPayload {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct DownloadPayload {
    #[serde(default)]
    filename: String,
    url: String,
}

#[derive(Deserialize)]
struct MeetingPayload {
    url: String,
}

impl WidgetEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WidgetEvent::AuthExpired => EventKind::AuthExpired,
            WidgetEvent::ClickOnContact(_) => EventKind::ClickOnContact,
            WidgetEvent::AppError { .. } => EventKind::AppError,
            WidgetEvent::DownloadRequest { .. } => EventKind::DownloadRequest,
            WidgetEvent::MeetingJoin { .. } => EventKind::MeetingJoin,
            WidgetEvent::ChatListBack => EventKind::ChatListBack,
        }
    }

    /// Decode an event from its wire name and JSON payload
    pub fn decode(name: &str, payload: Value) -> Result<Self, EventDecodeError> {
        let kind = EventKind::from_name(name)
            .ok_or_else(|| EventDecodeError::UnknownEvent(name.to_string()))?;
        let malformed = |source| EventDecodeError::MalformedPayload { kind, source };

        let event = match kind {
            EventKind::AuthExpired => WidgetEvent::AuthExpired,
            EventKind::ChatListBack => WidgetEvent::ChatListBack,
            EventKind::ClickOnContact => WidgetEvent::ClickOnContact(payload),
            EventKind::AppError => {
                let p: AppErrorPayload = serde_json::from_value(payload).map_err(malformed)?;
                WidgetEvent::AppError { message: p.message }
            }
            EventKind::DownloadRequest => {
                let p: DownloadPayload = serde_json::from_value(payload).map_err(malformed)?;
                WidgetEvent::DownloadRequest {
                    filename: p.filename,
                    url: p.url,
                }
            }
            EventKind::MeetingJoin => {
                let p: MeetingPayload = serde_json::from_value(payload).map_err(malformed)?;
                WidgetEvent::MeetingJoin { url: p.url }
            }
        };

        Ok(event)
    }

    /// Decode from a JSON string payload, treating an empty string as no payload
    pub fn decode_str(name: &str, payload: &str) -> Result<Self, EventDecodeError> {
        let value = if payload.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(payload).map_err(|source| match EventKind::from_name(name) {
                Some(kind) => EventDecodeError::MalformedPayload { kind, source },
                None => EventDecodeError::UnknownEvent(name.to_string()),
            })?
        };
        Self::decode(name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_known_events() {
        assert_eq!(
            WidgetEvent::decode("auth-expired", Value::Null).unwrap(),
            WidgetEvent::AuthExpired
        );
        assert_eq!(
            WidgetEvent::decode("app-error", json!({"message": "boom"})).unwrap(),
            WidgetEvent::AppError { message: "boom".into() }
        );
        assert_eq!(
            WidgetEvent::decode(
                "download-request",
                json!({"filename": "a.pdf", "url": "https://files/a"})
            )
            .unwrap(),
            WidgetEvent::DownloadRequest {
                filename: "a.pdf".into(),
                url: "https://files/a".into()
            }
        );
        assert_eq!(
            WidgetEvent::decode("meeting-join", json!({"url": "https://meet/1"})).unwrap(),
            WidgetEvent::MeetingJoin { url: "https://meet/1".into() }
        );

        let contact = json!({"id": 7, "name": "Ada"});
        assert_eq!(
            WidgetEvent::decode("click-on-contact", contact.clone()).unwrap(),
            WidgetEvent::ClickOnContact(contact)
        );
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            WidgetEvent::decode("chat-opened", Value::Null),
            Err(EventDecodeError::UnknownEvent(name)) if name == "chat-opened"
        ));
        assert!(matches!(
            WidgetEvent::decode("meeting-join", json!({})),
            Err(EventDecodeError::MalformedPayload { kind: EventKind::MeetingJoin, .. })
        ));
        assert!(matches!(
            WidgetEvent::decode_str("download-request", "{not json"),
            Err(EventDecodeError::MalformedPayload { kind: EventKind::DownloadRequest, .. })
        ));
    }

    #[test]
    fn test_decode_str_empty_payload() {
        assert_eq!(
            WidgetEvent::decode_str("chat-list-back", "").unwrap(),
            WidgetEvent::ChatListBack
        );
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.as_str()), Some(kind));
        }
    }
}
