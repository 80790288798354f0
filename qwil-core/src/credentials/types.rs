//! Types for the credential backend

use std::fmt;

use serde::{Deserialize, Serialize};

/// Short-lived session credentials for the widget.
///
/// Replaced wholesale on every fetch; never patched.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Opaque SDK token
    pub token: String,
    /// Qwil API endpoint the token is valid for
    pub endpoint: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            endpoint: endpoint.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Structured error body returned by the backend on failure.
///
/// Accepts both `{"message": ...}` and `{"body": {"message": ...}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub body: Option<Box<ErrorBody>>,
}

impl ErrorBody {
    /// The most specific non-empty message in the body
    pub fn message(&self) -> Option<&str> {
        self.body
            .as_deref()
            .and_then(ErrorBody::message)
            .or(self.message.as_deref())
            .filter(|m| !m.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let creds = Credentials::new("secret-token", "https://e1");
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("https://e1"));
    }

    #[test]
    fn test_error_body_message() {
        let flat: ErrorBody = serde_json::from_str(r#"{"message":"expired session"}"#).unwrap();
        assert_eq!(flat.message(), Some("expired session"));

        let nested: ErrorBody =
            serde_json::from_str(r#"{"body":{"message":"no sdk user"}}"#).unwrap();
        assert_eq!(nested.message(), Some("no sdk user"));

        let blank: ErrorBody = serde_json::from_str(r#"{"message":"  "}"#).unwrap();
        assert_eq!(blank.message(), None);

        let empty: ErrorBody = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.message(), None);
    }
}
