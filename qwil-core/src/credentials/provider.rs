//! Credential provider seam

use async_trait::async_trait;
use thiserror::Error;

use super::types::{Credentials, ErrorBody};

/// Message used when the backend gives no usable reason
pub const GENERIC_LOAD_FAILURE: &str = "Load failed";

/// Failure to obtain credentials from the backend.
///
/// Always fatal to the activation attempt that requested it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CredentialError {
    message: String,
}

impl CredentialError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            return Self::generic();
        }
        Self { message }
    }

    /// The generic "Load failed" error
    pub fn generic() -> Self {
        Self {
            message: GENERIC_LOAD_FAILURE.to_string(),
        }
    }

    /// Build from a structured error body, falling back to the generic message
    pub fn from_body(body: Option<&ErrorBody>) -> Self {
        match body.and_then(ErrorBody::message) {
            Some(message) => Self::new(message),
            None => Self::generic(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Source of fresh widget credentials.
///
/// Caller identity is ambient. Implementations must not cache: every call
/// is a live fetch.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn fetch(&self) -> Result<Credentials, CredentialError>;
}
