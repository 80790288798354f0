//! Session State

use std::fmt;

/// Lifecycle state of an embedding session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Not activated (or deactivated)
    #[default]
    Idle,
    /// Waiting for the runtime and credentials
    Loading,
    /// Activation failed; carries the user-facing message
    Error(String),
    /// A live widget instance is bound to the surface
    Active,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active)
    }

    /// Whether an activation is running or succeeded
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionState::Loading | SessionState::Active)
    }

    /// The error message, if in the error state
    pub fn error(&self) -> Option<&str> {
        match self {
            SessionState::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::Loading => f.write_str("loading"),
            SessionState::Error(message) => write!(f, "error: {}", message),
            SessionState::Active => f.write_str("active"),
        }
    }
}

/// Reauthentication counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReauthStats {
    pub attempts: u64,
    pub successes: u64,
    /// Failures since the last success
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    /// Signals dropped because a reauthentication was already running
    pub coalesced: u64,
}

impl ReauthStats {
    pub(crate) fn record_success(&mut self) {
        self.successes += 1;
        self.consecutive_failures = 0;
        self.last_error = None;
    }

    pub(crate) fn record_failure(&mut self, message: &str) {
        self.consecutive_failures += 1;
        self.last_error = Some(message.to_string());
    }
}

/// Receives every state transition of a session
pub trait SessionObserver: Send + Sync {
    fn on_state_changed(&self, state: &SessionState);
}
