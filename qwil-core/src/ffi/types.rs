//! FFI types exposed via uniffi

use crate::host::{Severity, Toast};
use crate::session::SessionState;
use crate::widget::FormFactor;

/// Error types exposed via FFI
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum CoreError {
    #[error("Session is already loading or active")]
    AlreadyActive,

    #[error("No widget construction is pending")]
    NoPendingConstruction,

    #[error("No live widget instance")]
    NoLiveWidget,

    #[error("Invalid widget event: {0}")]
    InvalidEvent(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Host form factor exposed via FFI
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum HostFormFactor {
    Small,
    Medium,
    Large,
}

impl From<HostFormFactor> for FormFactor {
    fn from(f: HostFormFactor) -> Self {
        match f {
            HostFormFactor::Small => FormFactor::Small,
            HostFormFactor::Medium => FormFactor::Medium,
            HostFormFactor::Large => FormFactor::Large,
        }
    }
}

/// Embedding configuration exposed via FFI
#[derive(Debug, Clone, uniffi::Record)]
pub struct EmbedConfig {
    /// Base URL of the credential backend
    pub auth_url: String,
    /// Ambient session token forwarded to the backend
    pub session_token: Option<String>,
    pub form_factor: HostFormFactor,
    /// Widget options as JSON; empty for defaults
    pub options_json: String,
}

/// Session state exposed via FFI
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum EmbedState {
    Idle,
    Loading,
    Error { message: String },
    Active,
}

impl From<&SessionState> for EmbedState {
    fn from(s: &SessionState) -> Self {
        match s {
            SessionState::Idle => EmbedState::Idle,
            SessionState::Loading => EmbedState::Loading,
            SessionState::Error(message) => EmbedState::Error {
                message: message.clone(),
            },
            SessionState::Active => EmbedState::Active,
        }
    }
}

/// Toast severity exposed via FFI
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum ToastSeverity {
    Info,
    Success,
    Warning,
    Error,
}

/// Toast exposed via FFI
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ToastMessage {
    pub title: String,
    pub message: String,
    pub severity: ToastSeverity,
    pub dismissable: bool,
}

impl From<Toast> for ToastMessage {
    fn from(t: Toast) -> Self {
        Self {
            title: t.title,
            message: t.message,
            severity: match t.severity {
                Severity::Info => ToastSeverity::Info,
                Severity::Success => ToastSeverity::Success,
                Severity::Warning => ToastSeverity::Warning,
                Severity::Error => ToastSeverity::Error,
            },
            dismissable: t.dismissable,
        }
    }
}

/// Callback interface implemented by the native host.
///
/// The host owns the widget view; the core tells it what to do and the host
/// reports back through [`super::EmbedHandle`].
#[uniffi::export(callback_interface)]
pub trait NativeHost: Send + Sync {
    /// Load the widget runtime; returns whether it is available
    fn load_runtime(&self) -> bool;
    /// Construct the widget. Answer with `widget_loaded` or `widget_failed`.
    fn construct_widget(&self, token: String, endpoint: String, options_json: String);
    fn reauthenticate_widget(&self, token: String, endpoint: String);
    fn destroy_widget(&self);
    /// Switch the container between full-page and inline-error presentation
    fn set_inline_mode(&self, inline: bool);
    fn show_toast(&self, toast: ToastMessage);
    /// Download `url` as `filename` from the outer surface; returns success
    fn download(&self, url: String, filename: String) -> bool;
    /// Open `url` in a new browsing context; returns success
    fn open_url(&self, url: String) -> bool;
    fn navigate_back(&self);
    fn on_state_changed(&self, state: EmbedState);
}
