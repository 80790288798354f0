//! Contracts of the external widget runtime and its instances

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::event::WidgetEvent;
use super::options::SessionOptions;
use crate::credentials::Credentials;
use crate::host::PresentationSurface;

/// Fixed user-facing message for a widget that rejected valid credentials
pub const WIDGET_LOGIN_FAILED: &str = "Login to Qwil failed";

/// Sending half of a widget event stream
pub type EventSender = mpsc::UnboundedSender<WidgetEvent>;

/// Receiving half of a widget event stream
pub type EventReceiver = mpsc::UnboundedReceiver<WidgetEvent>;

/// Create a channel-backed widget event stream
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// The widget runtime could not be loaded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to load Qwil: {reason}")]
pub struct RuntimeLoadError {
    pub reason: String,
}

impl RuntimeLoadError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// The widget accepted credentials but failed to initialize.
///
/// The widget gives no detail, so the message is fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("Login to Qwil failed")]
pub struct WidgetInitError;

/// Everything the widget needs at construction
#[derive(Clone)]
pub struct WidgetConfig {
    pub credentials: Credentials,
    pub options: SessionOptions,
    /// Surface the widget renders into
    pub target: Arc<dyn PresentationSurface>,
}

impl fmt::Debug for WidgetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetConfig")
            .field("credentials", &self.credentials)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Loader and constructor of the external widget
#[async_trait]
pub trait WidgetRuntime: Send + Sync {
    /// Make the widget constructor available. Safe to call when already loaded.
    async fn load(&self) -> Result<(), RuntimeLoadError>;

    /// Construct an instance bound to `config.target`.
    ///
    /// Resolves once: `Ok` is the widget's onLoad, `Err` its onError.
    async fn construct(
        &self,
        config: WidgetConfig,
    ) -> Result<Arc<dyn WidgetInstance>, WidgetInitError>;
}

/// A live widget instance
pub trait WidgetInstance: Send + Sync {
    /// Take the instance's event stream. `None` once taken.
    ///
    /// The stream closing means the instance is gone.
    fn events(&self) -> Option<EventReceiver>;

    /// Swap in fresh credentials without rebuilding the instance.
    ///
    /// Can arrive after a concurrent `destroy`; it must then be ignored.
    fn reauthenticate(&self, credentials: &Credentials);

    /// Tear the instance down. Never fails.
    fn destroy(&self);
}
