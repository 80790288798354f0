//! Qwil Embed - Core Library
//!
//! This library embeds the Qwil chat widget into a host surface: it fetches
//! short-lived credentials, constructs the widget, keeps its session alive
//! across token expiry and bridges widget events to host actions.

pub mod credentials;
pub mod ffi;
pub mod host;
pub mod session;
pub mod widget;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use credentials::{AuthClient, CredentialError, CredentialProvider, Credentials};
pub use host::{HostBindings, NotificationChannel, PresentationSurface, Toast};
pub use session::{EmbeddingSession, SessionState};
pub use widget::{SessionOptions, WidgetEvent, WidgetInstance, WidgetRuntime};

// Setup uniffi scaffolding
uniffi::setup_scaffolding!();
