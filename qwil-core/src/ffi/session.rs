//! Embed handle for FFI

use std::sync::{Arc, Once};

use tokio::runtime::Runtime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::credentials::AuthClient;
use crate::host::HostBindings;
use crate::session::EmbeddingSession;
use crate::widget::{SessionOptions, WidgetEvent};

use super::handlers::{NativeCallbacks, NativeRuntime, NativeSurface};
use super::types::*;

static TRACING_INIT: Once = Once::new();

/// Default log directives when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "qwil_core=debug,hyper=off,hyper_util=off,reqwest=off";

/// Main embedding interface for native hosts
#[derive(uniffi::Object)]
pub struct EmbedHandle {
    runtime: Runtime,
    session: Arc<EmbeddingSession>,
    widget: Arc<NativeRuntime>,
    surface: Arc<NativeSurface>,
}

#[uniffi::export]
impl EmbedHandle {
    /// Create a handle bound to a native host
    #[uniffi::constructor]
    pub fn new(config: EmbedConfig, host: Box<dyn NativeHost>) -> Result<Arc<Self>, CoreError> {
        // Initialize tracing once
        TRACING_INIT.call_once(|| {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
            let _ = tracing_subscriber::fmt()
                .with_ansi(false) // Native consoles don't render colors
                .with_target(false)
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        });

        info!("Initializing qwil-core embed handle");

        let runtime = Runtime::new().map_err(|e| CoreError::Runtime(e.to_string()))?;
        let host: Arc<dyn NativeHost> = Arc::from(host);

        let options = if config.options_json.trim().is_empty() {
            SessionOptions::default()
        } else {
            SessionOptions::from_json(&config.options_json).unwrap_or_else(|e| {
                warn!("Ignoring invalid widget options: {}", e);
                SessionOptions::default()
            })
        };

        let mut client = AuthClient::new(config.auth_url);
        if let Some(token) = config.session_token {
            client = client.with_session_token(token);
        }

        let callbacks = Arc::new(NativeCallbacks::new(Arc::clone(&host)));
        let bindings = HostBindings::new(callbacks.clone(), config.form_factor.into())
            .with_navigator(callbacks.clone());

        let widget = Arc::new(NativeRuntime::new(Arc::clone(&host)));
        let session = EmbeddingSession::new(Arc::new(client), widget.clone(), bindings, options);
        session.set_observer(callbacks);

        Ok(Arc::new(Self {
            runtime,
            session: Arc::new(session),
            widget,
            surface: Arc::new(NativeSurface::new(host)),
        }))
    }

    /// Start activation; progress is reported through `on_state_changed`.
    ///
    /// The session is claimed before returning, so a concurrent second call
    /// fails with `AlreadyActive`.
    pub fn activate(&self) -> Result<(), CoreError> {
        let pending = self
            .session
            .begin_activation()
            .map_err(|_| CoreError::AlreadyActive)?;

        let session = Arc::clone(&self.session);
        let surface = Arc::clone(&self.surface);
        self.runtime.spawn(async move {
            session.complete_activation(pending, surface).await;
        });
        Ok(())
    }

    /// Destroy the widget and return to idle
    pub fn deactivate(&self) {
        // Entered so the session can abort its tasks
        let _guard = self.runtime.enter();
        self.session.deactivate();
    }

    /// The widget's onLoad fired
    pub fn widget_loaded(&self) -> Result<(), CoreError> {
        self.widget.resolve(true)
    }

    /// The widget's onError fired
    pub fn widget_failed(&self) -> Result<(), CoreError> {
        self.widget.resolve(false)
    }

    /// The native widget went away on its own
    pub fn widget_closed(&self) {
        self.widget.close_live();
    }

    /// Forward a widget event with its JSON payload
    pub fn dispatch_event(&self, name: String, payload_json: String) -> Result<(), CoreError> {
        let event = WidgetEvent::decode_str(&name, &payload_json)
            .map_err(|e| CoreError::InvalidEvent(e.to_string()))?;
        self.widget.dispatch(event)
    }

    pub fn state(&self) -> EmbedState {
        EmbedState::from(&self.session.state())
    }

    /// Reauthentication failures since the last success
    pub fn reauth_failures(&self) -> u32 {
        self.session.reauth_stats().consecutive_failures
    }
}

impl Drop for EmbedHandle {
    fn drop(&mut self) {
        self.deactivate();
    }
}
