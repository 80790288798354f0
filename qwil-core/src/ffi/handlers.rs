//! Adapters between the native host callbacks and the session's collaborator traits

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::credentials::Credentials;
use crate::host::{
    AnchorSpec, ElementId, HostError, Navigator, NotificationChannel, PresentationSurface,
    SurfaceMode, Toast,
};
use crate::session::{SessionObserver, SessionState};
use crate::widget::{
    event_channel, EventReceiver, EventSender, RuntimeLoadError, WidgetConfig, WidgetEvent,
    WidgetInitError, WidgetInstance, WidgetRuntime,
};

use super::types::{CoreError, EmbedState, NativeHost, ToastMessage};

/// Widget runtime driven by the native host
pub struct NativeRuntime {
    host: Arc<dyn NativeHost>,
    /// Outcome channel of the construction awaiting onLoad/onError
    pending: Mutex<Option<oneshot::Sender<bool>>>,
    /// The session owns the instance; once it lets go this no longer upgrades
    live: Mutex<Weak<NativeInstance>>,
}

impl NativeRuntime {
    pub fn new(host: Arc<dyn NativeHost>) -> Self {
        Self {
            host,
            pending: Mutex::new(None),
            live: Mutex::new(Weak::new()),
        }
    }

    /// Report the outcome of the pending construction
    pub fn resolve(&self, loaded: bool) -> Result<(), CoreError> {
        let tx = self.pending.lock().take().ok_or(CoreError::NoPendingConstruction)?;
        // Receiver gone means the activation was abandoned
        let _ = tx.send(loaded);
        Ok(())
    }

    /// Forward an event from the native widget to the live instance
    pub fn dispatch(&self, event: WidgetEvent) -> Result<(), CoreError> {
        let live = self.live.lock().upgrade().ok_or(CoreError::NoLiveWidget)?;
        live.emit(event)
    }

    /// The native widget died; close the live instance's event stream
    pub fn close_live(&self) {
        let live = std::mem::take(&mut *self.live.lock());
        if let Some(live) = live.upgrade() {
            live.close();
        }
    }

    #[cfg(test)]
    pub(crate) fn has_live(&self) -> bool {
        self.live.lock().strong_count() > 0
    }
}

#[async_trait]
impl WidgetRuntime for NativeRuntime {
    async fn load(&self) -> Result<(), RuntimeLoadError> {
        if self.host.load_runtime() {
            Ok(())
        } else {
            Err(RuntimeLoadError::new("native host could not load the widget runtime"))
        }
    }

    async fn construct(
        &self,
        config: WidgetConfig,
    ) -> Result<Arc<dyn WidgetInstance>, WidgetInitError> {
        let (tx, rx) = oneshot::channel();
        if self.pending.lock().replace(tx).is_some() {
            warn!("Replacing an unresolved widget construction");
        }

        let Credentials { token, endpoint } = config.credentials;
        self.host
            .construct_widget(token, endpoint, config.options.to_json().to_string());

        match rx.await {
            Ok(true) => {
                let instance = Arc::new(NativeInstance::new(Arc::clone(&self.host)));
                *self.live.lock() = Arc::downgrade(&instance);
                Ok(instance)
            }
            Ok(false) => Err(WidgetInitError),
            Err(_) => {
                debug!("Construction outcome channel dropped");
                Err(WidgetInitError)
            }
        }
    }
}

/// Live widget instance owned by the native host
pub struct NativeInstance {
    host: Arc<dyn NativeHost>,
    sender: Mutex<Option<EventSender>>,
    receiver: Mutex<Option<EventReceiver>>,
}

impl NativeInstance {
    fn new(host: Arc<dyn NativeHost>) -> Self {
        let (tx, rx) = event_channel();
        Self {
            host,
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
        }
    }

    fn emit(&self, event: WidgetEvent) -> Result<(), CoreError> {
        let sender = self.sender.lock();
        let tx = sender.as_ref().ok_or(CoreError::NoLiveWidget)?;
        tx.send(event).map_err(|_| CoreError::NoLiveWidget)
    }

    fn close(&self) {
        self.sender.lock().take();
    }
}

impl WidgetInstance for NativeInstance {
    fn events(&self) -> Option<EventReceiver> {
        self.receiver.lock().take()
    }

    fn reauthenticate(&self, credentials: &Credentials) {
        if self.sender.lock().is_none() {
            debug!("Skipping reauthentication of a destroyed widget");
            return;
        }
        self.host
            .reauthenticate_widget(credentials.token.clone(), credentials.endpoint.clone());
    }

    fn destroy(&self) {
        self.close();
        self.host.destroy_widget();
    }
}

/// Surface whose transient elements are native download/open calls
pub struct NativeSurface {
    host: Arc<dyn NativeHost>,
    next_id: AtomicU64,
    elements: Mutex<HashMap<ElementId, AnchorSpec>>,
}

impl NativeSurface {
    pub fn new(host: Arc<dyn NativeHost>) -> Self {
        Self {
            host,
            next_id: AtomicU64::new(1),
            elements: Mutex::new(HashMap::new()),
        }
    }
}

impl PresentationSurface for NativeSurface {
    fn set_mode(&self, mode: SurfaceMode) {
        self.host.set_inline_mode(mode == SurfaceMode::Inline);
    }

    fn append(&self, anchor: AnchorSpec) -> Result<ElementId, HostError> {
        let id = ElementId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.elements.lock().insert(id, anchor);
        Ok(id)
    }

    fn click(&self, id: ElementId) -> Result<(), HostError> {
        let anchor = self
            .elements
            .lock()
            .get(&id)
            .cloned()
            .ok_or(HostError::Activate(id))?;

        let handled = match (&anchor.download, &anchor.target) {
            (Some(filename), _) => self.host.download(anchor.href.clone(), filename.clone()),
            (None, Some(_)) => self.host.open_url(anchor.href.clone()),
            (None, None) => false,
        };

        if handled {
            Ok(())
        } else {
            Err(HostError::Activate(id))
        }
    }

    fn remove(&self, id: ElementId) {
        self.elements.lock().remove(&id);
    }

    fn element_count(&self) -> usize {
        self.elements.lock().len()
    }
}

/// Forwards toasts, navigation and state changes to the native host
pub struct NativeCallbacks {
    host: Arc<dyn NativeHost>,
}

impl NativeCallbacks {
    pub fn new(host: Arc<dyn NativeHost>) -> Self {
        Self { host }
    }
}

impl NotificationChannel for NativeCallbacks {
    fn show(&self, toast: Toast) {
        self.host.show_toast(ToastMessage::from(toast));
    }
}

impl Navigator for NativeCallbacks {
    fn back(&self) {
        self.host.navigate_back();
    }
}

impl SessionObserver for NativeCallbacks {
    fn on_state_changed(&self, state: &SessionState) {
        self.host.on_state_changed(EmbedState::from(state));
    }
}
