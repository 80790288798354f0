//! Console host: the terminal stands in for the page embedding the widget

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use qwil_core::credentials::Credentials;
use qwil_core::host::{
    AnchorSpec, ElementId, HostError, Navigator, NotificationChannel, PresentationSurface,
    SurfaceMode, Toast,
};
use qwil_core::session::{SessionObserver, SessionState};
use qwil_core::widget::{
    event_channel, EventReceiver, EventSender, RuntimeLoadError, WidgetConfig, WidgetEvent,
    WidgetInitError, WidgetInstance, WidgetRuntime,
};
use tracing::info;

use crate::metrics::{LogLevel, Metrics};

/// Shared metrics handle
pub type SharedMetrics = Arc<RwLock<Metrics>>;

/// Host callbacks recording into the dashboard metrics
pub struct ConsoleHost {
    metrics: SharedMetrics,
    next_id: AtomicU64,
    elements: Mutex<HashMap<ElementId, AnchorSpec>>,
}

impl ConsoleHost {
    pub fn new(metrics: SharedMetrics) -> Self {
        Self {
            metrics,
            next_id: AtomicU64::new(1),
            elements: Mutex::new(HashMap::new()),
        }
    }
}

impl NotificationChannel for ConsoleHost {
    fn show(&self, toast: Toast) {
        info!("Toast: {} - {}", toast.title, toast.message);
        self.metrics.write().toast_shown(&toast);
    }
}

impl Navigator for ConsoleHost {
    fn back(&self) {
        info!("Navigating back");
        self.metrics.write().log(LogLevel::Bridge, "Navigate back");
    }
}

impl SessionObserver for ConsoleHost {
    fn on_state_changed(&self, state: &SessionState) {
        info!("Session state: {}", state);
        self.metrics.write().state_changed(state);
    }
}

impl PresentationSurface for ConsoleHost {
    fn set_mode(&self, mode: SurfaceMode) {
        let mut m = self.metrics.write();
        if m.surface_mode != mode {
            m.log(LogLevel::Info, format!("Surface mode: {:?}", mode));
        }
        m.surface_mode = mode;
    }

    fn append(&self, anchor: AnchorSpec) -> Result<ElementId, HostError> {
        let id = ElementId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut elements = self.elements.lock();
        elements.insert(id, anchor);
        self.metrics.write().attached_elements = elements.len();
        Ok(id)
    }

    fn click(&self, id: ElementId) -> Result<(), HostError> {
        let anchor = self
            .elements
            .lock()
            .get(&id)
            .cloned()
            .ok_or(HostError::Activate(id))?;

        let message = match (&anchor.download, &anchor.target) {
            (Some(filename), _) => format!("Download {} <- {}", filename, anchor.href),
            (None, Some(target)) => format!("Open {} in {}", anchor.href, target),
            (None, None) => format!("Follow {}", anchor.href),
        };
        info!("{}", message);

        let mut m = self.metrics.write();
        m.anchors_clicked += 1;
        m.log(LogLevel::Bridge, message);
        Ok(())
    }

    fn remove(&self, id: ElementId) {
        let mut elements = self.elements.lock();
        elements.remove(&id);
        self.metrics.write().attached_elements = elements.len();
    }

    fn element_count(&self) -> usize {
        self.elements.lock().len()
    }
}

/// In-process stand-in for the Qwil widget runtime.
///
/// Events are injected from the keyboard or stdin.
pub struct LoopbackRuntime {
    metrics: SharedMetrics,
    live: Mutex<Option<Arc<LoopbackWidget>>>,
}

impl LoopbackRuntime {
    pub fn new(metrics: SharedMetrics) -> Self {
        Self {
            metrics,
            live: Mutex::new(None),
        }
    }

    /// Emit an event from the live widget; false if there is none
    pub fn emit(&self, event: WidgetEvent) -> bool {
        let live = self.live.lock().clone();
        match live {
            Some(widget) => widget.emit(event),
            None => false,
        }
    }

    /// Simulate the widget crashing
    pub fn kill(&self) -> bool {
        match self.live.lock().take() {
            Some(widget) => {
                widget.close();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl WidgetRuntime for LoopbackRuntime {
    async fn load(&self) -> Result<(), RuntimeLoadError> {
        Ok(())
    }

    async fn construct(
        &self,
        config: WidgetConfig,
    ) -> Result<Arc<dyn WidgetInstance>, WidgetInitError> {
        let widget = Arc::new(LoopbackWidget::new(Arc::clone(&self.metrics)));
        {
            let mut m = self.metrics.write();
            m.constructions += 1;
            m.endpoint = Some(config.credentials.endpoint.clone());
            m.log(
                LogLevel::Info,
                format!("Widget constructed with options {}", config.options.to_json()),
            );
        }
        *self.live.lock() = Some(Arc::clone(&widget));
        Ok(widget)
    }
}

/// Widget instance living inside the console
pub struct LoopbackWidget {
    metrics: SharedMetrics,
    sender: Mutex<Option<EventSender>>,
    receiver: Mutex<Option<EventReceiver>>,
}

impl LoopbackWidget {
    fn new(metrics: SharedMetrics) -> Self {
        let (tx, rx) = event_channel();
        Self {
            metrics,
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
        }
    }

    fn emit(&self, event: WidgetEvent) -> bool {
        self.sender
            .lock()
            .as_ref()
            .map(|tx| tx.send(event).is_ok())
            .unwrap_or(false)
    }

    fn close(&self) {
        self.sender.lock().take();
    }
}

impl WidgetInstance for LoopbackWidget {
    fn events(&self) -> Option<EventReceiver> {
        self.receiver.lock().take()
    }

    fn reauthenticate(&self, credentials: &Credentials) {
        if self.sender.lock().is_none() {
            return;
        }
        let mut m = self.metrics.write();
        m.endpoint = Some(credentials.endpoint.clone());
        m.log(LogLevel::Session, format!("Widget reauthenticated against {}", credentials.endpoint));
    }

    fn destroy(&self) {
        self.close();
        self.metrics.write().log(LogLevel::Info, "Widget destroyed");
    }
}
