//! In-memory fakes of the session's collaborators

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::credentials::{CredentialError, CredentialProvider, Credentials};
use crate::host::{
    AnchorSpec, ElementId, HostBindings, HostError, Navigator, NotificationChannel,
    PresentationSurface, SurfaceMode, Toast,
};
use crate::session::{SessionObserver, SessionState};
use crate::widget::{
    event_channel, EventReceiver, EventSender, FormFactor, RuntimeLoadError, WidgetConfig,
    WidgetEvent, WidgetInitError, WidgetInstance, WidgetRuntime,
};

/// Poll `cond` until it holds, failing the test after a second
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn host_bindings(notifications: &Arc<FakeNotifications>, form_factor: FormFactor) -> HostBindings {
    HostBindings::new(notifications.clone(), form_factor)
}

/// Credential provider answering from a script
#[derive(Default)]
pub struct FakeProvider {
    responses: Mutex<VecDeque<Result<Credentials, CredentialError>>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    /// 1-based call that never completes
    hang_on: Option<usize>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch first takes a permit from `gate`
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn hang_on_call(mut self, call: usize) -> Self {
        self.hang_on = Some(call);
        self
    }

    pub fn push_ok(self, token: &str, endpoint: &str) -> Self {
        self.responses.lock().push_back(Ok(Credentials::new(token, endpoint)));
        self
    }

    pub fn push_err(self, message: &str) -> Self {
        self.responses.lock().push_back(Err(CredentialError::new(message)));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for FakeProvider {
    async fn fetch(&self) -> Result<Credentials, CredentialError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.hang_on == Some(call) {
            std::future::pending::<()>().await;
        }
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(CredentialError::generic()))
    }
}

/// Widget instance recording every call made on it
pub struct FakeInstance {
    sender: Mutex<Option<EventSender>>,
    receiver: Mutex<Option<EventReceiver>>,
    reauths: Mutex<Vec<Credentials>>,
    destroys: AtomicUsize,
    on_reauth: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl FakeInstance {
    pub fn new() -> Self {
        let (tx, rx) = event_channel();
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
            reauths: Mutex::new(Vec::new()),
            destroys: AtomicUsize::new(0),
            on_reauth: Mutex::new(None),
        }
    }

    pub fn emit(&self, event: WidgetEvent) {
        if let Some(tx) = self.sender.lock().as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Close the event stream as a crashed widget would
    pub fn close(&self) {
        self.sender.lock().take();
    }

    /// Run `hook` from inside every reauthentication, as a host callback would
    pub fn on_reauth(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_reauth.lock() = Some(Box::new(hook));
    }

    pub fn reauths(&self) -> Vec<Credentials> {
        self.reauths.lock().clone()
    }

    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }
}

impl WidgetInstance for FakeInstance {
    fn events(&self) -> Option<EventReceiver> {
        self.receiver.lock().take()
    }

    fn reauthenticate(&self, credentials: &Credentials) {
        self.reauths.lock().push(credentials.clone());
        if let Some(hook) = self.on_reauth.lock().as_ref() {
            hook();
        }
    }

    fn destroy(&self) {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        self.sender.lock().take();
    }
}

/// Widget runtime handing out [`FakeInstance`]s
pub struct FakeRuntime {
    load_error: Option<RuntimeLoadError>,
    load_delay: Duration,
    reject: bool,
    loads_completed: AtomicUsize,
    configs: Mutex<Vec<WidgetConfig>>,
    instances: Mutex<Vec<Arc<FakeInstance>>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            load_error: None,
            load_delay: Duration::ZERO,
            reject: false,
            loads_completed: AtomicUsize::new(0),
            configs: Mutex::new(Vec::new()),
            instances: Mutex::new(Vec::new()),
        }
    }

    /// Construction fires onError
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::new()
        }
    }

    pub fn failing_load(reason: &str) -> Self {
        Self {
            load_error: Some(RuntimeLoadError::new(reason)),
            ..Self::new()
        }
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn constructions(&self) -> usize {
        self.configs.lock().len()
    }

    pub fn configs(&self) -> Vec<WidgetConfig> {
        self.configs.lock().clone()
    }

    pub fn loads_completed(&self) -> usize {
        self.loads_completed.load(Ordering::SeqCst)
    }

    pub fn instance(&self, index: usize) -> Arc<FakeInstance> {
        self.instances.lock()[index].clone()
    }
}

#[async_trait]
impl WidgetRuntime for FakeRuntime {
    async fn load(&self) -> Result<(), RuntimeLoadError> {
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        self.loads_completed.fetch_add(1, Ordering::SeqCst);
        match &self.load_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn construct(
        &self,
        config: WidgetConfig,
    ) -> Result<Arc<dyn WidgetInstance>, WidgetInitError> {
        self.configs.lock().push(config);
        if self.reject {
            return Err(WidgetInitError);
        }
        let instance = Arc::new(FakeInstance::new());
        self.instances.lock().push(instance.clone());
        Ok(instance)
    }
}

/// Surface keeping its elements in memory
#[derive(Default)]
pub struct FakeSurface {
    mode: Mutex<SurfaceMode>,
    next_id: AtomicUsize,
    attached: Mutex<Vec<(ElementId, AnchorSpec)>>,
    clicked: Mutex<Vec<AnchorSpec>>,
    fail_clicks: Mutex<bool>,
    fail_appends: Mutex<bool>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SurfaceMode {
        *self.mode.lock()
    }

    pub fn clicked(&self) -> Vec<AnchorSpec> {
        self.clicked.lock().clone()
    }

    pub fn fail_clicks(&self, fail: bool) {
        *self.fail_clicks.lock() = fail;
    }

    pub fn fail_appends(&self, fail: bool) {
        *self.fail_appends.lock() = fail;
    }
}

impl PresentationSurface for FakeSurface {
    fn set_mode(&self, mode: SurfaceMode) {
        *self.mode.lock() = mode;
    }

    fn append(&self, anchor: AnchorSpec) -> Result<ElementId, HostError> {
        if *self.fail_appends.lock() {
            return Err(HostError::Create("append refused".into()));
        }
        let id = ElementId(self.next_id.fetch_add(1, Ordering::SeqCst) as u64);
        self.attached.lock().push((id, anchor));
        Ok(id)
    }

    fn click(&self, id: ElementId) -> Result<(), HostError> {
        if *self.fail_clicks.lock() {
            return Err(HostError::Activate(id));
        }
        let attached = self.attached.lock();
        let (_, anchor) = attached
            .iter()
            .find(|(el, _)| *el == id)
            .ok_or(HostError::Activate(id))?;
        self.clicked.lock().push(anchor.clone());
        Ok(())
    }

    fn remove(&self, id: ElementId) {
        self.attached.lock().retain(|(el, _)| *el != id);
    }

    fn element_count(&self) -> usize {
        self.attached.lock().len()
    }
}

#[derive(Default)]
pub struct FakeNotifications {
    toasts: Mutex<Vec<Toast>>,
}

impl FakeNotifications {
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().clone()
    }
}

impl NotificationChannel for FakeNotifications {
    fn show(&self, toast: Toast) {
        self.toasts.lock().push(toast);
    }
}

#[derive(Default)]
pub struct FakeNavigator {
    backs: AtomicUsize,
}

impl FakeNavigator {
    pub fn count(&self) -> usize {
        self.backs.load(Ordering::SeqCst)
    }
}

impl Navigator for FakeNavigator {
    fn back(&self) {
        self.backs.fetch_add(1, Ordering::SeqCst);
    }
}

/// Observer recording every transition
#[derive(Default)]
pub struct RecordingObserver {
    states: Mutex<Vec<SessionState>>,
}

impl RecordingObserver {
    pub fn states(&self) -> Vec<SessionState> {
        self.states.lock().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_state_changed(&self, state: &SessionState) {
        self.states.lock().push(state.clone());
    }
}
