//! Embedding session state machine

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::bridges::{handle_host_event, Bridge, BridgeTable};
use super::state::{ReauthStats, SessionObserver, SessionState};
use crate::credentials::CredentialProvider;
use crate::host::{HostBindings, PresentationSurface, SurfaceMode};
use crate::widget::{
    EventReceiver, SessionOptions, WidgetConfig, WidgetInstance, WidgetRuntime,
    WIDGET_LOGIN_FAILED,
};

/// User-facing message when the widget runtime could not be loaded
pub const RUNTIME_LOAD_FAILED: &str = "Failed to load Qwil";

/// Misuse of the session API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session is already loading or active")]
    AlreadyActive,
}

/// An activation that has claimed the session but not yet run
#[derive(Debug)]
#[must_use = "a claimed activation stays Loading until completed"]
pub struct PendingActivation {
    generation: u64,
}

/// Embeds one widget instance into a host surface and keeps its session alive
pub struct EmbeddingSession {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn CredentialProvider>,
    runtime: Arc<dyn WidgetRuntime>,
    host: HostBindings,
    /// Options with the host overrides applied
    options: SessionOptions,
    bridges: BridgeTable,
    state: RwLock<SessionState>,
    instance: RwLock<Option<Arc<dyn WidgetInstance>>>,
    /// Task pumping widget events into the bridges
    pump: Mutex<Option<JoinHandle<()>>>,
    /// Generation whose reauthentication is running, 0 when none
    reauth_in_flight: AtomicU64,
    reauth_stats: RwLock<ReauthStats>,
    observer: RwLock<Option<Arc<dyn SessionObserver>>>,
    /// Bumped by every activation and deactivation; stale activations bail out
    generation: AtomicU64,
}

/// Compare instance handles by data address
fn same_instance(a: &Arc<dyn WidgetInstance>, b: &Arc<dyn WidgetInstance>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl EmbeddingSession {
    pub fn new(
        provider: Arc<dyn CredentialProvider>,
        runtime: Arc<dyn WidgetRuntime>,
        host: HostBindings,
        options: SessionOptions,
    ) -> Self {
        let options = options.resolved_for(host.form_factor);
        let bridges = BridgeTable::from_options(&options);
        debug!("Session created with {} event bridges", bridges.len());

        Self {
            inner: Arc::new(Inner {
                provider,
                runtime,
                host,
                options,
                bridges,
                state: RwLock::new(SessionState::Idle),
                instance: RwLock::new(None),
                pump: Mutex::new(None),
                reauth_in_flight: AtomicU64::new(0),
                reauth_stats: RwLock::new(ReauthStats::default()),
                observer: RwLock::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Attach an observer for state transitions
    pub fn set_observer(&self, observer: Arc<dyn SessionObserver>) {
        *self.inner.observer.write() = Some(observer);
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.read().clone()
    }

    /// The live widget instance, if any
    pub fn instance(&self) -> Option<Arc<dyn WidgetInstance>> {
        self.inner.instance.read().clone()
    }

    pub fn reauth_stats(&self) -> ReauthStats {
        self.inner.reauth_stats.read().clone()
    }

    /// Options the widget is constructed with
    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    pub fn bridges(&self) -> &BridgeTable {
        &self.inner.bridges
    }

    /// Activate the session against `target`.
    ///
    /// Loads the runtime and fetches credentials concurrently, then constructs
    /// the widget. Activation failures do not surface as `Err`: they end in
    /// [`SessionState::Error`]. Returns the state the activation ended in.
    pub async fn activate(
        &self,
        target: Arc<dyn PresentationSurface>,
    ) -> Result<SessionState, SessionError> {
        let pending = self.begin_activation()?;
        Ok(self.complete_activation(pending, target).await)
    }

    /// Claim the session for an activation and enter Loading.
    ///
    /// Lets callers that run the rest of the activation elsewhere learn of a
    /// rejection synchronously. Finish with [`Self::complete_activation`].
    pub fn begin_activation(&self) -> Result<PendingActivation, SessionError> {
        let inner = &self.inner;
        let generation = {
            let mut state = inner.state.write();
            if state.is_busy() {
                return Err(SessionError::AlreadyActive);
            }
            *state = SessionState::Loading;
            inner.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        inner.notify(&SessionState::Loading);
        Ok(PendingActivation { generation })
    }

    /// Run a claimed activation to Active or Error
    pub async fn complete_activation(
        &self,
        pending: PendingActivation,
        target: Arc<dyn PresentationSurface>,
    ) -> SessionState {
        let inner = &self.inner;
        let generation = pending.generation;
        info!("Activating Qwil session");

        target.set_mode(SurfaceMode::FullPage);

        // Join, not race: both settle before anything is acted upon
        let (loaded, credentials) = tokio::join!(inner.runtime.load(), inner.provider.fetch());

        if inner.is_stale(generation) {
            debug!("Session deactivated while loading");
            return self.state();
        }

        let credentials = match (credentials, loaded) {
            (Err(e), _) => {
                warn!("Failed to fetch Qwil credentials: {}", e);
                return inner.fail_inline(generation, &target, e.message().to_string());
            }
            (Ok(_), Err(e)) => {
                warn!("{}", e);
                return inner.fail_inline(generation, &target, RUNTIME_LOAD_FAILED.to_string());
            }
            (Ok(credentials), Ok(())) => credentials,
        };

        let config = WidgetConfig {
            credentials,
            options: inner.options.clone(),
            target: Arc::clone(&target),
        };

        let instance = match inner.runtime.construct(config).await {
            Ok(instance) => instance,
            Err(e) => {
                warn!("Widget failed to initialize: {}", e);
                inner.transition_if_current(
                    generation,
                    SessionState::Error(WIDGET_LOGIN_FAILED.to_string()),
                );
                return self.state();
            }
        };

        {
            let mut slot = inner.instance.write();
            if inner.is_stale(generation) {
                drop(slot);
                debug!("Session deactivated during construction, destroying instance");
                instance.destroy();
                return self.state();
            }
            *slot = Some(Arc::clone(&instance));
        }

        // A deactivate landing here has already taken and destroyed the instance
        if !inner.transition_if_current(generation, SessionState::Active) {
            debug!("Session deactivated before becoming active");
            return self.state();
        }
        info!("Qwil login successful");

        match instance.events() {
            Some(events) => Inner::start_pump(inner, generation, instance, events, target),
            None => warn!("Widget instance has no event stream; events will not be bridged"),
        }

        self.state()
    }

    /// Tear down the widget instance, if any, and return to Idle.
    ///
    /// Safe to call repeatedly; the instance is destroyed at most once.
    pub fn deactivate(&self) {
        let inner = &self.inner;
        inner.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(pump) = inner.pump.lock().take() {
            pump.abort();
        }

        let instance = inner.instance.write().take();
        if let Some(instance) = instance {
            info!("Destroying widget instance");
            instance.destroy();
        }

        let was_idle = {
            let mut state = inner.state.write();
            std::mem::replace(&mut *state, SessionState::Idle) == SessionState::Idle
        };
        if !was_idle {
            inner.notify(&SessionState::Idle);
        }
    }
}

impl Drop for EmbeddingSession {
    fn drop(&mut self) {
        self.deactivate();
    }
}

impl Inner {
    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn notify(&self, state: &SessionState) {
        let observer = self.observer.read().clone();
        if let Some(observer) = observer {
            observer.on_state_changed(state);
        }
    }

    /// Move to `next` unless a deactivation or newer activation superseded
    /// `generation`. The check and the write happen under the state lock.
    fn transition_if_current(&self, generation: u64, next: SessionState) -> bool {
        {
            let mut state = self.state.write();
            if self.is_stale(generation) {
                return false;
            }
            *state = next.clone();
        }
        debug!("Session state -> {}", next);
        self.notify(&next);
        true
    }

    /// Enter Error with the surface switched to inline presentation
    fn fail_inline(
        &self,
        generation: u64,
        target: &Arc<dyn PresentationSurface>,
        message: String,
    ) -> SessionState {
        let state = SessionState::Error(message);
        if self.transition_if_current(generation, state.clone()) {
            target.set_mode(SurfaceMode::Inline);
            state
        } else {
            self.state.read().clone()
        }
    }

    fn start_pump(
        self: &Arc<Self>,
        generation: u64,
        instance: Arc<dyn WidgetInstance>,
        mut events: EventReceiver,
        target: Arc<dyn PresentationSurface>,
    ) {
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            debug!("Event pump started");

            while let Some(event) = events.recv().await {
                let kind = event.kind();
                match inner.bridges.bridge_for(kind) {
                    None => debug!("No bridge for {}, ignoring", kind),
                    Some(Bridge::Reauthenticate) => {
                        inner.spawn_reauth(generation, Arc::clone(&instance))
                    }
                    Some(bridge) => {
                        debug!("Bridging {} via {:?}", kind, bridge);
                        handle_host_event(event, &inner.host, target.as_ref());
                    }
                }
            }

            inner.on_events_closed(generation, &instance);
        });

        // Deactivate bumps the generation before taking the pump
        let mut pump = self.pump.lock();
        if self.is_stale(generation) {
            handle.abort();
        } else {
            *pump = Some(handle);
        }
    }

    /// The widget dropped its event stream while still owned by us
    fn on_events_closed(&self, generation: u64, instance: &Arc<dyn WidgetInstance>) {
        let released = {
            let mut slot = self.instance.write();
            match slot.as_ref() {
                Some(live) if same_instance(live, instance) => slot.take().is_some(),
                _ => false,
            }
        };

        if released {
            warn!("Widget event stream closed unexpectedly");
            self.pump.lock().take();
            self.transition_if_current(
                generation,
                SessionState::Error(WIDGET_LOGIN_FAILED.to_string()),
            );
        } else {
            debug!("Event pump finished");
        }
    }

    /// Start a reauthentication unless one is already running
    ///
    /// The guard is keyed by activation generation, so a fetch still running
    /// for a torn-down instance never swallows the next instance's expiry.
    fn spawn_reauth(self: &Arc<Self>, generation: u64, instance: Arc<dyn WidgetInstance>) {
        if self.reauth_in_flight.swap(generation, Ordering::SeqCst) == generation {
            debug!("Reauthentication already in flight, coalescing auth-expired");
            self.reauth_stats.write().coalesced += 1;
            return;
        }

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.reauthenticate(instance).await;
            // Leave a newer generation's guard alone
            let _ = inner.reauth_in_flight.compare_exchange(
                generation,
                0,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
        });
    }

    async fn reauthenticate(&self, instance: Arc<dyn WidgetInstance>) {
        warn!("Qwil session expired. Reauthenticating.");
        self.reauth_stats.write().attempts += 1;

        let credentials = match self.provider.fetch().await {
            Ok(credentials) => credentials,
            Err(e) => {
                let failures = {
                    let mut stats = self.reauth_stats.write();
                    stats.record_failure(e.message());
                    stats.consecutive_failures
                };
                warn!("Reauthentication failed ({} in a row), keeping session: {}", failures, e);
                return;
            }
        };

        let live = {
            let slot = self.instance.read();
            slot.as_ref()
                .filter(|live| same_instance(live, &instance))
                .cloned()
        };

        // No lock held: the host may deactivate from inside the callback
        match live {
            Some(live) => {
                live.reauthenticate(&credentials);
                self.reauth_stats.write().record_success();
                info!("Qwil session reauthenticated");
            }
            None => debug!("Instance gone before reauthentication finished"),
        }
    }
}
