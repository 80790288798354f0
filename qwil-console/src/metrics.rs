//! Activity tracking for the console host

use chrono::{DateTime, Local};
use qwil_core::host::{SurfaceMode, Toast};
use qwil_core::session::{ReauthStats, SessionState};
use std::collections::VecDeque;

/// Maximum number of log entries to keep
const MAX_LOG_ENTRIES: usize = 200;

/// A log entry for the dashboard
#[derive(Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Clone, Copy, PartialEq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    /// Session state transitions
    Session,
    /// Host actions performed for the widget
    Bridge,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Session => "SESSION",
            LogLevel::Bridge => "BRIDGE",
        }
    }
}

/// What the console host has seen so far
pub struct Metrics {
    /// Console start time
    pub start_time: DateTime<Local>,

    /// Credential backend in use
    pub auth_url: String,

    /// Form factor the session was configured for
    pub form_factor: String,

    /// Current session state
    pub state: SessionState,

    /// Presentation mode of the widget container
    pub surface_mode: SurfaceMode,

    /// Endpoint of the live widget credentials
    pub endpoint: Option<String>,

    /// Widget constructions since start
    pub constructions: u64,

    /// Toasts shown
    pub toasts: u64,

    /// Transient elements clicked
    pub anchors_clicked: u64,

    /// Transient elements currently attached
    pub attached_elements: usize,

    /// Latest reauthentication counters
    pub reauth: ReauthStats,

    /// Log entries
    pub logs: VecDeque<LogEntry>,
}

impl Metrics {
    pub fn new(auth_url: impl Into<String>, form_factor: impl Into<String>) -> Self {
        Self {
            start_time: Local::now(),
            auth_url: auth_url.into(),
            form_factor: form_factor.into(),
            state: SessionState::Idle,
            surface_mode: SurfaceMode::FullPage,
            endpoint: None,
            constructions: 0,
            toasts: 0,
            anchors_clicked: 0,
            attached_elements: 0,
            reauth: ReauthStats::default(),
            logs: VecDeque::with_capacity(MAX_LOG_ENTRIES),
        }
    }

    /// Add a log entry
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.logs.len() >= MAX_LOG_ENTRIES {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry {
            timestamp: Local::now(),
            level,
            message: message.into(),
        });
    }

    /// Record a session state transition
    pub fn state_changed(&mut self, state: &SessionState) {
        self.state = state.clone();
        let level = match state {
            SessionState::Error(_) => LogLevel::Error,
            _ => LogLevel::Session,
        };
        self.log(level, format!("Session {}", state));
        if !state.is_busy() {
            self.endpoint = None;
        }
    }

    /// Record a toast shown by the bridges
    pub fn toast_shown(&mut self, toast: &Toast) {
        self.toasts += 1;
        self.log(
            LogLevel::Bridge,
            format!("Toast [{}] {}: {}", toast.severity.as_str(), toast.title, toast.message),
        );
    }

    /// Get uptime as formatted string
    pub fn uptime(&self) -> String {
        let duration = Local::now().signed_duration_since(self.start_time);
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            let hours = secs / 3600;
            let mins = (secs % 3600) / 60;
            format!("{}h {}m", hours, mins)
        }
    }
}
