//! Console commands shared by the dashboard and plain mode

use std::sync::Arc;

use qwil_core::host::PresentationSurface;
use qwil_core::session::EmbeddingSession;
use qwil_core::widget::WidgetEvent;
use serde_json::json;
use tracing::warn;

use crate::host::{ConsoleHost, LoopbackRuntime, SharedMetrics};
use crate::metrics::LogLevel;

/// Sample URL handed out by the loopback widget
const SAMPLE_FILE_URL: &str = "https://example.com/files/transcript.pdf";
const SAMPLE_MEETING_URL: &str = "https://example.com/meet/weekly";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Activate,
    Deactivate,
    /// Make the loopback widget emit an event
    Emit(WidgetEvent),
    /// Make the loopback widget die
    Kill,
    Status,
    Quit,
}

impl Command {
    /// Parse a plain-mode command line
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.trim().splitn(2, ' ');
        let word = parts.next()?.to_ascii_lowercase();
        let rest = parts.next().map(str::trim).filter(|s| !s.is_empty());

        let command = match word.as_str() {
            "activate" | "start" => Command::Activate,
            "deactivate" | "stop" => Command::Deactivate,
            "expire" | "auth-expired" => Command::Emit(WidgetEvent::AuthExpired),
            "contact" => Command::Emit(WidgetEvent::ClickOnContact(
                json!({ "name": rest.unwrap_or("Sample Contact") }),
            )),
            "error" => Command::Emit(WidgetEvent::AppError {
                message: rest.unwrap_or("Something went wrong").to_string(),
            }),
            "download" => Command::Emit(sample_download(rest)),
            "meeting" => Command::Emit(WidgetEvent::MeetingJoin {
                url: rest.unwrap_or(SAMPLE_MEETING_URL).to_string(),
            }),
            "back" => Command::Emit(WidgetEvent::ChatListBack),
            "kill" => Command::Kill,
            "status" => Command::Status,
            "quit" | "exit" => Command::Quit,
            _ => return None,
        };
        Some(command)
    }

    /// Map a dashboard key
    pub fn from_key(c: char) -> Option<Self> {
        match c {
            's' => Some(Command::Activate),
            'd' => Some(Command::Deactivate),
            'e' => Command::parse("expire"),
            'c' => Command::parse("contact"),
            'x' => Command::parse("error"),
            'f' => Command::parse("download"),
            'm' => Command::parse("meeting"),
            'b' => Command::parse("back"),
            'k' => Some(Command::Kill),
            _ => None,
        }
    }
}

fn sample_download(url: Option<&str>) -> WidgetEvent {
    let url = url.unwrap_or(SAMPLE_FILE_URL).to_string();
    let filename = url
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("download")
        .to_string();
    WidgetEvent::DownloadRequest { filename, url }
}

/// Everything a command acts on
#[derive(Clone)]
pub struct Console {
    pub session: Arc<EmbeddingSession>,
    pub host: Arc<ConsoleHost>,
    pub widget: Arc<LoopbackRuntime>,
    pub metrics: SharedMetrics,
}

impl Console {
    /// Run a command; returns false when the console should exit
    pub fn execute(&self, command: Command) -> bool {
        match command {
            Command::Activate => {
                let session = Arc::clone(&self.session);
                let surface: Arc<dyn PresentationSurface> = self.host.clone();
                let metrics = Arc::clone(&self.metrics);
                tokio::spawn(async move {
                    if let Err(e) = session.activate(surface).await {
                        warn!("Activation rejected: {}", e);
                        metrics.write().log(LogLevel::Warning, e.to_string());
                    }
                });
            }
            Command::Deactivate => self.session.deactivate(),
            Command::Emit(event) => {
                let kind = event.kind();
                if self.widget.emit(event) {
                    self.metrics.write().log(LogLevel::Info, format!("Widget emitted {}", kind));
                } else {
                    self.metrics
                        .write()
                        .log(LogLevel::Warning, format!("No live widget to emit {}", kind));
                }
            }
            Command::Kill => {
                if self.widget.kill() {
                    self.metrics.write().log(LogLevel::Warning, "Widget killed");
                }
            }
            Command::Status => {
                let stats = self.session.reauth_stats();
                self.metrics.write().log(
                    LogLevel::Info,
                    format!(
                        "State {} | reauth {}/{} ok, {} failing, {} coalesced",
                        self.session.state(),
                        stats.successes,
                        stats.attempts,
                        stats.consecutive_failures,
                        stats.coalesced
                    ),
                );
            }
            Command::Quit => return false,
        }
        self.refresh();
        true
    }

    /// Pull counters the session does not push
    pub fn refresh(&self) {
        let stats = self.session.reauth_stats();
        self.metrics.write().reauth = stats;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("start"), Some(Command::Activate));
        assert_eq!(Command::parse("  expire "), Some(Command::Emit(WidgetEvent::AuthExpired)));
        assert_eq!(
            Command::parse("error Upload failed"),
            Some(Command::Emit(WidgetEvent::AppError {
                message: "Upload failed".into()
            }))
        );
        assert_eq!(Command::parse("dance"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_download_filename_from_url() {
        assert_eq!(
            Command::parse("download https://example.com/x/report.pdf"),
            Some(Command::Emit(WidgetEvent::DownloadRequest {
                filename: "report.pdf".into(),
                url: "https://example.com/x/report.pdf".into()
            }))
        );
        assert_eq!(
            sample_download(Some("https://example.com/")),
            WidgetEvent::DownloadRequest {
                filename: "download".into(),
                url: "https://example.com/".into()
            }
        );
    }

    #[test]
    fn test_keys() {
        assert_eq!(Command::from_key('k'), Some(Command::Kill));
        assert_eq!(Command::from_key('b'), Some(Command::Emit(WidgetEvent::ChatListBack)));
        assert_eq!(Command::from_key('z'), None);
    }
}
