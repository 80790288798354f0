//! Qwil Console - terminal host for the embedded chat widget
//!
//! Drives a real embedding session against a credential backend, with a
//! loopback widget whose events are injected from the keyboard.
//!
//! Usage:
//!   QWIL_AUTH_URL=http://127.0.0.1:8787 cargo run --release
//!   cargo run --release -- --no-dashboard          # Plain logging mode
//!   cargo run --release -- --form-factor small --options widget.json

mod commands;
mod dashboard;
mod host;
mod metrics;

use std::error::Error;
use std::sync::Arc;

use parking_lot::RwLock;
use qwil_core::credentials::AuthClient;
use qwil_core::host::HostBindings;
use qwil_core::session::EmbeddingSession;
use qwil_core::widget::{FormFactor, SessionOptions};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use commands::{Command, Console};
use host::{ConsoleHost, LoopbackRuntime};

/// Credential backend used when `QWIL_AUTH_URL` is unset
const DEFAULT_AUTH_URL: &str = "http://127.0.0.1:8787";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    let use_dashboard = !args.contains(&"--no-dashboard".to_string());

    let form_factor = flag_value(&args, "--form-factor")
        .map(|v| v.parse::<FormFactor>())
        .transpose()?
        .unwrap_or_default();

    let options = match flag_value(&args, "--options") {
        Some(path) => SessionOptions::from_json(&std::fs::read_to_string(path)?)?,
        None => SessionOptions::new()
            .with_contacts_tappable(true)
            .with_meeting_join(true),
    };

    let auth_url = std::env::var("QWIL_AUTH_URL").unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string());
    let mut client = AuthClient::new(auth_url.clone());
    if let Ok(token) = std::env::var("QWIL_SESSION_TOKEN") {
        client = client.with_session_token(token);
    }

    // Shared metrics state
    let metrics = Arc::new(RwLock::new(metrics::Metrics::new(
        auth_url,
        format!("{:?}", form_factor).to_lowercase(),
    )));

    let host = Arc::new(ConsoleHost::new(Arc::clone(&metrics)));
    let widget = Arc::new(LoopbackRuntime::new(Arc::clone(&metrics)));
    let bindings = HostBindings::new(host.clone(), form_factor).with_navigator(host.clone());

    let session = EmbeddingSession::new(Arc::new(client), widget.clone(), bindings, options);
    session.set_observer(host.clone());

    let console = Console {
        session: Arc::new(session),
        host,
        widget,
        metrics,
    };

    if use_dashboard {
        dashboard::run(console).await
    } else {
        run_with_logging(console).await
    }
}

/// Value following `flag` on the command line
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Plain mode: commands come from stdin, activity goes to the log
async fn run_with_logging(console: Console) -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("qwil_core=info".parse()?)
                .add_directive("qwil_console=info".parse()?),
        )
        .init();

    info!("Qwil console started");
    info!("Commands: activate, deactivate, expire, contact [name], error [msg], download [url], meeting [url], back, kill, status, quit");

    console.execute(Command::Activate);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let Some(command) = Command::parse(&line) else {
            info!("Unknown command: {}", line.trim());
            continue;
        };
        let is_status = command == Command::Status;
        if !console.execute(command) {
            break;
        }
        if is_status {
            if let Some(entry) = console.metrics.read().logs.back() {
                info!("{}", entry.message);
            }
        }
    }

    console.session.deactivate();
    info!("Qwil console stopped");
    Ok(())
}
