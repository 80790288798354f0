//! Event bridges: widget events to host actions

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::host::{trigger_anchor, AnchorSpec, HostBindings, PresentationSurface, Severity, Toast};
use crate::widget::{EventKind, SessionOptions, WidgetEvent};

/// Toast title for in-app errors
const APP_ERROR_TITLE: &str = "Qwil Chat";

/// Toast title for contact taps
const CONTACT_TITLE: &str = "Qwil click-on-contact";

/// Host action bound to a widget event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bridge {
    /// Refetch credentials and reauthenticate the live instance
    Reauthenticate,
    /// Show the contact payload as a toast
    NotifyContact,
    /// Show the in-app error as a warning toast
    NotifyAppError,
    /// Download through a transient anchor in the outer surface
    Download,
    /// Open a URL in a new browsing context through a transient anchor
    OpenInNewContext,
    /// Host navigation back
    NavigateBack,
}

/// Which events are bridged, and to what
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeTable {
    entries: HashMap<EventKind, Bridge>,
}

impl BridgeTable {
    /// Build the table for the options the widget was constructed with.
    ///
    /// Events the options keep inside the widget get no entry.
    pub fn from_options(options: &SessionOptions) -> Self {
        let mut entries = HashMap::new();
        entries.insert(EventKind::AuthExpired, Bridge::Reauthenticate);
        entries.insert(EventKind::AppError, Bridge::NotifyAppError);

        if options.contacts_tappable {
            entries.insert(EventKind::ClickOnContact, Bridge::NotifyContact);
        }
        if options.emit_downloads {
            entries.insert(EventKind::DownloadRequest, Bridge::Download);
        }
        if options.emit_meeting_join {
            entries.insert(EventKind::MeetingJoin, Bridge::OpenInNewContext);
        }
        if options.emit_chat_list_back {
            entries.insert(EventKind::ChatListBack, Bridge::NavigateBack);
        }

        Self { entries }
    }

    pub fn bridge_for(&self, kind: EventKind) -> Option<Bridge> {
        self.entries.get(&kind).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Run the host side of a bridged event.
///
/// Reauthentication is not a host action and is ignored here.
pub(crate) fn handle_host_event(
    event: WidgetEvent,
    host: &HostBindings,
    surface: &dyn PresentationSurface,
) {
    match event {
        WidgetEvent::AuthExpired => {}

        WidgetEvent::ClickOnContact(payload) => {
            info!("Contact tapped in widget");
            host.notifications.show(Toast {
                title: CONTACT_TITLE.to_string(),
                message: format!("Host received event with payload {}", payload),
                severity: Severity::Success,
                dismissable: true,
            });
        }

        WidgetEvent::AppError { message } => {
            warn!("Widget reported error: {}", message);
            host.notifications.show(Toast {
                title: APP_ERROR_TITLE.to_string(),
                message,
                severity: Severity::Warning,
                dismissable: true,
            });
        }

        WidgetEvent::DownloadRequest { filename, url } => {
            debug!("Downloading {} from outer surface", filename);
            if let Err(e) = trigger_anchor(surface, AnchorSpec::download(url, filename)) {
                warn!("Download failed: {}", e);
            }
        }

        WidgetEvent::MeetingJoin { url } => {
            debug!("Opening meeting in new context");
            if let Err(e) = trigger_anchor(surface, AnchorSpec::new_context(url)) {
                warn!("Opening meeting failed: {}", e);
            }
        }

        WidgetEvent::ChatListBack => match &host.navigator {
            Some(navigator) => navigator.back(),
            None => debug!("chat-list-back with no navigator attached"),
        },
    }
}
