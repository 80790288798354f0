//! Host-side interfaces
//!
//! The session never renders anything itself. It calls into these traits,
//! which the embedding host implements (a native view, a web page, a terminal).

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::widget::FormFactor;

/// Toast severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// A message for the host notification channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub dismissable: bool,
}

/// Fire-and-forget "show message" channel
pub trait NotificationChannel: Send + Sync {
    fn show(&self, toast: Toast);
}

/// Host navigation
pub trait Navigator: Send + Sync {
    /// Leave the embedded chat list
    fn back(&self);
}

/// Presentation mode of the widget container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceMode {
    /// The widget fills the page
    #[default]
    FullPage,
    /// Room for an inline error message
    Inline,
}

/// Handle of an element appended to a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An anchor-like element the host can synthesize and click
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorSpec {
    pub href: String,
    /// Suggested file name; makes the click a download
    pub download: Option<String>,
    /// Browsing context, e.g. `_blank`
    pub target: Option<String>,
}

impl AnchorSpec {
    pub fn download(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            href: url.into(),
            download: Some(filename.into()),
            target: None,
        }
    }

    pub fn new_context(url: impl Into<String>) -> Self {
        Self {
            href: url.into(),
            download: None,
            target: Some("_blank".to_string()),
        }
    }
}

/// A host element operation failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("Could not create element: {0}")]
    Create(String),

    #[error("Could not activate element {0}")]
    Activate(ElementId),
}

/// DOM-like container the widget is bound to
pub trait PresentationSurface: Send + Sync {
    fn set_mode(&self, mode: SurfaceMode);

    fn append(&self, anchor: AnchorSpec) -> Result<ElementId, HostError>;

    fn click(&self, id: ElementId) -> Result<(), HostError>;

    fn remove(&self, id: ElementId);

    /// Number of elements currently attached
    fn element_count(&self) -> usize;
}

/// An element attached to a surface for exactly one use.
///
/// Removed from the surface when dropped, whatever happened in between.
pub struct TransientElement<'a> {
    surface: &'a dyn PresentationSurface,
    id: ElementId,
}

impl<'a> TransientElement<'a> {
    pub fn append(surface: &'a dyn PresentationSurface, anchor: AnchorSpec) -> Result<Self, HostError> {
        let id = surface.append(anchor)?;
        debug!("Attached transient element {}", id);
        Ok(Self { surface, id })
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Activate the element, consuming it
    pub fn click(self) -> Result<(), HostError> {
        self.surface.click(self.id)
    }
}

impl Drop for TransientElement<'_> {
    fn drop(&mut self) {
        self.surface.remove(self.id);
        debug!("Removed transient element {}", self.id);
    }
}

/// Synthesize an anchor, click it once and discard it
pub fn trigger_anchor(surface: &dyn PresentationSurface, anchor: AnchorSpec) -> Result<(), HostError> {
    TransientElement::append(surface, anchor)?.click()
}

/// The host collaborators a session reports to
#[derive(Clone)]
pub struct HostBindings {
    pub notifications: Arc<dyn NotificationChannel>,
    pub navigator: Option<Arc<dyn Navigator>>,
    /// Static form factor of the host platform
    pub form_factor: FormFactor,
}

impl HostBindings {
    pub fn new(notifications: Arc<dyn NotificationChannel>, form_factor: FormFactor) -> Self {
        Self {
            notifications,
            navigator: None,
            form_factor,
        }
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSurface;

    #[test]
    fn test_trigger_anchor_leaves_no_residue() {
        let surface = FakeSurface::new();
        let before = surface.element_count();

        trigger_anchor(&surface, AnchorSpec::download("https://files/a", "a.pdf")).unwrap();

        assert_eq!(surface.element_count(), before);
        assert_eq!(
            surface.clicked(),
            vec![AnchorSpec::download("https://files/a", "a.pdf")]
        );
    }

    #[test]
    fn test_failed_click_still_removes_element() {
        let surface = FakeSurface::new();
        surface.fail_clicks(true);

        let err = trigger_anchor(&surface, AnchorSpec::new_context("https://meet/1")).unwrap_err();

        assert!(matches!(err, HostError::Activate(_)));
        assert_eq!(surface.element_count(), 0);
        assert!(surface.clicked().is_empty());
    }

    #[test]
    fn test_failed_append_attaches_nothing() {
        let surface = FakeSurface::new();
        surface.fail_appends(true);

        assert!(trigger_anchor(&surface, AnchorSpec::new_context("https://meet/1")).is_err());
        assert_eq!(surface.element_count(), 0);
    }
}
