//! Widget startup options

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Host form factor, as reported by the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFactor {
    Small,
    Medium,
    /// Desktop
    #[default]
    Large,
}

impl FormFactor {
    /// Whether the widget should hand downloads to the host.
    ///
    /// Downloads started inside the embedded frame only work on desktop.
    pub fn emits_downloads(self) -> bool {
        self != FormFactor::Large
    }
}

impl FromStr for FormFactor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" | "phone" => Ok(FormFactor::Small),
            "medium" | "tablet" => Ok(FormFactor::Medium),
            "large" | "desktop" => Ok(FormFactor::Large),
            other => Err(format!("Unknown form factor: {}", other)),
        }
    }
}

/// Chat bubble colours
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Theme {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bubble_bg_colour: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bubble_text_colour: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bubble_link_colour: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bubble_bg_colour2: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bubble_text_colour2: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bubble_link_colour2: String,
}

impl Theme {
    pub fn is_empty(&self) -> bool {
        *self == Theme::default()
    }
}

/// Options handed to the widget once, at construction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionOptions {
    /// Initial in-app route
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Emit click-on-contact instead of opening the contact in-app
    pub contacts_tappable: bool,
    pub image_preview: bool,
    pub pdf_preview: bool,
    /// Emit download-request instead of downloading inside the frame
    pub emit_downloads: bool,
    /// Emit meeting-join instead of opening a window from the frame
    pub emit_meeting_join: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub chat_list_title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub chat_list_logo: String,
    /// Emit chat-list-back from the chat list header
    pub emit_chat_list_back: bool,
    pub hide_chat_back: bool,
    #[serde(skip_serializing_if = "Theme::is_empty")]
    pub theme: Theme,
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON document; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Options as sent to the widget
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Apply the runtime overrides for the given host form factor
    pub fn resolved_for(mut self, form_factor: FormFactor) -> Self {
        self.emit_downloads = form_factor.emits_downloads();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_contacts_tappable(mut self, enabled: bool) -> Self {
        self.contacts_tappable = enabled;
        self
    }

    pub fn with_previews(mut self, images: bool, pdfs: bool) -> Self {
        self.image_preview = images;
        self.pdf_preview = pdfs;
        self
    }

    pub fn with_meeting_join(mut self, enabled: bool) -> Self {
        self.emit_meeting_join = enabled;
        self
    }

    pub fn with_chat_list(
        mut self,
        title: impl Into<String>,
        logo: impl Into<String>,
        emit_back: bool,
    ) -> Self {
        self.chat_list_title = title.into();
        self.chat_list_logo = logo.into();
        self.emit_chat_list_back = emit_back;
        self
    }

    pub fn with_hide_chat_back(mut self, hide: bool) -> Self {
        self.hide_chat_back = hide;
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_are_empty_or_false() {
        let opts = SessionOptions::default();
        assert!(opts.path.is_empty());
        assert!(!opts.contacts_tappable);
        assert!(!opts.emit_downloads);
        assert!(!opts.emit_meeting_join);
        assert!(opts.theme.is_empty());
    }

    #[test]
    fn test_emit_downloads_follows_form_factor() {
        let opts = SessionOptions::new();
        assert!(opts.clone().resolved_for(FormFactor::Small).emit_downloads);
        assert!(opts.clone().resolved_for(FormFactor::Medium).emit_downloads);
        assert!(!opts.resolved_for(FormFactor::Large).emit_downloads);

        // Host-supplied value is overridden either way
        let mut opts = SessionOptions::new();
        opts.emit_downloads = true;
        assert!(!opts.resolved_for(FormFactor::Large).emit_downloads);
    }

    #[test]
    fn test_wire_names() {
        let opts = SessionOptions::new()
            .with_contacts_tappable(true)
            .with_chat_list("Inbox", "", true)
            .with_theme(Theme {
                bubble_bg_colour2: "#fff".into(),
                ..Theme::default()
            });

        assert_eq!(
            opts.to_json(),
            json!({
                "contactsTappable": true,
                "imagePreview": false,
                "pdfPreview": false,
                "emitDownloads": false,
                "emitMeetingJoin": false,
                "chatListTitle": "Inbox",
                "emitChatListBack": true,
                "hideChatBack": false,
                "theme": { "bubbleBgColour2": "#fff" }
            })
        );
    }

    #[test]
    fn test_from_json_partial() {
        let opts = SessionOptions::from_json(r#"{"path":"/chats","emitMeetingJoin":true}"#).unwrap();
        assert_eq!(opts.path, "/chats");
        assert!(opts.emit_meeting_join);
        assert!(!opts.hide_chat_back);
    }

    #[test]
    fn test_form_factor_parse() {
        assert_eq!("desktop".parse::<FormFactor>(), Ok(FormFactor::Large));
        assert_eq!("Phone".parse::<FormFactor>(), Ok(FormFactor::Small));
        assert!("watch".parse::<FormFactor>().is_err());
    }
}
