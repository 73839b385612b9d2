use serde::{Deserialize, Serialize};

use crate::provider::Provider;

/// Input events the REPL feeds to the controller, one at a time
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Send a chat message (chat mode only)
    Submit { text: String },

    /// Switch to a different provider and reload its stored key
    SwitchProvider { provider: Provider },

    /// Store a key for the current provider; empty clears it
    UpdateCredential { secret: String },

    /// Switch between chat and edit views
    SwitchMode { mode: ViewMode },

    /// Append a line to the preview document (edit mode only)
    EditPreview { line: String },

    /// Empty the preview document (edit mode only)
    ClearPreview,

    /// Swap the whole preview document for `content` (edit mode only)
    ReplacePreview { content: String },

    /// Read the mirrored preview file back in after an outside edit (edit mode only)
    ReloadPreview,

    ShowPreview,
    ShowProviders,
    ShowHistory,
    ShowHelp,

    /// Request to exit the application
    ExitRequest,

    /// Input that could not be understood
    ShowError { message: String },
}

/// Where a plain input line goes: to the model or into the preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Conversation log plus draft input
    #[default]
    Chat,
    /// Direct editing of the preview document
    Edit,
}

impl ViewMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            ViewMode::Chat => "Chat",
            ViewMode::Edit => "Edit",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ViewMode::Chat => "Talk to the model; HTML replies update the preview",
            ViewMode::Edit => "Type lines straight into the preview document",
        }
    }

    pub fn toggled(&self) -> ViewMode {
        match self {
            ViewMode::Chat => ViewMode::Edit,
            ViewMode::Edit => ViewMode::Chat,
        }
    }

    pub fn parse(input: &str) -> Option<ViewMode> {
        match input.trim().to_lowercase().as_str() {
            "c" | "chat" => Some(ViewMode::Chat),
            "e" | "edit" => Some(ViewMode::Edit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_round_trips() {
        assert_eq!(ViewMode::Chat.toggled(), ViewMode::Edit);
        assert_eq!(ViewMode::Edit.toggled().toggled(), ViewMode::Edit);
    }

    #[test]
    fn test_parse_accepts_short_forms() {
        assert_eq!(ViewMode::parse(" E "), Some(ViewMode::Edit));
        assert_eq!(ViewMode::parse("chat"), Some(ViewMode::Chat));
        assert_eq!(ViewMode::parse("preview"), None);
    }
}
