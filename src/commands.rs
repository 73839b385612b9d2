use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::events::{AppEvent, ViewMode};
use crate::provider::Provider;

/// Commands that can be invoked by starting a line with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Switch provider (openai, anthropic, default-relay); no argument lists them
    Provider,
    /// Store or clear the API key for the current provider
    Key,
    /// Switch view mode (chat, edit); no argument toggles
    Mode,
    /// Shorthand for `/mode chat`
    Chat,
    /// Shorthand for `/mode edit`
    Edit,
    /// Print the preview document
    Show,
    /// Print the conversation log
    History,
    /// Empty the preview document (edit mode)
    Clear,
    /// Replace the preview document with the given HTML (edit mode)
    Set,
    /// Re-read the preview file after editing it elsewhere (edit mode)
    Reload,
    /// Show help
    Help,
    /// Exit the application
    Bye,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Translate into the event the REPL dispatches
    pub fn into_event(self, current_mode: ViewMode) -> AppEvent {
        match self.command {
            SlashCommand::Provider => match self.argument() {
                Some(name) => match Provider::from_str(name.trim()) {
                    Ok(provider) => AppEvent::SwitchProvider { provider },
                    Err(_) => AppEvent::ShowError {
                        message: format!(
                            "Unknown provider '{}'. Choose one of: {}",
                            name.trim(),
                            provider_names()
                        ),
                    },
                },
                None => AppEvent::ShowProviders,
            },
            SlashCommand::Key => AppEvent::UpdateCredential {
                secret: self.argument.unwrap_or_default(),
            },
            SlashCommand::Mode => match self.argument() {
                None => AppEvent::SwitchMode {
                    mode: current_mode.toggled(),
                },
                Some(arg) => match ViewMode::parse(arg) {
                    Some(mode) => AppEvent::SwitchMode { mode },
                    None => AppEvent::ShowError {
                        message: format!("Unknown mode '{}'. Use chat or edit.", arg.trim()),
                    },
                },
            },
            SlashCommand::Chat => AppEvent::SwitchMode { mode: ViewMode::Chat },
            SlashCommand::Edit => AppEvent::SwitchMode { mode: ViewMode::Edit },
            SlashCommand::Show => AppEvent::ShowPreview,
            SlashCommand::History => AppEvent::ShowHistory,
            SlashCommand::Clear => AppEvent::ClearPreview,
            SlashCommand::Set => AppEvent::ReplacePreview {
                content: self.argument.unwrap_or_default(),
            },
            SlashCommand::Reload => AppEvent::ReloadPreview,
            SlashCommand::Help => AppEvent::ShowHelp,
            SlashCommand::Bye => AppEvent::ExitRequest,
        }
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Provider => "switch provider (openai, anthropic, default-relay); no argument lists them",
            SlashCommand::Key => "store the API key for the current provider; no argument clears it",
            SlashCommand::Mode => "switch view mode (chat, edit); no argument toggles",
            SlashCommand::Chat => "switch to chat mode",
            SlashCommand::Edit => "switch to edit mode and type into the preview",
            SlashCommand::Show => "print the preview document",
            SlashCommand::History => "print the conversation so far",
            SlashCommand::Clear => "empty the preview document (edit mode)",
            SlashCommand::Set => "replace the whole preview document with the given HTML (edit mode)",
            SlashCommand::Reload => "read the preview file back in after editing it elsewhere (edit mode)",
            SlashCommand::Help => "show available commands",
            SlashCommand::Bye => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

fn provider_names() -> String {
    Provider::all()
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim_start().strip_prefix('/')?;

    let rest = rest.trim_start();
    let head = rest.split_whitespace().next()?;
    let remainder = rest[head.len()..].trim();

    let command = SlashCommand::from_str(&head.to_lowercase()).ok().or_else(|| {
        match head.to_lowercase().as_str() {
            "q" | "quit" | "exit" => Some(SlashCommand::Bye),
            "p" | "providers" => Some(SlashCommand::Provider),
            "m" => Some(SlashCommand::Mode),
            "h" | "?" => Some(SlashCommand::Help),
            "preview" => Some(SlashCommand::Show),
            "log" => Some(SlashCommand::History),
            _ => None,
        }
    })?;

    let argument = if remainder.is_empty() {
        None
    } else {
        Some(remainder.to_string())
    };

    Some(ParsedCommand { command, argument })
}

/// Turn one line of REPL input into an event.
///
/// In edit mode a line that is not a known command goes into the preview
/// as typed, so `/* css */` and `// js` comments survive. A leading `\`
/// escapes a line that would otherwise parse as a command.
pub fn parse_input(line: &str, mode: ViewMode) -> AppEvent {
    if mode == ViewMode::Edit {
        if let Some(escaped) = line.strip_prefix('\\') {
            return AppEvent::EditPreview {
                line: escaped.to_string(),
            };
        }
    }

    if let Some(command) = parse_slash_command(line) {
        return command.into_event(mode);
    }

    if mode == ViewMode::Chat && line.trim_start().starts_with('/') {
        return AppEvent::ShowError {
            message: format!("Unknown command '{}'. Type /help.", line.trim()),
        };
    }

    match mode {
        ViewMode::Chat => AppEvent::Submit {
            text: line.to_string(),
        },
        ViewMode::Edit => AppEvent::EditPreview {
            line: line.to_string(),
        },
    }
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for command in SlashCommand::iter() {
        help.push_str(&format!("/{} - {}\n", command.command(), command.description()));
    }

    help.push_str("\nAliases: /q for /bye, /p and /providers for /provider, /m for /mode, /preview for /show.");
    help.push_str("\nIn chat mode a plain line is sent to the model; in edit mode it is appended to the preview.");
    help.push_str("\nIn edit mode, start a line with \\ to append it even if it looks like a command.");

    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_depends_on_mode() {
        assert_eq!(
            parse_input("a red button", ViewMode::Chat),
            AppEvent::Submit { text: "a red button".into() }
        );
        assert_eq!(
            parse_input("<p>hi</p>", ViewMode::Edit),
            AppEvent::EditPreview { line: "<p>hi</p>".into() }
        );
    }

    #[test]
    fn test_provider_command() {
        assert_eq!(
            parse_input("/provider anthropic", ViewMode::Chat),
            AppEvent::SwitchProvider { provider: Provider::Anthropic }
        );
        assert_eq!(
            parse_input("/p relay", ViewMode::Chat),
            AppEvent::SwitchProvider { provider: Provider::DefaultRelay }
        );
        assert!(matches!(
            parse_input("/provider gemini", ViewMode::Chat),
            AppEvent::ShowError { .. }
        ));
    }

    #[test]
    fn test_key_without_argument_clears() {
        assert_eq!(
            parse_input("/key", ViewMode::Chat),
            AppEvent::UpdateCredential { secret: String::new() }
        );
        assert_eq!(
            parse_input("/key sk-123", ViewMode::Chat),
            AppEvent::UpdateCredential { secret: "sk-123".into() }
        );
    }

    #[test]
    fn test_mode_toggles_without_argument() {
        assert_eq!(
            parse_input("/mode", ViewMode::Chat),
            AppEvent::SwitchMode { mode: ViewMode::Edit }
        );
        assert_eq!(
            parse_input("/mode chat", ViewMode::Chat),
            AppEvent::SwitchMode { mode: ViewMode::Chat }
        );
        assert_eq!(
            parse_input("/edit", ViewMode::Chat),
            AppEvent::SwitchMode { mode: ViewMode::Edit }
        );
    }

    #[test]
    fn test_aliases_and_unknown() {
        assert_eq!(parse_input("/q", ViewMode::Edit), AppEvent::ExitRequest);
        assert_eq!(parse_input("/QUIT", ViewMode::Chat), AppEvent::ExitRequest);
        assert!(matches!(
            parse_input("/frobnicate", ViewMode::Chat),
            AppEvent::ShowError { .. }
        ));
    }

    #[test]
    fn test_edit_mode_keeps_comment_lines() {
        assert_eq!(
            parse_input("/* header */", ViewMode::Edit),
            AppEvent::EditPreview { line: "/* header */".into() }
        );
        assert_eq!(
            parse_input("// note", ViewMode::Edit),
            AppEvent::EditPreview { line: "// note".into() }
        );
        assert_eq!(
            parse_input("/frobnicate", ViewMode::Edit),
            AppEvent::EditPreview { line: "/frobnicate".into() }
        );
        assert_eq!(parse_input("/chat", ViewMode::Edit), AppEvent::SwitchMode { mode: ViewMode::Chat });
    }

    #[test]
    fn test_backslash_escapes_commands_in_edit_mode() {
        assert_eq!(
            parse_input("\\/help", ViewMode::Edit),
            AppEvent::EditPreview { line: "/help".into() }
        );
        // Only edit mode treats the backslash specially.
        assert_eq!(
            parse_input("\\/help", ViewMode::Chat),
            AppEvent::Submit { text: "\\/help".into() }
        );
    }

    #[test]
    fn test_set_keeps_argument_verbatim() {
        assert_eq!(
            parse_input("/set <p>a   b</p>", ViewMode::Edit),
            AppEvent::ReplacePreview { content: "<p>a   b</p>".into() }
        );
        assert_eq!(parse_input("/reload", ViewMode::Edit), AppEvent::ReloadPreview);
    }

    #[test]
    fn test_provider_without_argument_lists() {
        assert_eq!(parse_input("/providers", ViewMode::Chat), AppEvent::ShowProviders);
        assert_eq!(parse_input("/provider", ViewMode::Chat), AppEvent::ShowProviders);
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = get_help_text();
        for command in SlashCommand::iter() {
            assert!(help.contains(&format!("/{} ", command.command())));
        }
    }
}
