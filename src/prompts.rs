/// Instruction sent ahead of every conversation, whichever provider answers it.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that generates HTML content. Please respond with valid HTML wrapped in <html> tags.";

pub const BANNER: &str = r#"pagechat: describe a page and the model writes it.

Replies wrapped in <html>...</html> replace the preview document.
Type /help for commands, /edit to edit the preview directly, /bye to leave.
"#;

pub const CHAT_PLACEHOLDER: &str = "Describe the page you want...";
pub const EDIT_PLACEHOLDER: &str = "Type HTML to append to the preview, /clear to start over...";
