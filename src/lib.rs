//! pagechat: chat with an LLM provider and keep the HTML it writes in a live preview.

pub mod commands;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod events;
pub mod llm;
pub mod preview;
pub mod prompts;
pub mod provider;
pub mod repl;
pub mod storage;

pub use config::Config;
pub use controller::{ControllerSettings, ConversationController, ReplyOutcome, Submission};
pub use conversation::{ConversationLog, Message, Role};
pub use error::LlmError;
pub use events::{AppEvent, ViewMode};
pub use llm::{ApiRequest, ChatTransport, LlmClient, ProviderAdapter};
pub use preview::{extract_html, MissPolicy, PreviewDocument};
pub use provider::Provider;
pub use storage::CredentialStore;
