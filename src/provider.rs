use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// LLM backends a conversation can be routed to
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Provider {
    #[default]
    #[serde(rename = "openai")]
    #[strum(to_string = "openai", serialize = "gpt")]
    OpenAi,
    #[serde(rename = "anthropic")]
    #[strum(to_string = "anthropic", serialize = "claude")]
    Anthropic,
    /// Hosted relay used when no personal key is available
    #[serde(rename = "default-relay", alias = "default", alias = "relay")]
    #[strum(to_string = "default-relay", serialize = "default", serialize = "relay")]
    DefaultRelay,
}

impl Provider {
    /// Key under which this provider's secret lives in the credential store.
    /// The relay authenticates with configured server-side credentials, so it has none.
    pub fn credential_key(self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("openai_api_key"),
            Provider::Anthropic => Some("anthropic_api_key"),
            Provider::DefaultRelay => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::DefaultRelay => "Default relay",
        }
    }

    pub fn all() -> Vec<Provider> {
        Provider::iter().collect()
    }
}
