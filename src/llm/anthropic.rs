use serde::Deserialize;

use super::{ApiRequest, ProviderAdapter};
use crate::config::AnthropicConfig;
use crate::conversation::{Message, Role};
use crate::error::LlmError;
use crate::provider::Provider;

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic messages endpoint. The system instruction travels in its own
/// field and the reply is an array of typed content blocks.
#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    base_url: String,
    model: String,
    max_tokens: u32,
    api_version: String,
}

impl AnthropicAdapter {
    pub fn new(config: &AnthropicConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_version: config.api_version.clone(),
        }
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn build_request(&self, system: &str, log: &[Message], secret: &str) -> ApiRequest {
        let messages: Vec<_> = log
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| serde_json::json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        ApiRequest {
            url: format!("{}/messages", self.base_url),
            headers: vec![
                ("x-api-key", secret.to_string()),
                ("anthropic-version", self.api_version.clone()),
                ("Content-Type", "application/json".to_string()),
            ],
            body: serde_json::json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "system": system,
                "messages": messages,
            }),
        }
    }

    fn parse_reply(&self, response: serde_json::Value) -> Result<String, LlmError> {
        let parsed: MessagesResponse = serde_json::from_value(response)?;
        parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or(LlmError::MissingField {
                provider: Provider::Anthropic,
                path: "content[0].text",
            })
    }
}
