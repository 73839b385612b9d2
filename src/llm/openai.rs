use serde::Deserialize;

use super::{wire_messages, ApiRequest, ProviderAdapter};
use crate::config::OpenAiConfig;
use crate::conversation::Message;
use crate::error::LlmError;
use crate::provider::Provider;

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Reply text from an OpenAI-shaped body: `choices[0].message.content`
pub(super) fn first_choice_content(
    provider: Provider,
    response: serde_json::Value,
) -> Result<String, LlmError> {
    let parsed: ChatCompletionResponse = serde_json::from_value(response)?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(LlmError::MissingField {
            provider,
            path: "choices[0].message.content",
        })
}

/// OpenAI chat-completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    base_url: String,
    model: String,
}

impl OpenAiAdapter {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn build_request(&self, system: &str, log: &[Message], secret: &str) -> ApiRequest {
        ApiRequest {
            url: format!("{}/chat/completions", self.base_url),
            headers: vec![
                ("Authorization", format!("Bearer {}", secret)),
                ("Content-Type", "application/json".to_string()),
            ],
            body: serde_json::json!({
                "model": self.model,
                "messages": wire_messages(system, log),
            }),
        }
    }

    fn parse_reply(&self, response: serde_json::Value) -> Result<String, LlmError> {
        first_choice_content(Provider::OpenAi, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adapter() -> OpenAiAdapter {
        OpenAiAdapter::new(&OpenAiConfig {
            base_url: "https://api.openai.com/v1/".to_string(),
            model: "gpt-3.5-turbo".to_string(),
        })
    }

    #[test]
    fn test_request_shape() {
        let log = [Message::user("make a page")];
        let request = adapter().build_request("sys", &log, "sk-test");

        assert_eq!(request.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(request.header("authorization"), Some("Bearer sk-test"));
        assert_eq!(request.body["model"], "gpt-3.5-turbo");
        assert_eq!(request.body["messages"][0], json!({"role": "system", "content": "sys"}));
        assert_eq!(request.body["messages"][1], json!({"role": "user", "content": "make a page"}));
    }

    #[test]
    fn test_parse_first_choice() {
        let body = json!({"choices": [
            {"message": {"role": "assistant", "content": "<html>Hi</html>"}},
            {"message": {"role": "assistant", "content": "second"}}
        ]});
        assert_eq!(adapter().parse_reply(body).unwrap(), "<html>Hi</html>");
    }

    #[test]
    fn test_parse_empty_choices_is_missing_field() {
        let err = adapter().parse_reply(json!({"choices": []})).unwrap_err();
        assert!(matches!(err, LlmError::MissingField { provider: Provider::OpenAi, .. }));
    }

    #[test]
    fn test_parse_null_content_is_missing_field() {
        let body = json!({"choices": [{"message": {"content": null}}]});
        assert!(matches!(
            adapter().parse_reply(body),
            Err(LlmError::MissingField { .. })
        ));
    }

    #[test]
    fn test_parse_error_body_is_missing_field() {
        let body = json!({"error": {"message": "Incorrect API key provided"}});
        assert!(matches!(
            adapter().parse_reply(body),
            Err(LlmError::MissingField { .. })
        ));
    }

    #[test]
    fn test_parse_wrong_type_is_json_error() {
        let body = json!({"choices": "nope"});
        assert!(matches!(adapter().parse_reply(body), Err(LlmError::Json(_))));
    }
}
