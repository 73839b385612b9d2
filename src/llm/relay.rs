use super::openai::first_choice_content;
use super::{wire_messages, ApiRequest, ProviderAdapter};
use crate::conversation::Message;
use crate::error::LlmError;
use crate::provider::Provider;

/// Hosted relay with an OpenAI-shaped reply. It authenticates with a
/// configured token, never with the user's key.
#[derive(Clone)]
pub struct RelayAdapter {
    url: String,
    token: String,
}

impl RelayAdapter {
    pub fn new(url: String, token: String) -> Self {
        Self { url, token }
    }

    pub(super) fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for RelayAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayAdapter").field("url", &self.url).finish_non_exhaustive()
    }
}

impl ProviderAdapter for RelayAdapter {
    fn provider(&self) -> Provider {
        Provider::DefaultRelay
    }

    fn build_request(&self, system: &str, log: &[Message], secret: &str) -> ApiRequest {
        ApiRequest {
            url: self.url.clone(),
            headers: vec![
                ("Authorization", format!("Bearer {}", secret)),
                ("Content-Type", "application/json".to_string()),
            ],
            body: serde_json::json!({ "messages": wire_messages(system, log) }),
        }
    }

    fn parse_reply(&self, response: serde_json::Value) -> Result<String, LlmError> {
        first_choice_content(Provider::DefaultRelay, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_has_only_messages() {
        let relay = RelayAdapter::new("https://relay.example.com/chat".into(), "tok".into());
        let request = relay.build_request("sys", &[Message::user("hi")], relay.token());

        assert_eq!(request.url, "https://relay.example.com/chat");
        assert_eq!(request.header("Authorization"), Some("Bearer tok"));
        let body = request.body.as_object().unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_uses_openai_shape() {
        let relay = RelayAdapter::new("u".into(), "t".into());
        let body = json!({"choices": [{"message": {"content": "<html>r</html>"}}]});
        assert_eq!(relay.parse_reply(body).unwrap(), "<html>r</html>");

        let err = relay.parse_reply(json!({})).unwrap_err();
        assert!(matches!(err, LlmError::MissingField { provider: Provider::DefaultRelay, .. }));
    }

    #[test]
    fn test_debug_hides_token() {
        let relay = RelayAdapter::new("u".into(), "super-secret".into());
        assert!(!format!("{:?}", relay).contains("super-secret"));
    }
}
