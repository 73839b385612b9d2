//! Provider adapters and the client that routes a conversation to one of them.
//!
//! Each adapter knows two things about its endpoint: how to shape a request
//! from the conversation log and where the assistant text sits in the reply.
//! Everything network-related goes through [`ChatTransport`], which keeps the
//! adapters pure and lets tests script the wire.

mod anthropic;
mod openai;
mod relay;
mod transport;

use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::conversation::Message;
use crate::error::LlmError;
use crate::provider::Provider;

pub use anthropic::AnthropicAdapter;
pub use openai::OpenAiAdapter;
pub use relay::RelayAdapter;
pub use transport::{ChatTransport, HttpTransport};

/// Fully-shaped outbound request: endpoint, headers and JSON body
#[derive(Clone)]
pub struct ApiRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: serde_json::Value,
}

impl ApiRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

// Secrets stay out of logs and panic messages.
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<_> = self
            .headers
            .iter()
            .map(|(key, value)| {
                let shown = if is_secret_header(key) { "<redacted>" } else { value.as_str() };
                (*key, shown)
            })
            .collect();
        f.debug_struct("ApiRequest")
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body", &self.body)
            .finish()
    }
}

fn is_secret_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("authorization") || name.eq_ignore_ascii_case("x-api-key")
}

/// Uniform contract every provider implements
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// Shape the request for `log`, prefixed by the `system` instruction
    fn build_request(&self, system: &str, log: &[Message], secret: &str) -> ApiRequest;

    /// Dig the assistant's text out of a decoded response body
    fn parse_reply(&self, response: serde_json::Value) -> Result<String, LlmError>;
}

/// Routes a conversation to the right adapter and sends it
#[derive(Clone)]
pub struct LlmClient {
    transport: Arc<dyn ChatTransport>,
    system_prompt: String,
    openai: OpenAiAdapter,
    anthropic: AnthropicAdapter,
    relay: Option<RelayAdapter>,
}

impl LlmClient {
    /// Client that talks HTTP using the endpoints in `config`
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let timeout = config.requests.timeout_secs.map(std::time::Duration::from_secs);
        let transport = HttpTransport::new(timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: &Config, transport: Arc<dyn ChatTransport>) -> Self {
        let relay = match (&config.relay.url, &config.relay.token) {
            (Some(url), Some(token)) => Some(RelayAdapter::new(url.clone(), token.clone())),
            _ => None,
        };

        Self {
            transport,
            system_prompt: config.system_prompt.clone(),
            openai: OpenAiAdapter::new(&config.openai),
            anthropic: AnthropicAdapter::new(&config.anthropic),
            relay,
        }
    }

    pub fn has_relay(&self) -> bool {
        self.relay.is_some()
    }

    /// Pick the adapter and secret for `provider`.
    ///
    /// The relay answers when it is selected, and also stands in for a
    /// provider that has no stored key.
    pub fn route(
        &self,
        provider: Provider,
        credential: Option<&str>,
    ) -> Result<(&dyn ProviderAdapter, String), LlmError> {
        let credential = credential.filter(|c| !c.trim().is_empty());

        let personal: &dyn ProviderAdapter = match provider {
            Provider::OpenAi => &self.openai,
            Provider::Anthropic => &self.anthropic,
            Provider::DefaultRelay => return self.relay_route(),
        };

        match credential {
            Some(secret) => Ok((personal, secret.to_string())),
            None if self.relay.is_some() => {
                tracing::info!(%provider, "no stored key, falling back to default relay");
                self.relay_route()
            }
            None => Err(LlmError::MissingCredential(provider)),
        }
    }

    fn relay_route(&self) -> Result<(&dyn ProviderAdapter, String), LlmError> {
        let relay = self.relay.as_ref().ok_or(LlmError::RelayNotConfigured)?;
        Ok((relay, relay.token().to_string()))
    }

    /// Build the request that `complete` would send, without sending it
    pub fn prepare(
        &self,
        provider: Provider,
        credential: Option<&str>,
        log: &[Message],
    ) -> Result<(Provider, ApiRequest), LlmError> {
        let (adapter, secret) = self.route(provider, credential)?;
        Ok((adapter.provider(), adapter.build_request(&self.system_prompt, log, &secret)))
    }

    /// Send `log` to `provider` and return the assistant's reply text
    pub async fn complete(
        &self,
        provider: Provider,
        credential: Option<&str>,
        log: &[Message],
    ) -> Result<String, LlmError> {
        let (adapter, secret) = self.route(provider, credential)?;
        let request = adapter.build_request(&self.system_prompt, log, &secret);

        tracing::debug!(
            provider = %adapter.provider(),
            url = %request.url,
            messages = log.len(),
            "sending chat request"
        );

        let response = self.transport.send(request).await?;
        adapter.parse_reply(response)
    }
}

/// `{role, content}` pairs with the system instruction first
fn wire_messages(system: &str, log: &[Message]) -> Vec<serde_json::Value> {
    std::iter::once(serde_json::json!({ "role": "system", "content": system }))
        .chain(log.iter().map(|m| {
            serde_json::json!({ "role": m.role.as_str(), "content": m.content })
        }))
        .collect()
}
