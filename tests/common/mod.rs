// tests/common/mod.rs
// Scripted transport and fixtures shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use pagechat::config::Config;
use pagechat::controller::{ControllerSettings, ConversationController};
use pagechat::error::LlmError;
use pagechat::llm::{ApiRequest, ChatTransport, LlmClient};
use pagechat::provider::Provider;
use pagechat::storage::CredentialStore;

pub const RELAY_URL: &str = "https://relay.example.com/v1/chat";
pub const RELAY_TOKEN: &str = "relay-secret";

/// Hands out queued replies in order and records every request it sees
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Value, LlmError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_reply(&self, body: Value) {
        self.replies.lock().unwrap().push_back(Ok(body));
    }

    pub fn push_error(&self, err: LlmError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, LlmError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::Api {
                    status: 500,
                    message: "no scripted reply left".to_string(),
                })
            })
    }
}

pub fn openai_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
}

pub fn anthropic_body(text: &str) -> Value {
    json!({
        "id": "msg_1",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}]
    })
}

/// Config rooted in `home`, with or without a relay
pub fn config(home: &std::path::Path, with_relay: bool) -> Config {
    let mut config = Config {
        home: home.to_path_buf(),
        ..Config::default()
    };
    if with_relay {
        config.relay.url = Some(RELAY_URL.to_string());
        config.relay.token = Some(RELAY_TOKEN.to_string());
    }
    config
}

pub fn client(config: &Config, transport: &Arc<ScriptedTransport>) -> LlmClient {
    LlmClient::with_transport(config, transport.clone())
}

pub fn controller(config: &Config, provider: Provider) -> ConversationController {
    let store = CredentialStore::new(config.credentials_path());
    ConversationController::new(store, provider, ControllerSettings::from(config)).unwrap()
}
