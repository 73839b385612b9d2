use async_trait::async_trait;
use std::time::Duration;

use super::ApiRequest;
use crate::error::LlmError;

/// Sends a shaped request and hands back the decoded JSON body
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<serde_json::Value, LlmError>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// `timeout` of `None` waits as long as the provider takes
    pub fn new(timeout: Option<Duration>) -> Result<Self, LlmError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<serde_json::Value, LlmError> {
        let mut req = self.client.post(&request.url);
        for (name, value) in &request.headers {
            req = req.header(*name, value);
        }

        let response = req.json(&request.body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}
