use thiserror::Error;

use crate::provider::Provider;

/// Errors raised while talking to a provider endpoint
#[derive(Debug, Error)]
pub enum LlmError {
    /// Connection, TLS or body read failure
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Body was not valid JSON
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON decoded but the reply text was not where the provider puts it
    #[error("{provider} response is missing `{path}`")]
    MissingField { provider: Provider, path: &'static str },

    #[error("no API key stored for {0}")]
    MissingCredential(Provider),

    #[error("default relay is not configured (set relay.url and relay.token)")]
    RelayNotConfigured,
}

impl LlmError {
    /// Short label used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Request(_) => "transport",
            LlmError::Api { .. } => "status",
            LlmError::Json(_) | LlmError::MissingField { .. } => "malformed",
            LlmError::MissingCredential(_) | LlmError::RelayNotConfigured => "credential",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_names_provider_and_path() {
        let err = LlmError::MissingField {
            provider: Provider::Anthropic,
            path: "content[0].text",
        };
        assert_eq!(err.to_string(), "anthropic response is missing `content[0].text`");
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn test_api_error_display() {
        let err = LlmError::Api {
            status: 401,
            message: "bad key".to_string(),
        };
        assert_eq!(err.to_string(), "API error (status 401): bad key");
        assert_eq!(err.kind(), "status");
    }
}
