use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::preview::MissPolicy;
use crate::prompts::SYSTEM_INSTRUCTION;
use crate::provider::Provider;

/// Environment variable that supplies the relay token when the config file does not
pub const RELAY_TOKEN_ENV: &str = "PAGECHAT_RELAY_TOKEN";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider selected at startup
    pub default_provider: Provider,

    /// Instruction sent ahead of every conversation
    pub system_prompt: String,

    pub openai: OpenAiConfig,
    pub anthropic: AnthropicConfig,
    pub relay: RelayConfig,
    pub preview: PreviewConfig,
    pub requests: RequestConfig,

    /// Pagechat home directory
    #[serde(skip)]
    pub home: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub api_version: String,
}

/// Hosted relay. The token belongs here or in the environment, never in the binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub url: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Policy when a reply has no `<html>` block
    pub on_miss: MissPolicy,
    /// File the preview is mirrored to; defaults to `<home>/preview.html`
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Drop replies that arrive for anything but the newest submission
    pub guard_stale_replies: bool,
    /// Per-request timeout; unset means wait indefinitely
    pub timeout_secs: Option<u64>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 4096,
            api_version: "2023-06-01".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            default_provider: Provider::OpenAi,
            system_prompt: SYSTEM_INSTRUCTION.to_string(),
            openai: OpenAiConfig::default(),
            anthropic: AnthropicConfig::default(),
            relay: RelayConfig::default(),
            preview: PreviewConfig::default(),
            requests: RequestConfig::default(),
            home: home.join(".pagechat"),
        }
    }
}

impl Config {
    /// Load `~/.pagechat/config.toml`, falling back to defaults when it is absent
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let pagechat_home = home.join(".pagechat");

        fs::create_dir_all(&pagechat_home)
            .context("Failed to create .pagechat directory")?;

        Self::load_from(&pagechat_home.join("config.toml"))
    }

    /// Load from an explicit path; its parent directory becomes the home
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content)
                .context("Failed to parse config file")?
        } else {
            Config::default()
        };

        if let Some(parent) = config_path.parent() {
            config.home = parent.to_path_buf();
        }

        if config.relay.token.is_none() {
            config.relay.token = std::env::var(RELAY_TOKEN_ENV)
                .ok()
                .filter(|t| !t.trim().is_empty());
        }

        Ok(config)
    }

    /// Save configuration to `<home>/config.toml`
    pub fn save(&self) -> Result<()> {
        self.save_to(&self.home.join("config.toml"))
    }

    /// Save configuration to an explicit path, creating its directory
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(config_path, content)
            .context("Failed to write config file")?;
        Ok(())
    }

    pub fn preview_path(&self) -> PathBuf {
        self.preview
            .output
            .clone()
            .unwrap_or_else(|| self.home.join("preview.html"))
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.home.join("credentials.json")
    }

    /// Whether the relay can be used as a fallback
    pub fn has_relay(&self) -> bool {
        self.relay.url.is_some() && self.relay.token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_public_endpoints() {
        let config = Config::default();
        assert_eq!(config.default_provider, Provider::OpenAi);
        assert_eq!(config.openai.model, "gpt-3.5-turbo");
        assert_eq!(config.anthropic.api_version, "2023-06-01");
        assert_eq!(config.preview.on_miss, MissPolicy::Leave);
        assert!(!config.requests.guard_stale_replies);
        assert!(config.requests.timeout_secs.is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults_with_home_set() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.home, dir.path());
        assert_eq!(config.preview_path(), dir.path().join("preview.html"));
        assert_eq!(config.credentials_path(), dir.path().join("credentials.json"));
    }

    #[test]
    fn test_partial_file_fills_remaining_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
default_provider = "anthropic"

[preview]
on_miss = "clear"

[relay]
url = "https://relay.example.com/chat"
token = "relay-secret"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.default_provider, Provider::Anthropic);
        assert_eq!(config.preview.on_miss, MissPolicy::Clear);
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert!(config.has_relay());
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.home = dir.path().to_path_buf();
        config.requests.guard_stale_replies = true;
        config.anthropic.max_tokens = 1024;
        config.save().unwrap();

        let loaded = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(loaded.requests.guard_stale_replies);
        assert_eq!(loaded.anthropic.max_tokens, 1024);
        assert_eq!(loaded.system_prompt, SYSTEM_INSTRUCTION);
    }

    #[test]
    fn test_save_to_custom_file_is_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("custom.toml");
        let mut config = Config::default();
        config.default_provider = Provider::Anthropic;
        config.save_to(&path).unwrap();

        assert!(!dir.path().join("nested").join("config.toml").exists());
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.default_provider, Provider::Anthropic);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_provider = [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
