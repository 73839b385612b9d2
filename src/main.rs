use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use pagechat::config::{Config, RELAY_TOKEN_ENV};
use pagechat::controller::{ControllerSettings, ConversationController, ReplyOutcome};
use pagechat::llm::LlmClient;
use pagechat::provider::Provider;
use pagechat::repl::Repl;
use pagechat::storage::{mask_secret, CredentialStore};

#[derive(Parser)]
#[command(name = "pagechat")]
#[command(version = "0.1.0")]
#[command(about = "Chat with an LLM and keep the HTML it writes in a live preview", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ~/.pagechat/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Provider to start with (openai, anthropic, default-relay)
    #[arg(short, long, global = true)]
    provider: Option<Provider>,

    /// File the preview document is mirrored to
    #[arg(long, global = true)]
    preview_out: Option<PathBuf>,

    /// Token for the default relay
    #[arg(long, global = true, env = RELAY_TOKEN_ENV, hide_env_values = true)]
    relay_token: Option<String>,

    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (the default)
    Chat,
    /// Send one prompt, print the reply and write the preview
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// Store a provider's API key; "-" reads it from stdin, nothing clears it
    Key {
        provider: Provider,
        secret: Option<String>,
    },
    /// List providers and whether a key is stored
    Providers,
    /// Write the default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("pagechat=debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(provider) = cli.provider {
        config.default_provider = provider;
    }
    if let Some(path) = &cli.preview_out {
        config.preview.output = Some(path.clone());
    }
    if let Some(token) = &cli.relay_token {
        config.relay.token = Some(token.clone());
    }

    Ok(config)
}

fn build_controller(config: &Config) -> Result<ConversationController> {
    let store = CredentialStore::new(config.credentials_path());
    ConversationController::new(store, config.default_provider, ControllerSettings::from(config))
}

async fn chat(config: &Config) -> Result<()> {
    let controller = build_controller(config)?;
    let client = LlmClient::new(config)?;
    let repl = Repl::new(controller, client, config.preview_path(), io::stdout());

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    repl.run(stdin).await?;
    Ok(())
}

async fn ask(config: &Config, prompt: String) -> Result<()> {
    let mut controller = build_controller(config)?;
    let client = LlmClient::new(config)?;

    match controller.run_round(&client, prompt).await {
        None => bail!("Prompt is empty"),
        Some(ReplyOutcome::Appended { preview_changed }) => {
            if let Some(reply) = controller.log().last() {
                println!("{}", reply.content);
            }
            if preview_changed {
                let path = config.preview_path();
                controller.preview().write_to(&path)?;
                eprintln!("🖼️  Preview written to {}", path.display());
            }
            Ok(())
        }
        Some(_) => bail!("No reply from {}", controller.provider().display_name()),
    }
}

fn store_key(config: &Config, provider: Provider, secret: Option<String>) -> Result<()> {
    let secret = match secret.as_deref() {
        Some("-") => {
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read key from stdin")?;
            line.trim().to_string()
        }
        Some(secret) => secret.to_string(),
        None => String::new(),
    };

    let Some(key) = provider.credential_key() else {
        bail!(
            "{} does not take a personal key; set relay.token or PAGECHAT_RELAY_TOKEN",
            provider.display_name()
        );
    };

    let store = CredentialStore::new(config.credentials_path());
    if secret.trim().is_empty() {
        if store.remove(key)? {
            println!("🗑️  Key for {} removed", provider.display_name());
        } else {
            println!("📭 No key stored for {}", provider.display_name());
        }
    } else {
        store.set(key, &secret)?;
        println!("🔑 Key for {} saved ({})", provider.display_name(), mask_secret(&secret));
    }
    Ok(())
}

fn list_providers(config: &Config) -> Result<()> {
    let store = CredentialStore::new(config.credentials_path());

    println!("📋 Providers:\n");
    for provider in Provider::all() {
        let state = match provider.credential_key() {
            Some(key) => match store.get(key)? {
                Some(secret) => format!("key {}", mask_secret(&secret)),
                None => "no key".to_string(),
            },
            None if config.has_relay() => "configured".to_string(),
            None => "not configured".to_string(),
        };
        let marker = if provider == config.default_provider { "*" } else { " " };
        println!(" {} {:<14} {:<16} {}", marker, provider.to_string(), provider.display_name(), state);
    }
    Ok(())
}

/// Path `init` writes to: the `--config` file if one was given
fn config_file(cli_path: Option<&Path>, config: &Config) -> PathBuf {
    cli_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.home.join("config.toml"))
}

/// Returns whether a file was written
fn init_config(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        println!("📄 Config already exists at {} (use --force to overwrite)", path.display());
        return Ok(false);
    }

    // Defaults only; command-line overrides and env tokens stay out of the file.
    Config::default().save_to(path)?;
    println!("✅ Wrote {}", path.display());
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;

    match cli.command {
        None | Some(Commands::Chat) => chat(&config).await,
        Some(Commands::Ask { prompt }) => ask(&config, prompt.join(" ")).await,
        Some(Commands::Key { provider, secret }) => store_key(&config, provider, secret),
        Some(Commands::Providers) => list_providers(&config),
        Some(Commands::Init { force }) => {
            init_config(&config_file(cli.config.as_deref(), &config), force).map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::ffi::OsStr;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_relay_token_reads_environment() {
        let command = Cli::command();
        let arg = command
            .get_arguments()
            .find(|a| a.get_id().as_str() == "relay_token")
            .unwrap();
        assert_eq!(arg.get_env(), Some(OsStr::new(RELAY_TOKEN_ENV)));
    }

    #[test]
    fn test_init_writes_the_given_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("custom.toml");
        let config = Config::load_from(&custom).unwrap();

        let target = config_file(Some(&custom), &config);
        assert_eq!(target, custom);
        assert!(init_config(&target, false).unwrap());
        assert!(custom.exists());
        assert!(!dir.path().join("config.toml").exists());

        // Second run leaves the file alone without --force.
        assert!(!init_config(&target, false).unwrap());
        assert!(Config::load_from(&custom).is_ok());
    }

    #[test]
    fn test_init_defaults_to_home_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config_file(None, &config), dir.path().join("config.toml"));
    }
}
