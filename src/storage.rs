use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk layout of the credential file
#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    api_keys: BTreeMap<String, String>,
}

/// Durable key-value store for provider secrets, backed by a JSON file.
///
/// Every write goes straight to disk so a crash never loses an edit.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under `~/.pagechat/credentials.json`
    pub fn open_default() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Could not find home directory")?;
        Ok(Self::new(home_dir.join(".pagechat").join("credentials.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let file = self.read()?;
        Ok(file.api_keys.get(key).cloned())
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut file = self.read()?;
        file.api_keys.insert(key.to_string(), value.to_string());
        self.write(&file)
    }

    /// Remove `key`. Returns whether it was present.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let mut file = self.read()?;
        let existed = file.api_keys.remove(key).is_some();
        if existed {
            self.write(&file)?;
        }
        Ok(existed)
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.read()?.api_keys.contains_key(key))
    }

    fn read(&self) -> Result<CredentialFile> {
        if !self.path.exists() {
            return Ok(CredentialFile::default());
        }

        let content = fs::read_to_string(&self.path)
            .context("Failed to read credential store")?;
        if content.trim().is_empty() {
            return Ok(CredentialFile::default());
        }

        serde_json::from_str(&content).context("Failed to parse credential store")
    }

    fn write(&self, file: &CredentialFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create credential store directory")?;
        }

        let content = serde_json::to_string_pretty(file)
            .context("Failed to serialize credential store")?;
        fs::write(&self.path, content)
            .context("Failed to write credential store")?;

        restrict_permissions(&self.path)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .context("Failed to restrict credential store permissions")
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Last four characters of a secret, for display
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
