//! The preview document and `<html>` extraction from assistant replies

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// Greedy: the capture runs to the last closing tag in the reply.
static HTML_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<html>(.*)</html>").expect("static HTML pattern is valid")
});

/// Pull the inner content of the `<html>...</html>` block out of a reply
pub fn extract_html(reply: &str) -> Option<&str> {
    HTML_BLOCK
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// What to do with the preview when a reply carries no `<html>` block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissPolicy {
    /// Keep whatever the preview showed before
    #[default]
    Leave,
    /// Blank the preview
    Clear,
}

/// HTML fragment shown in the preview pane
#[derive(Debug, Clone, Default)]
pub struct PreviewDocument {
    content: String,
    revision: u64,
}

impl PreviewDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Bumped on every replacement, so sinks can tell when to re-render
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn replace(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.revision += 1;
    }

    /// Apply an assistant reply. Returns true when the document changed.
    pub fn apply_reply(&mut self, reply: &str, policy: MissPolicy) -> bool {
        match extract_html(reply) {
            Some(inner) => {
                self.replace(inner);
                true
            }
            None => match policy {
                MissPolicy::Leave => false,
                MissPolicy::Clear => {
                    self.replace(String::new());
                    true
                }
            },
        }
    }

    /// Write the document to `path` for a browser to pick up
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, &self.content)
            .with_context(|| format!("Failed to write preview to {}", path.display()))?;
        Ok(())
    }
}
