//! Conversation controller: the one state container behind the REPL.
//!
//! A round trip is split in two so the network call never holds the state:
//! [`ConversationController::submit`] records the user message and hands out
//! a [`Submission`], and [`ConversationController::apply_reply`] folds the
//! provider's answer back in whenever it arrives. Replies may come back in any
//! order; each is applied on its own.

use anyhow::Result;
use std::collections::BTreeMap;

use crate::config::Config;
use crate::conversation::{ConversationLog, Message};
use crate::error::LlmError;
use crate::events::ViewMode;
use crate::llm::LlmClient;
use crate::preview::{MissPolicy, PreviewDocument};
use crate::provider::Provider;
use crate::storage::CredentialStore;

/// Behaviour switches taken from the `[preview]` and `[requests]` config sections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerSettings {
    pub on_miss: MissPolicy,
    pub guard_stale_replies: bool,
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            on_miss: config.preview.on_miss,
            guard_stale_replies: config.requests.guard_stale_replies,
        }
    }
}

/// Everything needed to send one request, captured at submit time
#[derive(Debug, Clone)]
pub struct Submission {
    /// Monotonic request-sequence token
    pub seq: u64,
    pub provider: Provider,
    pub credential: Option<String>,
    /// The log as it stood right after the user message was appended
    pub messages: Vec<Message>,
}

/// What happened when a reply was folded back in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Appended { preview_changed: bool },
    /// The request failed; the error went to the log
    Failed,
    /// A newer submission exists and stale replies are guarded
    Stale,
}

pub struct ConversationController {
    log: ConversationLog,
    draft: String,
    provider: Provider,
    credential: String,
    mode: ViewMode,
    preview: PreviewDocument,
    store: CredentialStore,
    settings: ControllerSettings,
    next_seq: u64,
    pending: BTreeMap<u64, Provider>,
}

impl ConversationController {
    /// Start a session on `provider`, restoring its saved key from `store`
    pub fn new(store: CredentialStore, provider: Provider, settings: ControllerSettings) -> Result<Self> {
        let mut controller = Self {
            log: ConversationLog::new(),
            draft: String::new(),
            provider,
            credential: String::new(),
            mode: ViewMode::Chat,
            preview: PreviewDocument::new(),
            store,
            settings,
            next_seq: 1,
            pending: BTreeMap::new(),
        };
        controller.reload_credential()?;
        Ok(controller)
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn preview(&self) -> &PreviewDocument {
        &self.preview
    }

    pub fn settings(&self) -> ControllerSettings {
        self.settings
    }

    /// Requests submitted but not yet answered
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Record the draft as a user message and return the request to send.
    ///
    /// A blank draft is ignored: nothing changes and `None` comes back.
    pub fn submit(&mut self) -> Option<Submission> {
        if self.draft.trim().is_empty() {
            return None;
        }

        let text = std::mem::take(&mut self.draft);
        self.log.push(Message::user(text));

        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(seq, self.provider);

        tracing::debug!(seq, provider = %self.provider, log_len = self.log.len(), "submitted message");

        Some(Submission {
            seq,
            provider: self.provider,
            credential: Some(self.credential.clone()).filter(|c| !c.is_empty()),
            messages: self.log.messages().to_vec(),
        })
    }

    /// Shorthand for `set_draft` followed by `submit`
    pub fn submit_text(&mut self, text: impl Into<String>) -> Option<Submission> {
        self.set_draft(text);
        self.submit()
    }

    /// Fold a provider result back into the conversation
    pub fn apply_reply(&mut self, seq: u64, result: Result<String, LlmError>) -> ReplyOutcome {
        let provider = self.pending.remove(&seq).unwrap_or(self.provider);
        let newest = self.next_seq - 1;

        if self.settings.guard_stale_replies && seq < newest {
            tracing::warn!(seq, newest, %provider, "discarding reply to a superseded request");
            return ReplyOutcome::Stale;
        }

        match result {
            Ok(reply) => {
                let preview_changed = self.preview.apply_reply(&reply, self.settings.on_miss);
                self.log.push(Message::assistant(reply));
                tracing::debug!(seq, %provider, preview_changed, "reply appended");
                ReplyOutcome::Appended { preview_changed }
            }
            Err(err) => {
                tracing::error!(seq, %provider, kind = err.kind(), error = %err, "chat request failed");
                ReplyOutcome::Failed
            }
        }
    }

    /// Submit `text`, wait for the provider and apply the answer
    pub async fn run_round(&mut self, client: &LlmClient, text: impl Into<String>) -> Option<ReplyOutcome> {
        let submission = self.submit_text(text)?;
        let result = client
            .complete(
                submission.provider,
                submission.credential.as_deref(),
                &submission.messages,
            )
            .await;
        Some(self.apply_reply(submission.seq, result))
    }

    /// Switch provider and load that provider's saved key
    pub fn set_provider(&mut self, provider: Provider) -> Result<()> {
        self.provider = provider;
        self.reload_credential()?;
        tracing::info!(%provider, has_key = !self.credential.is_empty(), "provider selected");
        Ok(())
    }

    /// Persist `secret` for the current provider. A blank secret removes the saved key.
    pub fn set_credential(&mut self, secret: &str) -> Result<()> {
        let Some(key) = self.provider.credential_key() else {
            tracing::warn!(provider = %self.provider, "provider takes no personal key; ignoring");
            return Ok(());
        };

        if secret.trim().is_empty() {
            self.store.remove(key)?;
            self.credential.clear();
            tracing::info!(provider = %self.provider, "stored key cleared");
        } else {
            self.store.set(key, secret)?;
            self.credential = secret.to_string();
            tracing::info!(provider = %self.provider, "stored key updated");
        }
        Ok(())
    }

    /// Switch views. The preview document is left exactly as it is.
    pub fn set_mode(&mut self, mode: ViewMode) {
        if mode != self.mode {
            tracing::debug!(from = ?self.mode, to = ?mode, "view mode switched");
        }
        self.mode = mode;
    }

    /// Replace the preview with hand-edited text. Only honoured in edit mode.
    pub fn edit_preview(&mut self, text: impl Into<String>) -> bool {
        if self.mode != ViewMode::Edit {
            tracing::debug!("ignoring preview edit outside edit mode");
            return false;
        }
        self.preview.replace(text);
        true
    }

    fn reload_credential(&mut self) -> Result<()> {
        self.credential = match self.provider.credential_key() {
            Some(key) => self.store.get(key)?.unwrap_or_default(),
            None => String::new(),
        };
        Ok(())
    }
}
