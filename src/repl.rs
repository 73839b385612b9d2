//! Line-oriented front end.
//!
//! One loop owns the controller and selects between the next input line and
//! whichever in-flight reply lands first, so a slow provider never blocks
//! typing and replies are applied in the order the network returns them.

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::commands::{get_help_text, parse_input};
use crate::controller::{ConversationController, ReplyOutcome, Submission};
use crate::error::LlmError;
use crate::events::{AppEvent, ViewMode};
use crate::llm::LlmClient;
use crate::prompts::{BANNER, CHAT_PLACEHOLDER, EDIT_PLACEHOLDER};
use crate::provider::Provider;
use crate::storage::mask_secret;

type PendingReply = BoxFuture<'static, (u64, Result<String, LlmError>)>;

/// Whether the loop should keep reading input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Repl<W: Write> {
    controller: ConversationController,
    client: LlmClient,
    preview_path: PathBuf,
    out: W,
    written_revision: u64,
}

impl<W: Write> Repl<W> {
    pub fn new(
        controller: ConversationController,
        client: LlmClient,
        preview_path: PathBuf,
        out: W,
    ) -> Self {
        let written_revision = controller.preview().revision();
        Self {
            controller,
            client,
            preview_path,
            out,
            written_revision,
        }
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Read lines from `input` until `/bye` or end of input.
    ///
    /// On `/bye` unanswered requests are dropped. At end of input they are
    /// awaited first, so piped prompts still get their replies.
    pub async fn run<R>(mut self, input: R) -> Result<W>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut in_flight: FuturesUnordered<PendingReply> = FuturesUnordered::new();
        let mut input_open = true;

        write!(self.out, "{}", BANNER)?;
        self.status_line()?;
        self.prompt()?;

        loop {
            if !input_open && in_flight.is_empty() {
                break;
            }

            tokio::select! {
                line = lines.next_line(), if input_open => {
                    let Some(line) = line.context("Failed to read input")? else {
                        input_open = false;
                        continue;
                    };

                    let event = parse_input(&line, self.controller.mode());
                    let (flow, submission) = self.handle_event(event)?;
                    if let Some(submission) = submission {
                        in_flight.push(self.dispatch(submission));
                    }
                    if flow == Flow::Exit {
                        if !in_flight.is_empty() {
                            tracing::info!(pending = in_flight.len(), "dropping unanswered requests on exit");
                        }
                        break;
                    }
                    self.prompt()?;
                }
                Some((seq, result)) = in_flight.next(), if !in_flight.is_empty() => {
                    self.handle_reply(seq, result)?;
                    if input_open {
                        self.prompt()?;
                    }
                }
            }
        }

        writeln!(self.out, "👋 Bye!")?;
        self.out.flush()?;
        Ok(self.out)
    }

    /// Send the submission on its own future; the result comes back tagged with its sequence token
    fn dispatch(&self, submission: Submission) -> PendingReply {
        let client = self.client.clone();
        async move {
            let result = client
                .complete(
                    submission.provider,
                    submission.credential.as_deref(),
                    &submission.messages,
                )
                .await;
            (submission.seq, result)
        }
        .boxed()
    }

    /// Apply one input event. A returned submission still has to be sent.
    pub fn handle_event(&mut self, event: AppEvent) -> Result<(Flow, Option<Submission>)> {
        match event {
            AppEvent::Submit { text } => {
                self.controller.set_draft(text);
                if let Some(submission) = self.controller.submit() {
                    writeln!(
                        self.out,
                        "⏳ Sent to {} (#{})",
                        submission.provider.display_name(),
                        submission.seq
                    )?;
                    return Ok((Flow::Continue, Some(submission)));
                }
            }
            AppEvent::SwitchProvider { provider } => {
                self.controller.set_provider(provider)?;
                self.status_line()?;
            }
            AppEvent::UpdateCredential { secret } => {
                if self.controller.provider() == Provider::DefaultRelay {
                    writeln!(self.out, "ℹ️  The default relay uses its configured token; nothing stored.")?;
                }
                self.controller.set_credential(&secret)?;
                if self.controller.provider() != Provider::DefaultRelay {
                    if self.controller.credential().is_empty() {
                        writeln!(self.out, "🗑️  Key for {} cleared.", self.controller.provider().display_name())?;
                    } else {
                        writeln!(
                            self.out,
                            "🔑 Key for {} saved ({}).",
                            self.controller.provider().display_name(),
                            mask_secret(self.controller.credential())
                        )?;
                    }
                }
            }
            AppEvent::SwitchMode { mode } => {
                self.controller.set_mode(mode);
                writeln!(self.out, "🔀 {} mode: {}", mode.display_name(), mode.description())?;
            }
            AppEvent::EditPreview { line } => {
                let current = self.controller.preview().content();
                let updated = if current.is_empty() {
                    line
                } else {
                    format!("{}\n{}", current, line)
                };
                if self.controller.edit_preview(updated) {
                    self.sync_preview()?;
                }
            }
            AppEvent::ClearPreview => {
                self.replace_preview(String::new(), "🧹 Preview cleared.")?;
            }
            AppEvent::ReplacePreview { content } => {
                self.replace_preview(content, "✏️  Preview replaced.")?;
            }
            AppEvent::ReloadPreview => {
                if self.controller.mode() != ViewMode::Edit {
                    writeln!(self.out, "Switch to edit mode (/edit) to change the preview.")?;
                } else {
                    match std::fs::read_to_string(&self.preview_path) {
                        Ok(content) => {
                            self.replace_preview(content, "🔄 Preview reloaded from file.")?;
                        }
                        Err(err) => {
                            tracing::warn!(path = %self.preview_path.display(), error = %err, "preview reload failed");
                            writeln!(self.out, "❌ Could not read {}: {}", self.preview_path.display(), err)?;
                        }
                    }
                }
            }
            AppEvent::ShowProviders => {
                for provider in Provider::all() {
                    let marker = if provider == self.controller.provider() { "*" } else { " " };
                    writeln!(self.out, " {} {:<14} {}", marker, provider.to_string(), provider.display_name())?;
                }
                self.status_line()?;
            }
            AppEvent::ShowPreview => {
                let content = self.controller.preview().content();
                if content.is_empty() {
                    writeln!(self.out, "(preview is empty)")?;
                } else {
                    writeln!(self.out, "{}", content)?;
                }
            }
            AppEvent::ShowHistory => {
                if self.controller.log().is_empty() {
                    writeln!(self.out, "(no messages yet)")?;
                }
                for message in self.controller.log().iter() {
                    let time = message
                        .timestamp
                        .map(|t| t.format("%H:%M:%S").to_string())
                        .unwrap_or_default();
                    writeln!(self.out, "[{}] {}: {}", time, message.role, message.content)?;
                }
            }
            AppEvent::ShowHelp => {
                writeln!(self.out, "{}", get_help_text())?;
            }
            AppEvent::ExitRequest => return Ok((Flow::Exit, None)),
            AppEvent::ShowError { message } => {
                writeln!(self.out, "❌ {}", message)?;
            }
        }

        Ok((Flow::Continue, None))
    }

    /// Fold a finished request back in and refresh the preview file
    pub fn handle_reply(&mut self, seq: u64, result: Result<String, LlmError>) -> Result<ReplyOutcome> {
        let outcome = self.controller.apply_reply(seq, result);

        match outcome {
            ReplyOutcome::Appended { preview_changed } => {
                if let Some(reply) = self.controller.log().last() {
                    writeln!(self.out, "🤖 (#{}) {}", seq, reply.content)?;
                }
                if preview_changed {
                    self.sync_preview()?;
                    writeln!(self.out, "🖼️  Preview updated: {}", self.preview_path.display())?;
                }
            }
            ReplyOutcome::Failed => {
                writeln!(self.out, "… no reply for #{}", seq)?;
            }
            ReplyOutcome::Stale => {}
        }

        Ok(outcome)
    }

    fn replace_preview(&mut self, content: String, done: &str) -> Result<()> {
        if self.controller.edit_preview(content) {
            self.sync_preview()?;
            writeln!(self.out, "{}", done)?;
        } else {
            writeln!(self.out, "Switch to edit mode (/edit) to change the preview.")?;
        }
        Ok(())
    }

    fn sync_preview(&mut self) -> Result<()> {
        let preview = self.controller.preview();
        if preview.revision() == self.written_revision {
            return Ok(());
        }
        preview.write_to(&self.preview_path)?;
        self.written_revision = preview.revision();
        tracing::debug!(path = %self.preview_path.display(), revision = self.written_revision, "preview written");
        Ok(())
    }

    fn status_line(&mut self) -> Result<()> {
        let provider = self.controller.provider();
        let key_state = match provider {
            Provider::DefaultRelay if self.client.has_relay() => "configured relay token".to_string(),
            Provider::DefaultRelay => "relay not configured".to_string(),
            _ if !self.controller.credential().is_empty() => {
                format!("key {}", mask_secret(self.controller.credential()))
            }
            _ if self.client.has_relay() => "no key, default relay will answer".to_string(),
            _ => "no key, set one with /key <secret>".to_string(),
        };
        writeln!(self.out, "🔌 Provider: {} ({})", provider.display_name(), key_state)?;
        Ok(())
    }

    fn prompt(&mut self) -> Result<()> {
        let hint = match self.controller.mode() {
            ViewMode::Chat => CHAT_PLACEHOLDER,
            ViewMode::Edit => EDIT_PLACEHOLDER,
        };
        write!(self.out, "[{}] {}\n> ", self.controller.mode().display_name(), hint)?;
        self.out.flush()?;
        Ok(())
    }
}
