//! Conversation pipeline - turns one inbound update into transcript entries
//! and paced replies.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::chatbot::completion::{CompletionClient, CompletionError, Persona};
use crate::chatbot::entry::TranscriptEntry;
use crate::chatbot::mask::TokenMask;
use crate::chatbot::message::{Body, RawUpdate};
use crate::chatbot::platform::{Platform, PlatformError};
use crate::chatbot::transcript::{self, StoreError, TranscriptStore};
use crate::classifier::{classify, ClassifyError};
use crate::config::Notices;

/// Default delay before each outbound message of a multi-message reply.
pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

/// Pipeline settings fixed at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub persona: Persona,
    pub pacing: Duration,
    pub notices: Notices,
    pub mask: TokenMask,
}

/// A collaborator call failed. The update is dropped; nothing was sent for it
/// past the point of failure.
#[derive(Debug)]
pub enum PipelineError {
    Platform(PlatformError),
    Completion(CompletionError),
    Store(StoreError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Platform(e) => write!(f, "{e}"),
            PipelineError::Completion(e) => write!(f, "completion failed: {e}"),
            PipelineError::Store(e) => write!(f, "transcript write failed: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Platform(e) => Some(e),
            PipelineError::Completion(e) => Some(e),
            PipelineError::Store(e) => Some(e),
        }
    }
}

impl From<PlatformError> for PipelineError {
    fn from(e: PlatformError) -> Self {
        PipelineError::Platform(e)
    }
}

impl From<CompletionError> for PipelineError {
    fn from(e: CompletionError) -> Self {
        PipelineError::Completion(e)
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        PipelineError::Store(e)
    }
}

/// How an update was settled when no collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Generated replies were delivered.
    Replied { sent: usize },
    /// No text, caption or photo; the unsupported-type notice was sent.
    Unclassifiable,
    /// No sender to attribute the conversation to.
    MissingSender,
    /// The completion service had nothing to say.
    NoUsableCompletion,
}

pub struct Pipeline {
    config: PipelineConfig,
    platform: Arc<dyn Platform>,
    completion: Arc<dyn CompletionClient>,
    store: Arc<dyn TranscriptStore>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        platform: Arc<dyn Platform>,
        completion: Arc<dyn CompletionClient>,
        store: Arc<dyn TranscriptStore>,
    ) -> Self {
        Self { config, platform, completion, store }
    }

    /// Process one update start to finish.
    pub async fn handle_update(&self, update: RawUpdate) -> Result<Outcome, PipelineError> {
        let msg = match classify(&update, self.platform.as_ref()).await {
            Ok(msg) => msg,
            Err(ClassifyError::Unclassifiable) => {
                info!("❓ Unclassifiable update in chat {}", update.chat_id);
                self.send(update.chat_id, &self.config.notices.unsupported_type).await?;
                return Ok(Outcome::Unclassifiable);
            }
            Err(ClassifyError::Platform(e)) => return Err(e.into()),
        };

        let Some(user_id) = update.sender_id else {
            warn!("Update in chat {} has no sender", update.chat_id);
            self.send(update.chat_id, &self.config.notices.not_understood).await?;
            return Ok(Outcome::MissingSender);
        };

        match msg.body {
            Body::Photo { ref path, ref caption } => {
                self.handle_photo(update.chat_id, user_id, path, caption.as_deref()).await
            }
            Body::Text(ref text) => {
                self.handle_text(update.chat_id, user_id, text, msg.reply_to_message.as_deref())
                    .await
            }
        }
    }

    async fn handle_photo(
        &self,
        chat_id: i64,
        user_id: i64,
        file_path: &str,
        caption: Option<&str>,
    ) -> Result<Outcome, PipelineError> {
        info!("📷 Photo from {} ({})", user_id, file_path);

        if let Err(e) = self.platform.send_text(chat_id, &self.config.notices.reading_image).await {
            warn!("Failed to acknowledge image: {e}");
        }

        if let Some(caption) = caption {
            self.store.append(TranscriptEntry::from_user(user_id, caption)).await?;
        }

        let url = self.platform.file_url(file_path);
        self.store
            .append(TranscriptEntry::photo_from_user(user_id, self.config.mask.mask(&url)))
            .await?;

        let inputs: Vec<String> = caption.map(str::to_string).into_iter().collect();
        let reply = self
            .completion
            .complete_with_image(self.config.persona, &inputs, &url)
            .await?;

        let Some(reply) = reply.filter(|r| !r.is_empty()) else {
            info!("No description for photo from {}", user_id);
            self.send(chat_id, &self.config.notices.not_understood).await?;
            return Ok(Outcome::NoUsableCompletion);
        };

        self.send(chat_id, &reply).await?;
        self.store.append(TranscriptEntry::from_bot(user_id, reply)).await?;
        Ok(Outcome::Replied { sent: 1 })
    }

    async fn handle_text(
        &self,
        chat_id: i64,
        user_id: i64,
        incoming: &str,
        reply_to: Option<&str>,
    ) -> Result<Outcome, PipelineError> {
        info!(
            "📨 {}: \"{}\"",
            user_id,
            incoming.chars().take(50).collect::<String>()
        );

        // Recorded before generation so the input survives a failed completion.
        self.store.append(TranscriptEntry::from_user(user_id, incoming)).await?;

        let context: Vec<String> = reply_to.map(str::to_string).into_iter().collect();
        let outputs = self
            .completion
            .complete(self.config.persona, &[incoming.to_string()], &context)
            .await?;

        self.store
            .append(TranscriptEntry::from_bot(user_id, outputs.join("\n")))
            .await?;

        let sent = self.deliver(chat_id, &outputs).await?;
        if sent == 0 {
            info!("No usable output for {} ({} empty)", user_id, outputs.len());
            self.send(chat_id, &self.config.notices.not_understood).await?;
            return Ok(Outcome::NoUsableCompletion);
        }
        info!("✅ Sent {} message(s) to {}", sent, user_id);
        Ok(Outcome::Replied { sent })
    }

    /// Send non-empty outputs one at a time, each after the pacing delay.
    async fn deliver(&self, chat_id: i64, outputs: &[String]) -> Result<usize, PipelineError> {
        let mut sent = 0;
        for output in outputs.iter().filter(|o| !o.is_empty()) {
            tokio::time::sleep(self.config.pacing).await;
            self.send(chat_id, output).await?;
            sent += 1;
        }
        Ok(sent)
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<(), PipelineError> {
        self.platform.send_text(chat_id, text).await?;
        Ok(())
    }

    /// Bulk-save messages from one sender into `user_id`'s transcript.
    pub async fn save_batch(
        &self,
        user_id: i64,
        sender_id: i64,
        messages: &[String],
    ) -> Result<Vec<TranscriptEntry>, PipelineError> {
        Ok(transcript::save_batch(self.store.as_ref(), user_id, sender_id, messages).await?)
    }
}
