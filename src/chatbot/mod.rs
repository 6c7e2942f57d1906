//! Chatbot module - classifies Telegram updates, relays them to the
//! completion service and records the transcript.

pub mod completion;
pub mod database;
pub mod entry;
pub mod mask;
pub mod message;
pub mod pipeline;
pub mod platform;
pub mod telegram;
pub mod transcript;


pub use completion::{CompletionClient, Persona};
pub use database::Database;
pub use entry::{EntryKind, TranscriptEntry, BOT_SENDER_ID};
pub use mask::TokenMask;
pub use message::{Body, InboundMessage, RawUpdate};
pub use pipeline::{Outcome, Pipeline, PipelineConfig, PipelineError};
pub use platform::{BotIdentity, Platform};
pub use telegram::TelegramClient;
pub use transcript::TranscriptStore;
