use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teloxide::types::{ChatId, UserId};

use crate::chatbot::completion::Persona;
use crate::chatbot::mask::TokenMask;
use crate::chatbot::pipeline::{PipelineConfig, DEFAULT_PACING};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

/// User-visible fixed replies. Override any of them under `notices` to localize.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Notices {
    /// Sent when an update has no text, caption or photo.
    pub unsupported_type: String,
    /// Sent when nothing usable could be generated.
    pub not_understood: String,
    /// Acknowledgement sent while a photo is being described.
    pub reading_image: String,
}

impl Default for Notices {
    fn default() -> Self {
        Self {
            unsupported_type: "Sorry, I can't understand this type of message.".to_string(),
            not_understood: "Sorry, I didn't understand that.".to_string(),
            reading_image: "Reading image...".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// API key for the completion service
    completion_api_key: String,
    #[serde(default = "default_completion_model")]
    completion_model: String,
    #[serde(default = "default_completion_endpoint")]
    completion_endpoint: String,
    #[serde(default = "default_completion_max_tokens")]
    completion_max_tokens: u32,
    /// Users allowed to talk to the bot. Empty means everyone.
    #[serde(default)]
    allowed_user_ids: Vec<u64>,
    /// Delay before each outbound message, in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pacing_ms: u64,
    /// Directory for state files (transcript, logs). Defaults to current directory.
    data_dir: Option<String>,
    log_chat_id: Option<i64>,
    #[serde(default)]
    notices: Notices,
}

fn default_completion_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_completion_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_completion_max_tokens() -> u32 {
    1024
}

fn default_pacing_ms() -> u64 {
    DEFAULT_PACING.as_millis() as u64
}

pub struct Config {
    pub telegram_bot_token: String,
    pub completion_api_key: String,
    pub completion_model: String,
    pub completion_endpoint: String,
    pub completion_max_tokens: u32,
    pub allowed_user_ids: HashSet<UserId>,
    pub pacing: Duration,
    /// Directory for state files (transcript, logs).
    pub data_dir: PathBuf,
    pub log_chat_id: Option<ChatId>,
    pub notices: Notices,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if file.completion_api_key.is_empty() {
            return Err(ConfigError::Validation("completion_api_key is required".into()));
        }
        if file.completion_max_tokens == 0 {
            return Err(ConfigError::Validation("completion_max_tokens must be positive".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            completion_api_key: file.completion_api_key,
            completion_model: file.completion_model,
            completion_endpoint: file.completion_endpoint,
            completion_max_tokens: file.completion_max_tokens,
            allowed_user_ids: file.allowed_user_ids.into_iter().map(UserId).collect(),
            pacing: Duration::from_millis(file.pacing_ms),
            data_dir,
            log_chat_id: file.log_chat_id.map(ChatId),
            notices: file.notices,
        })
    }

    pub fn token_mask(&self) -> TokenMask {
        TokenMask::new(self.telegram_bot_token.clone())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            persona: Persona::Friend,
            pacing: self.pacing,
            notices: self.notices.clone(),
            mask: self.token_mask(),
        }
    }
}
