//! Messaging platform interface.

use async_trait::async_trait;

/// Who the bot is on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: i64,
    pub username: Option<String>,
}

#[derive(Debug)]
pub struct PlatformError(pub String);

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "platform error: {}", self.0)
    }
}

impl std::error::Error for PlatformError {}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Resolve an attachment reference to the server-side file path.
    async fn file_path(&self, file_id: &str) -> Result<String, PlatformError>;

    /// Fetchable URL for a resolved file path. Contains the bot token.
    fn file_url(&self, file_path: &str) -> String;

    fn identity(&self) -> &BotIdentity;

    /// Deliver one plain-text message.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), PlatformError>;
}
