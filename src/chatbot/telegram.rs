//! Telegram client using teloxide.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tracing::{debug, warn};

use crate::chatbot::message::RawUpdate;
use crate::chatbot::platform::{BotIdentity, Platform, PlatformError};

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
    token: String,
    identity: BotIdentity,
}

impl TelegramClient {
    /// Fetch the bot's identity with `getMe` and build the client.
    pub async fn connect(bot: Bot, token: String) -> Result<Self, PlatformError> {
        let me = bot
            .get_me()
            .await
            .map_err(|e| PlatformError(format!("Failed to get bot info: {e}")))?;
        let identity = BotIdentity {
            user_id: me.id.0 as i64,
            username: Some(me.username().to_string()),
        };
        Ok(Self { bot, token, identity })
    }
}

/// Download URL for a file path returned by `getFile`.
pub fn file_url(token: &str, file_path: &str) -> String {
    format!("https://api.telegram.org/file/bot{token}/{file_path}")
}

#[async_trait]
impl Platform for TelegramClient {
    async fn file_path(&self, file_id: &str) -> Result<String, PlatformError> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(|e| PlatformError(format!("Failed to get file info: {e}")))?;
        debug!("Resolved file {} to {}", file_id, file.path);
        Ok(file.path)
    }

    fn file_url(&self, file_path: &str) -> String {
        file_url(&self.token, file_path)
    }

    fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), PlatformError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to send: {e}");
                warn!("{}", msg);
                PlatformError(msg)
            })
    }
}

/// Project a Telegram message into a [`RawUpdate`].
pub fn to_raw_update(msg: &Message) -> RawUpdate {
    let reply_to_text = msg
        .reply_to_message()
        .and_then(|reply| reply.text().or(reply.caption()))
        .map(str::to_string);

    // Telegram lists photo sizes smallest first.
    let photo_file_id = msg
        .photo()
        .and_then(|sizes| sizes.last())
        .map(|size| size.file.id.0.clone());

    RawUpdate {
        chat_id: msg.chat.id.0,
        sender_id: msg.from.as_ref().map(|u| u.id.0 as i64),
        text: msg.text().map(str::to_string),
        caption: msg.caption().map(str::to_string),
        photo_file_id,
        reply_to_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_url() {
        assert_eq!(
            file_url("123:abc", "photos/file_1.jpg"),
            "https://api.telegram.org/file/bot123:abc/photos/file_1.jpg"
        );
    }
}
