//! Redaction of the bot token in strings that leave the process.
//!
//! Telegram file URLs embed the bot token in their path, so anything derived
//! from them (transcript payloads, forwarded log lines) goes through here.

/// Placeholder written in place of the token.
///
/// Contains characters a Telegram token can never contain (`{`, `}`), so it
/// never matches token-shaped text that occurs naturally.
pub const TOKEN_PLACEHOLDER: &str = "{{BOT_TOKEN}}";

/// Literal, total substitution between a secret and [`TOKEN_PLACEHOLDER`].
#[derive(Debug, Clone)]
pub struct TokenMask {
    secret: String,
}

impl TokenMask {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    /// Replace every occurrence of the secret with the placeholder.
    pub fn mask(&self, s: &str) -> String {
        // `str::replace` with an empty pattern inserts between every char.
        if self.secret.is_empty() {
            return s.to_string();
        }
        s.replace(&self.secret, TOKEN_PLACEHOLDER)
    }

    /// Replace every occurrence of the placeholder with the secret.
    pub fn unmask(&self, s: &str) -> String {
        if self.secret.is_empty() {
            return s.to_string();
        }
        s.replace(TOKEN_PLACEHOLDER, &self.secret)
    }
}
