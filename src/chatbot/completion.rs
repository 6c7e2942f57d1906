//! Completion service interface.

use async_trait::async_trait;

/// Behavioural profile passed to the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    Friend,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Friend => "friend",
        }
    }
}

#[derive(Debug)]
pub enum CompletionError {
    Http(String),
    Api(String),
    Parse(String),
}

impl std::fmt::Display for CompletionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionError::Http(e) => write!(f, "HTTP error: {e}"),
            CompletionError::Api(e) => write!(f, "API error: {e}"),
            CompletionError::Parse(e) => write!(f, "Parse error: {e}"),
        }
    }
}

impl std::error::Error for CompletionError {}

/// Generates replies.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Continue a conversation.
    ///
    /// `inputs` are the new user turns, `context` the prior turns anchoring
    /// them. Returns outputs in delivery order; an empty string means "no
    /// response" for that slot.
    async fn complete(
        &self,
        persona: Persona,
        inputs: &[String],
        context: &[String],
    ) -> Result<Vec<String>, CompletionError>;

    /// Describe or respond to an image. `None` when nothing usable came back.
    async fn complete_with_image(
        &self,
        persona: Persona,
        inputs: &[String],
        image_url: &str,
    ) -> Result<Option<String>, CompletionError>;
}
