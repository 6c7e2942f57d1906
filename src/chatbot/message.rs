//! Inbound message shapes.

/// Platform-neutral projection of one inbound update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawUpdate {
    /// Chat to reply into.
    pub chat_id: i64,
    /// Author, when the platform reports one.
    pub sender_id: Option<i64>,
    pub text: Option<String>,
    /// Caption attached to a media message.
    pub caption: Option<String>,
    /// Attachment reference of the largest photo size.
    pub photo_file_id: Option<String>,
    /// Text (or caption) of the message this one replies to.
    pub reply_to_text: Option<String>,
}

/// The part of an update the bot answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Photo {
        /// Resolved server-side file path.
        path: String,
        caption: Option<String>,
    },
}

/// What the classifier extracted from an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub reply_to_message: Option<String>,
    pub body: Body,
}
