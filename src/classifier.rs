use crate::chatbot::message::{Body, InboundMessage, RawUpdate};
use crate::chatbot::platform::{Platform, PlatformError};

#[derive(Debug)]
pub enum ClassifyError {
    /// No text, caption or photo to work with.
    Unclassifiable,
    /// Resolving the photo attachment failed.
    Platform(PlatformError),
}

impl std::fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifyError::Unclassifiable => write!(f, "unclassifiable update"),
            ClassifyError::Platform(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ClassifyError {}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_ref().filter(|s| !s.is_empty()).cloned()
}

/// Normalize an update into the parts the pipeline acts on.
pub async fn classify(
    update: &RawUpdate,
    platform: &dyn Platform,
) -> Result<InboundMessage, ClassifyError> {
    // A photo wins over text; its caption only counts alongside it.
    let body = match (&update.photo_file_id, non_empty(&update.text)) {
        (Some(file_id), _) => Body::Photo {
            path: platform
                .file_path(file_id)
                .await
                .map_err(ClassifyError::Platform)?,
            caption: non_empty(&update.caption),
        },
        (None, Some(text)) => Body::Text(text),
        (None, None) => return Err(ClassifyError::Unclassifiable),
    };

    Ok(InboundMessage {
        reply_to_message: non_empty(&update.reply_to_text),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::platform::BotIdentity;
    use async_trait::async_trait;

    struct FilePaths {
        identity: BotIdentity,
        fail: bool,
    }

    impl FilePaths {
        fn new(fail: bool) -> Self {
            Self { identity: BotIdentity { user_id: 1, username: None }, fail }
        }
    }

    #[async_trait]
    impl Platform for FilePaths {
        async fn file_path(&self, file_id: &str) -> Result<String, PlatformError> {
            if self.fail {
                return Err(PlatformError("getFile failed".to_string()));
            }
            Ok(format!("photos/{file_id}.jpg"))
        }

        fn file_url(&self, file_path: &str) -> String {
            format!("https://files/{file_path}")
        }

        fn identity(&self) -> &BotIdentity {
            &self.identity
        }

        async fn send_text(&self, _chat_id: i64, _text: &str) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_plain_text() {
        let update = RawUpdate {
            text: Some("hello".to_string()),
            ..Default::default()
        };
        let msg = classify(&update, &FilePaths::new(false)).await.unwrap();
        assert_eq!(msg.body, Body::Text("hello".to_string()));
        assert_eq!(msg.reply_to_message, None);
    }

    #[tokio::test]
    async fn test_photo_with_caption_resolves_path() {
        let update = RawUpdate {
            caption: Some("look".to_string()),
            photo_file_id: Some("abc".to_string()),
            ..Default::default()
        };
        let msg = classify(&update, &FilePaths::new(false)).await.unwrap();
        assert_eq!(
            msg.body,
            Body::Photo {
                path: "photos/abc.jpg".to_string(),
                caption: Some("look".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_caption_without_photo_ignored() {
        // e.g. a captioned video
        let update = RawUpdate {
            caption: Some("a video".to_string()),
            ..Default::default()
        };
        let err = classify(&update, &FilePaths::new(false)).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Unclassifiable));
    }

    #[tokio::test]
    async fn test_photo_takes_precedence_over_text() {
        let update = RawUpdate {
            text: Some("ignored".to_string()),
            photo_file_id: Some("abc".to_string()),
            ..Default::default()
        };
        let msg = classify(&update, &FilePaths::new(false)).await.unwrap();
        assert!(matches!(msg.body, Body::Photo { caption: None, .. }));
    }

    #[tokio::test]
    async fn test_empty_text_unclassifiable() {
        let update = RawUpdate {
            text: Some(String::new()),
            ..Default::default()
        };
        let err = classify(&update, &FilePaths::new(false)).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Unclassifiable));
    }

    #[tokio::test]
    async fn test_empty_update_unclassifiable() {
        let update = RawUpdate {
            reply_to_text: Some("earlier".to_string()),
            ..Default::default()
        };
        let err = classify(&update, &FilePaths::new(false)).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Unclassifiable));
    }

    #[tokio::test]
    async fn test_reply_text_extracted() {
        let update = RawUpdate {
            text: Some("why?".to_string()),
            reply_to_text: Some("because".to_string()),
            ..Default::default()
        };
        let msg = classify(&update, &FilePaths::new(false)).await.unwrap();
        assert_eq!(msg.reply_to_message.as_deref(), Some("because"));
    }

    #[tokio::test]
    async fn test_file_resolution_failure_propagates() {
        let update = RawUpdate {
            photo_file_id: Some("abc".to_string()),
            ..Default::default()
        };
        let err = classify(&update, &FilePaths::new(true)).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Platform(_)));
    }
}
