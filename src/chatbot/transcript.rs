//! Transcript store interface and the batched write path.

use async_trait::async_trait;
use tracing::info;

use crate::chatbot::entry::{EntryKind, TranscriptEntry};

/// Errors from a transcript backend.
#[derive(Debug)]
pub enum StoreError {
    /// The storage engine rejected the operation.
    Backend(Box<dyn std::error::Error + Send + Sync>),
    /// The connection lock was poisoned by a panicking writer.
    Poisoned,
    /// A stored row could not be mapped back into an entry.
    Corrupt(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Backend(e) => write!(f, "transcript backend error: {e}"),
            StoreError::Poisoned => write!(f, "transcript connection lock poisoned"),
            StoreError::Corrupt(e) => write!(f, "corrupt transcript row: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Backend(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Append-only record of conversations.
///
/// Implementations must keep entries of one `append_batch` call in the
/// order given; readers use `order` to recover it after storage sorting.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append(&self, entry: TranscriptEntry) -> Result<TranscriptEntry, StoreError>;

    async fn append_batch(
        &self,
        entries: Vec<TranscriptEntry>,
    ) -> Result<Vec<TranscriptEntry>, StoreError>;
}

/// Build one text entry per message, numbered from zero, and write them in
/// a single batch.
pub fn batch_entries(user_id: i64, sender_id: i64, messages: &[String]) -> Vec<TranscriptEntry> {
    messages
        .iter()
        .enumerate()
        .map(|(i, text)| TranscriptEntry {
            payload: text.clone(),
            user_id,
            sender_id,
            kind: EntryKind::Text,
            order: Some(i as u32),
        })
        .collect()
}

/// Save `messages` from `sender_id` into `user_id`'s transcript as one batch.
pub async fn save_batch(
    store: &dyn TranscriptStore,
    user_id: i64,
    sender_id: i64,
    messages: &[String],
) -> Result<Vec<TranscriptEntry>, StoreError> {
    if messages.is_empty() {
        return Ok(Vec::new());
    }
    let entries = batch_entries(user_id, sender_id, messages);
    let saved = store.append_batch(entries).await?;
    info!("💾 Saved batch of {} entries for user {}", saved.len(), user_id);
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct BatchRecorder {
        batches: Mutex<Vec<Vec<TranscriptEntry>>>,
    }

    #[async_trait]
    impl TranscriptStore for BatchRecorder {
        async fn append(&self, entry: TranscriptEntry) -> Result<TranscriptEntry, StoreError> {
            self.batches.lock().unwrap().push(vec![entry.clone()]);
            Ok(entry)
        }

        async fn append_batch(
            &self,
            entries: Vec<TranscriptEntry>,
        ) -> Result<Vec<TranscriptEntry>, StoreError> {
            self.batches.lock().unwrap().push(entries.clone());
            Ok(entries)
        }
    }

    #[tokio::test]
    async fn test_save_batch_orders_from_zero() {
        let store = BatchRecorder::default();
        let messages: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();

        save_batch(&store, 7, 42, &messages).await.unwrap();

        let batches = store.batches.lock().unwrap();
        assert_eq!(batches.len(), 1, "should be a single batch call");
        let batch = &batches[0];
        assert_eq!(batch.len(), 3);
        for (i, entry) in batch.iter().enumerate() {
            assert_eq!(entry.order, Some(i as u32));
            assert_eq!(entry.user_id, 7);
            assert_eq!(entry.sender_id, 42);
            assert_eq!(entry.kind, EntryKind::Text);
        }
        let payloads: Vec<_> = batch.iter().map(|e| e.payload.as_str()).collect();
        assert_eq!(payloads, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_save_batch_empty_skips_store() {
        let store = BatchRecorder::default();
        let saved = save_batch(&store, 7, 42, &[]).await.unwrap();
        assert!(saved.is_empty());
        assert!(store.batches.lock().unwrap().is_empty());
    }
}
