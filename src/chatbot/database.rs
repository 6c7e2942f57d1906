//! Persistent SQLite transcript store.

use async_trait::async_trait;
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::chatbot::entry::{EntryKind, TranscriptEntry};
use crate::chatbot::transcript::{StoreError, TranscriptStore};

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(Box::new(e))
    }
}

/// SQLite-backed [`TranscriptStore`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Create a new in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        let db = Self { conn: Mutex::new(Connection::open_in_memory()?) };
        db.init_schema()?;
        Ok(db)
    }

    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = Self { conn: Mutex::new(Connection::open(path)?) };
        db.init_schema()?;
        info!("Loaded transcript from {:?} ({} entries)", path, db.entry_count()?);
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS transcript (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                sender_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                seq INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transcript_user ON transcript(user_id, id);
        "#)?;
        Ok(())
    }

    /// Total entries across all users.
    pub fn entry_count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM transcript", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// A user's transcript, oldest first.
    pub fn history(&self, user_id: i64) -> Result<Vec<TranscriptEntry>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT payload, user_id, sender_id, kind, seq
             FROM transcript WHERE user_id = ?1 ORDER BY id ASC"
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<i64>>(4)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (payload, user_id, sender_id, kind, seq) = row?;
            let kind = EntryKind::parse(&kind)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown kind '{kind}'")))?;
            result.push(TranscriptEntry {
                payload,
                user_id,
                sender_id,
                kind,
                order: seq.map(|s| s as u32),
            });
        }
        Ok(result)
    }
}

fn insert(conn: &Connection, entry: &TranscriptEntry, created_at: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO transcript (user_id, sender_id, kind, payload, seq, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.user_id,
            entry.sender_id,
            entry.kind.as_str(),
            entry.payload,
            entry.order.map(i64::from),
            created_at
        ],
    )
}

fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[async_trait]
impl TranscriptStore for Database {
    async fn append(&self, entry: TranscriptEntry) -> Result<TranscriptEntry, StoreError> {
        let conn = self.lock()?;
        insert(&conn, &entry, &now())?;
        debug!("Appended {} entry for user {}", entry.kind.as_str(), entry.user_id);
        Ok(entry)
    }

    async fn append_batch(
        &self,
        entries: Vec<TranscriptEntry>,
    ) -> Result<Vec<TranscriptEntry>, StoreError> {
        let mut conn = self.lock()?;
        let created_at = now();
        let tx = conn.transaction()?;
        for entry in &entries {
            insert(&tx, entry, &created_at)?;
        }
        tx.commit()?;
        debug!("Appended batch of {} entries", entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::entry::BOT_SENDER_ID;
    use crate::chatbot::transcript::save_batch;

    #[tokio::test]
    async fn test_append_and_history() {
        let db = Database::in_memory().unwrap();
        db.append(TranscriptEntry::from_user(100, "hello")).await.unwrap();
        db.append(TranscriptEntry::from_bot(100, "hi there")).await.unwrap();
        db.append(TranscriptEntry::from_user(200, "other user")).await.unwrap();

        let history = db.history(100).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].payload, "hello");
        assert_eq!(history[0].sender_id, 100);
        assert_eq!(history[1].payload, "hi there");
        assert_eq!(history[1].sender_id, BOT_SENDER_ID);
        assert_eq!(db.entry_count().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_photo_kind_round_trips() {
        let db = Database::in_memory().unwrap();
        db.append(TranscriptEntry::photo_from_user(5, "https://x/{{BOT_TOKEN}}/p.jpg"))
            .await
            .unwrap();

        let history = db.history(5).unwrap();
        assert_eq!(history[0].kind, EntryKind::Photo);
        assert_eq!(history[0].order, None);
    }

    #[tokio::test]
    async fn test_batch_keeps_order() {
        let db = Database::in_memory().unwrap();
        let messages: Vec<String> = (0..5).map(|i| format!("m{i}")).collect();
        save_batch(&db, 9, 9, &messages).await.unwrap();

        let history = db.history(9).unwrap();
        let orders: Vec<_> = history.iter().map(|e| e.order).collect();
        assert_eq!(orders, [Some(0), Some(1), Some(2), Some(3), Some(4)]);
        let payloads: Vec<_> = history.iter().map(|e| e.payload.as_str()).collect();
        assert_eq!(payloads, ["m0", "m1", "m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn test_reopen_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.db");
        {
            let db = Database::open(&path).unwrap();
            db.append(TranscriptEntry::from_user(1, "kept")).await.unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.history(1).unwrap()[0].payload, "kept");
    }

    #[tokio::test]
    async fn test_sqlite_failure_maps_to_backend_error() {
        let db = Database::in_memory().unwrap();
        db.lock().unwrap().execute_batch("DROP TABLE transcript").unwrap();

        let err = db.append(TranscriptEntry::from_user(1, "lost")).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        let source = std::error::Error::source(&err).expect("backend error has a source");
        assert!(source.downcast_ref::<rusqlite::Error>().is_some());
    }

    #[test]
    fn test_unknown_kind_is_corrupt() {
        let db = Database::in_memory().unwrap();
        db.lock()
            .unwrap()
            .execute(
                "INSERT INTO transcript (user_id, sender_id, kind, payload, created_at)
                 VALUES (3, 3, 'voice', 'x', 'now')",
                [],
            )
            .unwrap();

        let err = db.history(3).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
