//! Chat log storage - persistence of finished conversation turns.

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const CHAT_LOGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("chat_logs");

/// One finished conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLog {
    /// Vendor request id; unique key of the record.
    pub request_id: String,
    pub session_id: Option<String>,
    pub user_query: String,
    pub ai_response: String,
    /// Last normalized source list observed on the stream.
    #[serde(default)]
    pub sources: Option<Value>,
    /// Usage, latency and raw evidence captured from the finishing event.
    #[serde(default)]
    pub metadata: Option<Value>,
    /// Unix timestamp in milliseconds.
    pub created_at: i64,
}

impl ChatLog {
    pub fn new(request_id: impl Into<String>, user_query: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            session_id: None,
            user_query: user_query.into(),
            ai_response: String::new(),
            sources: None,
            metadata: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Chat log storage over a shared redb database
#[derive(Debug, Clone)]
pub struct ChatLogStorage {
    db: Arc<Database>,
}

impl ChatLogStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(CHAT_LOGS_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Store one finished turn, replacing any record with the same id
    pub fn create(&self, log: &ChatLog) -> Result<()> {
        let data = serde_json::to_vec(log)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CHAT_LOGS_TABLE)?;
            table.insert(log.request_id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get one turn by request id
    pub fn get(&self, request_id: &str) -> Result<Option<ChatLog>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHAT_LOGS_TABLE)?;

        if let Some(data) = table.get(request_id)? {
            Ok(Some(serde_json::from_slice(data.value())?))
        } else {
            Ok(None)
        }
    }

    /// Latest `limit` turns, newest first
    pub fn list_recent(&self, limit: usize) -> Result<Vec<ChatLog>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHAT_LOGS_TABLE)?;

        let mut logs = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            logs.push(serde_json::from_slice::<ChatLog>(value.value())?);
        }

        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        logs.truncate(limit);
        Ok(logs)
    }

    /// Delete one turn by request id
    pub fn delete(&self, request_id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(CHAT_LOGS_TABLE)?;
            table.remove(request_id)?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn storage() -> (tempfile::TempDir, ChatLogStorage) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        let storage = ChatLogStorage::new(db).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_create_and_get() {
        let (_dir, storage) = storage();

        let mut log = ChatLog::new("req-001", "How do returns work?");
        log.ai_response = "Returns are accepted within 30 days.".to_string();
        storage.create(&log).unwrap();

        let loaded = storage.get("req-001").unwrap().unwrap();
        assert_eq!(loaded.user_query, "How do returns work?");
        assert_eq!(loaded.ai_response, "Returns are accepted within 30 days.");
        assert!(storage.get("req-missing").unwrap().is_none());
    }

    #[test]
    fn test_list_recent_orders_newest_first() {
        let (_dir, storage) = storage();

        for (i, created_at) in [(1, 100), (2, 300), (3, 200)] {
            let mut log = ChatLog::new(format!("req-{i}"), "q");
            log.created_at = created_at;
            storage.create(&log).unwrap();
        }

        let logs = storage.list_recent(2).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].request_id, "req-2");
        assert_eq!(logs[1].request_id, "req-3");
    }

    #[test]
    fn test_delete() {
        let (_dir, storage) = storage();

        storage.create(&ChatLog::new("req-001", "q")).unwrap();
        assert!(storage.delete("req-001").unwrap());
        assert!(!storage.delete("req-001").unwrap());
        assert!(storage.get("req-001").unwrap().is_none());
    }

    #[test]
    fn test_metadata_round_trip() {
        let (_dir, storage) = storage();

        let mut log = ChatLog::new("req-001", "q");
        log.metadata = Some(serde_json::json!({
            "usage": {"input_tokens": 3, "output_tokens": 5},
            "latency": 1200,
        }));
        storage.create(&log).unwrap();

        let loaded = storage.get("req-001").unwrap().unwrap();
        assert_eq!(loaded.metadata.unwrap()["latency"], 1200);
    }
}
