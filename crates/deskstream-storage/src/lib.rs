//! deskstream Storage - embedded persistence layer
//!
//! Finished conversation turns are stored in redb, keyed by the vendor
//! request id. The stream itself never touches storage; the transport
//! layer saves one record per turn after the stream ends.

pub mod chat_log;

pub use chat_log::{ChatLog, ChatLogStorage};

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use redb::Database;

/// Central storage manager that initializes all storage subsystems
pub struct Storage {
    pub chat_logs: ChatLogStorage,
}

impl Storage {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);
        Ok(Self {
            chat_logs: ChatLogStorage::new(db)?,
        })
    }
}
