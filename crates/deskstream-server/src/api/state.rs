use std::sync::Arc;

use deskstream_ai::StreamEngine;
use deskstream_storage::Storage;

/// Application state shared across all API handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: StreamEngine,
    pub storage: Arc<Storage>,
}
