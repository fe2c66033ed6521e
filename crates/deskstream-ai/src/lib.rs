//! deskstream AI - streaming normalization engine for hosted LLM
//! application responses
//!
//! This crate provides:
//! - A blocking client for the vendor's app-completion streaming call
//! - A bridge worker relaying that call onto an async channel
//! - Incremental recovery of answer text and evidence from partial JSON
//! - Delta conversion and burst smoothing for real-time typing
//! - Evidence normalization and exactly-once completion tracking

pub mod app;
pub mod error;
mod http_client;
pub mod stream;

// Re-export commonly used types
pub use app::{AppClient, AppFrame, AppRequest, BailianClient};
pub use error::{ChatError, Result};
pub use stream::{
    BridgeConfig, ChatChunk, ErrorEvent, EventStream, INIT_REQUEST_ID, SourceKind, SourceRecord,
    StreamEngine, StreamEvent, TokenUsage,
};
