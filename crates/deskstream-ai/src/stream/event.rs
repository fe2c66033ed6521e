//! Normalized events yielded to the transport layer.

use serde::Serialize;
use serde_json::Value;

use crate::stream::sources::SourceRecord;
use crate::stream::usage::TokenUsage;

/// Request id of the keep-alive chunk emitted before the vendor call has
/// produced anything.
pub const INIT_REQUEST_ID: &str = "init";

/// One item of the normalized event sequence. Serializes to the exact wire
/// shape the client consumes: a chunk object, or a terminal `{error}`
/// object.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Chunk(ChatChunk),
    Error(ErrorEvent),
}

impl StreamEvent {
    pub fn error(message: impl Into<String>, request_id: Option<String>) -> Self {
        Self::Error(ErrorEvent {
            error: message.into(),
            request_id,
        })
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, Self::Chunk(chunk) if chunk.is_finish)
    }
}

/// Normalized answer increment.
///
/// `sources` surfaces live as soon as evidence is known; usage, latency and
/// the raw evidence payloads ride only on the single finishing chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ChatChunk {
    pub text: String,
    pub is_finish: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRecord>>,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rag_result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_result: Option<Value>,
}

impl ChatChunk {
    /// Keep-alive chunk sent while the vendor call is still connecting.
    pub fn keep_alive() -> Self {
        Self {
            text: String::new(),
            is_finish: false,
            sources: None,
            request_id: INIT_REQUEST_ID.to_string(),
            usage: None,
            latency: None,
            rag_result: None,
            web_result: None,
        }
    }
}

/// Terminal error object.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEvent {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}
