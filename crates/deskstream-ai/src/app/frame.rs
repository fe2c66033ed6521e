//! Wire types for the hosted application stream.
//!
//! One `AppFrame` is one item of the vendor's streaming call. Frames carry
//! cumulative state: `output.text` grows across frames, and workflow-mode
//! frames additionally carry per-node message chunks with a sequence id.

use serde::Deserialize;
use serde_json::Value;

/// Sequence id meaning "no ordering guarantee, always append".
pub const UNORDERED_SEQ_ID: i64 = -1;

fn default_status() -> u16 {
    200
}

fn default_seq_id() -> i64 {
    UNORDERED_SEQ_ID
}

/// One deserialized item of the vendor stream. Immutable once received.
#[derive(Debug, Clone, Deserialize)]
pub struct AppFrame {
    #[serde(default = "default_status")]
    pub status_code: u16,
    #[serde(default)]
    pub request_id: String,
    /// Vendor error code, set on non-success frames.
    #[serde(default)]
    pub code: Option<String>,
    /// Vendor error message, set on non-success frames.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub output: AppOutput,
    #[serde(default)]
    pub usage: Option<AppUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppOutput {
    /// Cumulative text payload. For workflow apps this is a JSON envelope
    /// (possibly a still-growing prefix of one), for plain chat the answer
    /// itself.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub workflow_message: Option<WorkflowMessage>,
    #[serde(default)]
    pub rag_result: Option<Value>,
    #[serde(default)]
    pub web_result: Option<Value>,
    #[serde(default)]
    pub doc_references: Option<Vec<Value>>,
}

/// Per-node message chunk emitted by workflow applications.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowMessage {
    #[serde(default = "default_seq_id")]
    pub node_msg_seq_id: i64,
    #[serde(default)]
    pub message: Option<WorkflowInnerMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowInnerMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage as reported by the vendor. Agent responses spread counts
/// across per-model entries instead of the top-level fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub models: Vec<ModelUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl AppFrame {
    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }

    /// True when the frame carries a real finish marker. The vendor emits
    /// the literal string "null" on intermediate frames.
    pub fn finish_signaled(&self) -> bool {
        matches!(self.output.finish_reason.as_deref(), Some(reason) if reason != "null")
    }

    /// Best-effort decoded error message for non-success frames. Workflow
    /// failures nest `{"nodeName": ..., "errorInfo": ...}` inside the
    /// message string.
    pub fn error_message(&self) -> String {
        let raw = self.message.clone().unwrap_or_default();
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&raw)
            && let Some(info) = map.get("errorInfo").and_then(Value::as_str)
        {
            let node = map
                .get("nodeName")
                .and_then(Value::as_str)
                .unwrap_or("Node");
            return format!("{}: {}", node, info);
        }
        raw
    }

    pub fn error_code(&self) -> String {
        self.code
            .clone()
            .unwrap_or_else(|| self.status_code.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_frame() {
        let frame: AppFrame = serde_json::from_str(r#"{"request_id": "req-1"}"#).unwrap();
        assert!(frame.is_ok());
        assert_eq!(frame.request_id, "req-1");
        assert!(frame.output.text.is_none());
        assert!(!frame.finish_signaled());
    }

    #[test]
    fn finish_reason_null_string_is_not_finish() {
        let frame: AppFrame =
            serde_json::from_str(r#"{"output": {"finish_reason": "null"}}"#).unwrap();
        assert!(!frame.finish_signaled());

        let frame: AppFrame =
            serde_json::from_str(r#"{"output": {"finish_reason": "stop"}}"#).unwrap();
        assert!(frame.finish_signaled());
    }

    #[test]
    fn workflow_seq_id_defaults_to_unordered() {
        let frame: AppFrame = serde_json::from_str(
            r#"{"output": {"workflow_message": {"message": {"content": "hi"}}}}"#,
        )
        .unwrap();
        let wf = frame.output.workflow_message.unwrap();
        assert_eq!(wf.node_msg_seq_id, UNORDERED_SEQ_ID);
    }

    #[test]
    fn error_message_unwraps_node_error_info() {
        let frame: AppFrame = serde_json::from_str(
            r#"{"status_code": 400, "code": "InvalidParameter",
                "message": "{\"nodeName\": \"LLM_1\", \"errorInfo\": \"prompt too long\"}"}"#,
        )
        .unwrap();
        assert!(!frame.is_ok());
        assert_eq!(frame.error_message(), "LLM_1: prompt too long");
        assert_eq!(frame.error_code(), "InvalidParameter");
    }

    #[test]
    fn error_message_falls_back_to_raw_text() {
        let frame: AppFrame = serde_json::from_str(
            r#"{"status_code": 429, "message": "Requests throttled"}"#,
        )
        .unwrap();
        assert_eq!(frame.error_message(), "Requests throttled");
        assert_eq!(frame.error_code(), "429");
    }

    #[test]
    fn usage_deserializes_model_entries() {
        let frame: AppFrame = serde_json::from_str(
            r#"{"usage": {"models": [
                {"input_tokens": 10, "output_tokens": 4},
                {"input_tokens": 7, "output_tokens": 2}
            ]}}"#,
        )
        .unwrap();
        let usage = frame.usage.unwrap();
        assert_eq!(usage.input_tokens, 0);
        assert_eq!(usage.models.len(), 2);
    }
}
