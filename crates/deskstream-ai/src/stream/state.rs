//! Turn-local mutable state.
//!
//! One `TurnState` lives for exactly one conversation turn, owned by the
//! consumer loop. Nothing here is shared across turns.

use std::time::Instant;

use crate::app::{AppFrame, UNORDERED_SEQ_ID};
use crate::stream::smooth::delta_after;

#[derive(Debug)]
pub struct TurnState {
    /// Characters of the answer already emitted. Non-decreasing.
    emitted_chars: usize,
    /// Accumulated workflow message content across frames.
    workflow_buf: String,
    /// Highest processed workflow sequence id.
    last_seq_id: i64,
    /// Whether the single finish event of this turn has been emitted.
    finish_emitted: bool,
    started_at: Instant,
}

impl TurnState {
    pub fn new() -> Self {
        Self {
            emitted_chars: 0,
            workflow_buf: String::new(),
            last_seq_id: UNORDERED_SEQ_ID,
            finish_emitted: false,
            started_at: Instant::now(),
        }
    }

    /// Fold a frame's workflow message into the turn buffer and return the
    /// authoritative parse source for this frame.
    ///
    /// Workflow content is appended only when its sequence id advances the
    /// watermark; the unordered sentinel always appends. Once any workflow
    /// content has accumulated it supersedes the frame's direct text field.
    pub fn absorb(&mut self, frame: &AppFrame) -> String {
        if let Some(wf) = &frame.output.workflow_message
            && let Some(content) = wf
                .message
                .as_ref()
                .and_then(|m| m.content.as_deref())
                .filter(|c| !c.is_empty())
        {
            if wf.node_msg_seq_id > self.last_seq_id {
                self.workflow_buf.push_str(content);
                self.last_seq_id = wf.node_msg_seq_id;
            } else if wf.node_msg_seq_id == UNORDERED_SEQ_ID {
                self.workflow_buf.push_str(content);
            }
        }

        if self.workflow_buf.is_empty() {
            frame.output.text.clone().unwrap_or_default()
        } else {
            self.workflow_buf.clone()
        }
    }

    /// New characters of the cumulative answer past the watermark; advances
    /// the watermark. The watermark never regresses.
    pub fn take_delta(&mut self, full_text: &str) -> String {
        let delta = delta_after(full_text, self.emitted_chars);
        let total = full_text.chars().count();
        if total > self.emitted_chars {
            self.emitted_chars = total;
        }
        delta
    }

    pub fn has_emitted_text(&self) -> bool {
        self.emitted_chars > 0
    }

    /// Claim the turn's finish signal. True exactly once; later claims are
    /// demoted so duplicate vendor finish markers cannot produce a second
    /// terminal event.
    pub fn try_finish(&mut self) -> bool {
        if self.finish_emitted {
            false
        } else {
            self.finish_emitted = true;
            true
        }
    }

    /// Milliseconds since the turn started.
    pub fn latency_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workflow_frame(seq_id: i64, content: &str) -> AppFrame {
        serde_json::from_value(serde_json::json!({
            "output": {
                "workflow_message": {
                    "node_msg_seq_id": seq_id,
                    "message": { "content": content },
                }
            }
        }))
        .unwrap()
    }

    fn text_frame(text: &str) -> AppFrame {
        serde_json::from_value(serde_json::json!({"output": {"text": text}})).unwrap()
    }

    #[test]
    fn workflow_content_appends_in_sequence_order() {
        let mut state = TurnState::new();
        assert_eq!(state.absorb(&workflow_frame(1, "He")), "He");
        assert_eq!(state.absorb(&workflow_frame(2, "llo")), "Hello");
    }

    #[test]
    fn stale_sequence_ids_are_skipped() {
        let mut state = TurnState::new();
        state.absorb(&workflow_frame(3, "abc"));
        // replayed and out-of-order frames must not duplicate content
        assert_eq!(state.absorb(&workflow_frame(3, "abc")), "abc");
        assert_eq!(state.absorb(&workflow_frame(2, "zzz")), "abc");
    }

    #[test]
    fn unordered_sentinel_always_appends() {
        let mut state = TurnState::new();
        state.absorb(&workflow_frame(5, "a"));
        assert_eq!(state.absorb(&workflow_frame(UNORDERED_SEQ_ID, "b")), "ab");
        assert_eq!(state.absorb(&workflow_frame(UNORDERED_SEQ_ID, "c")), "abc");
    }

    #[test]
    fn workflow_buffer_supersedes_direct_text() {
        let mut state = TurnState::new();
        assert_eq!(state.absorb(&text_frame("raw")), "raw");
        state.absorb(&workflow_frame(1, "wf"));
        assert_eq!(state.absorb(&text_frame("raw longer")), "wf");
    }

    #[test]
    fn delta_watermark_is_monotonic() {
        let mut state = TurnState::new();
        assert_eq!(state.take_delta("He"), "He");
        assert_eq!(state.take_delta("Hello"), "llo");
        // cumulative text never shrinks, but a regression must not panic
        // or rewind the watermark
        assert_eq!(state.take_delta("He"), "");
        assert_eq!(state.take_delta("Hello!"), "!");
    }

    #[test]
    fn finish_is_claimed_exactly_once() {
        let mut state = TurnState::new();
        assert!(state.try_finish());
        assert!(!state.try_finish());
        assert!(!state.try_finish());
    }

    #[test]
    fn emitted_text_tracking() {
        let mut state = TurnState::new();
        assert!(!state.has_emitted_text());
        state.take_delta("hi");
        assert!(state.has_emitted_text());
    }
}
