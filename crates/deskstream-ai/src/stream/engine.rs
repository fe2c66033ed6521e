//! Streaming response normalization engine.
//!
//! Consumes bridge messages for one turn and yields normalized events:
//! keep-alive first, then text deltas (smoothed), live sources, and exactly
//! one finishing event carrying usage and latency - or a single terminal
//! error object.

use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::Stream;
use serde_json::Value;

use crate::app::{AppClient, AppFrame, AppRequest};
use crate::stream::bridge::{BridgeConfig, BridgeMessage, spawn_bridge};
use crate::stream::event::{ChatChunk, StreamEvent};
use crate::stream::extract::extract_fields;
use crate::stream::smooth::{SMOOTH_THRESHOLD, split_delta};
use crate::stream::sources::{SourceRecord, collect_sources};
use crate::stream::state::TurnState;
use crate::stream::usage::TokenUsage;

/// Lazy, ordered, finite sequence of normalized events for one turn.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(15);

/// Waiting longer than this for the next frame is worth a warning.
const SLOW_FRAME_WARN: Duration = Duration::from_secs(1);

/// Entry point of the crate: turns one (query, session id) pair into a
/// normalized event stream.
#[derive(Clone)]
pub struct StreamEngine {
    client: Arc<dyn AppClient>,
    bridge: BridgeConfig,
    pacing_delay: Duration,
}

impl StreamEngine {
    pub fn new(client: Arc<dyn AppClient>) -> Self {
        Self {
            client,
            bridge: BridgeConfig::default(),
            pacing_delay: DEFAULT_PACING_DELAY,
        }
    }

    pub fn with_bridge_config(mut self, config: BridgeConfig) -> Self {
        self.bridge = config;
        self
    }

    pub fn with_pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }

    /// Start one turn. The stream ends after the terminal sentinel, after a
    /// terminal error event, or when the vendor reports a failure frame.
    pub fn stream(&self, query: impl Into<String>, session_id: Option<String>) -> EventStream {
        let client = self.client.clone();
        let bridge = self.bridge.clone();
        let pacing_delay = self.pacing_delay;
        let request = AppRequest::new(query, session_id);

        Box::pin(async_stream::stream! {
            tracing::info!(provider = client.name(), query = %request.query, "Starting vendor stream");

            let started = Instant::now();
            let mut state = TurnState::new();
            let mut rx = spawn_bridge(client, request, bridge);

            // Keep-alive so the transport can flush headers immediately.
            yield StreamEvent::Chunk(ChatChunk::keep_alive());

            let mut frame_count = 0u64;
            loop {
                let wait_start = Instant::now();
                let message = match rx.recv().await {
                    Some(message) => message,
                    None => break,
                };

                let frame = match message {
                    BridgeMessage::Done => break,
                    BridgeMessage::Failed(err) => {
                        yield StreamEvent::error(err.to_string(), None);
                        break;
                    }
                    BridgeMessage::Frame(frame) => frame,
                };

                frame_count += 1;
                let waited = wait_start.elapsed();
                if frame_count == 1 {
                    tracing::info!(
                        ttft_ms = started.elapsed().as_millis() as u64,
                        request_id = %frame.request_id,
                        "First frame received"
                    );
                } else if waited > SLOW_FRAME_WARN {
                    tracing::warn!(
                        waited_ms = waited.as_millis() as u64,
                        frame = frame_count,
                        "Slow vendor stream"
                    );
                }

                if !frame.is_ok() {
                    let message = frame.error_message();
                    tracing::error!(
                        code = %frame.error_code(),
                        message = %message,
                        "Vendor returned error frame"
                    );
                    yield StreamEvent::error(
                        format!("Error: {} - {}", frame.error_code(), message),
                        Some(frame.request_id.clone()),
                    );
                    break;
                }

                let had_text = state.has_emitted_text();
                let FrameOutput { chunks, paced } = process_frame(&frame, &mut state);
                if !had_text && state.has_emitted_text() {
                    tracing::info!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        frame = frame_count,
                        "First answer text recovered"
                    );
                }

                for chunk in chunks {
                    yield StreamEvent::Chunk(chunk);
                    if paced {
                        tokio::time::sleep(pacing_delay).await;
                    }
                }
            }
        })
    }
}

struct FrameOutput {
    chunks: Vec<ChatChunk>,
    /// Whether emissions should be separated by the pacing delay.
    paced: bool,
}

/// Normalize one success frame against the turn state.
fn process_frame(frame: &AppFrame, state: &mut TurnState) -> FrameOutput {
    let source = state.absorb(frame);
    let is_finish = frame.finish_signaled();

    let extracted = extract_fields(&source);
    let mut rag = extracted.rag_result;
    let mut web = extracted.web_result;
    let full_text = extracted.answer.unwrap_or_default();

    // Evidence can also ride directly on the frame. Trust those fields only
    // when the text payload is not itself the envelope being scanned above,
    // otherwise evidence would surface before the envelope confirms it.
    let raw_text = frame.output.text.as_deref().unwrap_or("");
    let envelope_stream =
        raw_text.trim_start().starts_with('{') && raw_text.contains("\"llm_result\"");
    if rag.is_none() && !envelope_stream {
        rag = frame.output.rag_result.clone().filter(|v| !v.is_null());
    }
    if web.is_none() && !envelope_stream {
        web = frame.output.web_result.clone().filter(|v| !v.is_null());
    }

    let sources = collect_sources(
        frame.output.doc_references.as_deref(),
        rag.as_ref(),
        web.as_ref(),
    );
    let current_sources = (!sources.is_empty()).then_some(sources);
    let usage = frame.usage.as_ref().map(TokenUsage::from_app);

    let delta = state.take_delta(&full_text);
    let delta_chars = delta.chars().count();

    if delta_chars > SMOOTH_THRESHOLD {
        let sub_chunks = split_delta(&delta);
        let last = sub_chunks.len() - 1;
        let chunks = sub_chunks
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let finish = is_finish && index == last && state.try_finish();
                build_chunk(
                    text,
                    finish,
                    frame,
                    state,
                    current_sources.clone(),
                    usage,
                    &rag,
                    &web,
                )
            })
            .collect();
        FrameOutput {
            chunks,
            paced: true,
        }
    } else if !delta.is_empty()
        || is_finish
        || (current_sources.is_some() && !state.has_emitted_text())
    {
        let finish = is_finish && state.try_finish();
        FrameOutput {
            chunks: vec![build_chunk(
                delta,
                finish,
                frame,
                state,
                current_sources,
                usage,
                &rag,
                &web,
            )],
            paced: false,
        }
    } else {
        // Internal workflow state update with nothing new to show.
        FrameOutput {
            chunks: Vec::new(),
            paced: false,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_chunk(
    text: String,
    finish: bool,
    frame: &AppFrame,
    state: &TurnState,
    sources: Option<Vec<SourceRecord>>,
    usage: Option<TokenUsage>,
    rag: &Option<Value>,
    web: &Option<Value>,
) -> ChatChunk {
    let latency = finish.then(|| state.latency_ms());
    if finish {
        tracing::info!(
            request_id = %frame.request_id,
            latency_ms = latency.unwrap_or_default(),
            usage = ?usage,
            "Request finished"
        );
    }

    ChatChunk {
        text,
        is_finish: finish,
        sources,
        request_id: frame.request_id.clone(),
        usage: if finish { usage } else { None },
        latency,
        rag_result: if finish { rag.clone() } else { None },
        web_result: if finish { web.clone() } else { None },
    }
}
