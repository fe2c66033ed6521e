use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Sse, sse::Event},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;

use deskstream_ai::{INIT_REQUEST_ID, StreamEvent, TokenUsage};
use deskstream_storage::{ChatLog, ChatLogStorage};

use crate::api::{ApiResponse, state::AppState};

/// Pause between SSE events so bursts do not flood slow clients.
const EVENT_THROTTLE: Duration = Duration::from_millis(20);

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    30
}

// POST /api/ask
pub async fn ask_question(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    if request.question.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Question cannot be empty".to_string(),
        ));
    }

    tracing::info!(question = %request.question, "Received question");

    let mut events = state
        .engine
        .stream(request.question.clone(), request.session_id.clone());
    let storage = state.storage.clone();
    let mut record = TurnRecord::new(request.question, request.session_id);

    let stream = async_stream::stream! {
        while let Some(event) = events.next().await {
            record.absorb(&event);
            yield Ok(Event::default().json_data(&event).unwrap());
            tokio::time::sleep(EVENT_THROTTLE).await;
        }
        yield Ok::<_, Infallible>(Event::default().data("[DONE]"));

        // Persistence stays isolated from the already-delivered stream.
        if let Err(err) = record.save(&storage.chat_logs) {
            tracing::error!(error = %err, "Failed to save chat log");
        }
    };

    Ok(Sse::new(stream))
}

// GET /api/history
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<ApiResponse<Vec<ChatLog>>> {
    match state.storage.chat_logs.list_recent(query.limit) {
        Ok(logs) => Json(ApiResponse::ok(logs)),
        Err(e) => Json(ApiResponse::error(format!("Failed to list history: {}", e))),
    }
}

// DELETE /api/history/{id}
pub async fn delete_chat_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<ApiResponse<()>> {
    match state.storage.chat_logs.delete(&id) {
        Ok(true) => Json(ApiResponse::message("Chat log deleted successfully")),
        Ok(false) => Json(ApiResponse::error(format!("Chat log '{}' not found", id))),
        Err(e) => Json(ApiResponse::error(format!("Failed to delete chat log: {}", e))),
    }
}

/// Accumulates one turn's events into the record persisted after the
/// stream ends: full text, last non-empty sources, finishing usage/latency
/// and raw evidence, and the vendor request id once observed.
struct TurnRecord {
    question: String,
    session_id: Option<String>,
    request_id: Option<String>,
    text: String,
    sources: Option<Value>,
    usage: Option<TokenUsage>,
    latency: Option<u64>,
    rag_result: Option<Value>,
    web_result: Option<Value>,
}

impl TurnRecord {
    fn new(question: String, session_id: Option<String>) -> Self {
        Self {
            question,
            session_id,
            request_id: None,
            text: String::new(),
            sources: None,
            usage: None,
            latency: None,
            rag_result: None,
            web_result: None,
        }
    }

    fn absorb(&mut self, event: &StreamEvent) {
        let StreamEvent::Chunk(chunk) = event else {
            return;
        };

        self.text.push_str(&chunk.text);
        if let Some(sources) = &chunk.sources
            && !sources.is_empty()
        {
            self.sources = serde_json::to_value(sources).ok();
        }
        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }
        if chunk.latency.is_some() {
            self.latency = chunk.latency;
        }
        if chunk.rag_result.is_some() {
            self.rag_result = chunk.rag_result.clone();
        }
        if chunk.web_result.is_some() {
            self.web_result = chunk.web_result.clone();
        }
        if !chunk.request_id.is_empty() && chunk.request_id != INIT_REQUEST_ID {
            self.request_id = Some(chunk.request_id.clone());
        }
    }

    fn save(self, chat_logs: &ChatLogStorage) -> anyhow::Result<()> {
        // A turn that produced neither text nor sources is not worth a record.
        if self.text.is_empty() && self.sources.is_none() {
            return Ok(());
        }

        let request_id = self
            .request_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        tracing::info!(request_id = %request_id, "Saving chat log");

        let mut log = ChatLog::new(request_id, self.question);
        log.session_id = self.session_id;
        log.ai_response = self.text;
        log.sources = self.sources;
        log.metadata = Some(serde_json::json!({
            "usage": self.usage,
            "latency": self.latency,
            "rag_result": self.rag_result,
            "web_result": self.web_result,
        }));
        chat_logs.create(&log)
    }
}
