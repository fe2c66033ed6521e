//! Bailian application completion client.
//!
//! Talks to the app-completion endpoint over SSE. The call is blocking by
//! design: frames are read off the response body with a buffered reader,
//! which matches the vendor SDK shape the bridge worker expects.

use std::io::{BufRead, BufReader, Lines};
use std::time::Duration;

use serde_json::json;

use crate::app::client::{AppClient, AppRequest, FrameIter};
use crate::app::frame::AppFrame;
use crate::error::{ChatError, Result};
use crate::http_client::{DEFAULT_CALL_TIMEOUT, build_blocking_client};

const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com";

// Truncate error bodies to prevent leaking large or sensitive responses.
const MAX_ERROR_BODY: usize = 512;

/// Client for a hosted Bailian application (agent) endpoint.
pub struct BailianClient {
    http: reqwest::blocking::Client,
    api_key: String,
    app_id: String,
    base_url: String,
}

impl BailianClient {
    pub fn new(api_key: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            http: build_blocking_client(DEFAULT_CALL_TIMEOUT),
            api_key: api_key.into(),
            app_id: app_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set custom base URL (for API-compatible or regional endpoints)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = build_blocking_client(timeout);
        self
    }
}

impl AppClient for BailianClient {
    fn name(&self) -> &str {
        "bailian"
    }

    fn call(&self, request: &AppRequest) -> Result<FrameIter> {
        let body = json!({
            "input": {
                "prompt": request.query,
                "session_id": request.session_id,
            },
            "parameters": {
                "flow_stream_mode": "message_format",
                "incremental_output": true,
            },
        });

        let response = self
            .http
            .post(format!(
                "{}/api/v1/apps/{}/completion",
                self.base_url, self.app_id
            ))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-DashScope-SSE", "enable")
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().unwrap_or_default();
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
                message.push_str("... [truncated]");
            }
            return Err(ChatError::Vendor {
                code: status.as_u16().to_string(),
                message,
            });
        }

        Ok(Box::new(SseFrames {
            lines: BufReader::new(response).lines(),
        }))
    }
}

/// Iterator over `data:` payloads of the SSE body, one frame each.
struct SseFrames {
    lines: Lines<BufReader<reqwest::blocking::Response>>,
}

impl Iterator for SseFrames {
    type Item = Result<AppFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(ChatError::Io(err))),
            };

            // SSE fields other than `data:` (id:, event:, comments) carry no
            // frame payload.
            let Some(data) = line
                .strip_prefix("data:")
                .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
            else {
                continue;
            };

            if data.is_empty() {
                continue;
            }

            match serde_json::from_str::<AppFrame>(data) {
                Ok(frame) => return Some(Ok(frame)),
                Err(err) => {
                    tracing::debug!(error = %err, "Skipping unparseable stream frame");
                    continue;
                }
            }
        }
    }
}
