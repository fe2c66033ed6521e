//! Deterministic mock application client for engine and bridge tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value;

use crate::app::client::{AppClient, AppRequest, FrameIter};
use crate::app::frame::AppFrame;
use crate::error::{ChatError, Result};

/// Scripted outcome of one vendor call attempt.
#[derive(Debug, Clone)]
pub enum MockCall {
    /// Connection-level failure: `call` itself returns an error.
    ConnectError(String),
    /// The call connects and replays the given steps.
    Frames(Vec<MockStep>),
}

/// One step of a scripted call.
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Yield a frame parsed from raw JSON.
    Frame(Value),
    /// Fail mid-stream after any previous frames were delivered.
    StreamError(String),
}

impl MockStep {
    pub fn frame(value: Value) -> Self {
        Self::Frame(value)
    }

    /// Plain cumulative-text frame, the common case in tests.
    pub fn text(text: &str) -> Self {
        Self::Frame(serde_json::json!({
            "request_id": "req-mock",
            "output": { "text": text, "finish_reason": "null" },
        }))
    }
}

/// Replays a fixed script, one `MockCall` per `call` invocation. Calls past
/// the end of the script fail, which makes unexpected retries visible in
/// tests.
pub struct MockAppClient {
    script: Mutex<VecDeque<MockCall>>,
}

impl MockAppClient {
    pub fn new(script: Vec<MockCall>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    /// Single successful call delivering the given steps.
    pub fn single(steps: Vec<MockStep>) -> Self {
        Self::new(vec![MockCall::Frames(steps)])
    }

    pub fn remaining_calls(&self) -> usize {
        self.script.lock().expect("script lock poisoned").len()
    }
}

impl AppClient for MockAppClient {
    fn name(&self) -> &str {
        "mock"
    }

    fn call(&self, _request: &AppRequest) -> Result<FrameIter> {
        let next = self
            .script
            .lock()
            .expect("script lock poisoned")
            .pop_front();

        match next {
            None => Err(ChatError::Stream("mock script exhausted".to_string())),
            Some(MockCall::ConnectError(message)) => Err(ChatError::Stream(message)),
            Some(MockCall::Frames(steps)) => {
                let iter = steps.into_iter().map(|step| -> Result<AppFrame> {
                    match step {
                        MockStep::Frame(value) => {
                            let frame: AppFrame = serde_json::from_value(value)?;
                            Ok(frame)
                        }
                        MockStep::StreamError(message) => Err(ChatError::Stream(message)),
                    }
                });
                Ok(Box::new(iter.collect::<Vec<_>>().into_iter()))
            }
        }
    }
}
