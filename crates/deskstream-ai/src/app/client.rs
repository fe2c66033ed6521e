//! Application client trait and request types

use crate::app::frame::AppFrame;
use crate::error::Result;

/// One conversation turn handed to the vendor call.
#[derive(Debug, Clone)]
pub struct AppRequest {
    pub query: String,
    /// Opaque multi-turn token, passed through untouched.
    pub session_id: Option<String>,
}

impl AppRequest {
    pub fn new(query: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            query: query.into(),
            session_id,
        }
    }
}

/// Blocking iterator over the frames of one vendor call.
pub type FrameIter = Box<dyn Iterator<Item = Result<AppFrame>> + Send>;

/// Client for the hosted LLM application service.
///
/// The vendor exposes a synchronous streaming call: `call` blocks while
/// connecting and the returned iterator blocks between frames, potentially
/// for the full duration of generation. Callers must keep it off the async
/// path; the bridge worker owns that concern.
pub trait AppClient: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &str;

    /// Start one streaming call and return its frame iterator.
    fn call(&self, request: &AppRequest) -> Result<FrameIter>;
}
