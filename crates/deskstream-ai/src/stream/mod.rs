//! Streaming response normalization - bridge, parsing, smoothing, events

mod bridge;
mod engine;
mod event;
mod extract;
mod smooth;
mod sources;
mod state;
mod usage;

pub use bridge::{BridgeConfig, BridgeMessage, spawn_bridge};
pub use engine::{EventStream, StreamEngine};
pub use event::{ChatChunk, ErrorEvent, INIT_REQUEST_ID, StreamEvent};
pub use extract::{ExtractedFields, extract_balanced_field, extract_fields, extract_string_field};
pub use smooth::{SMOOTH_THRESHOLD, delta_after, split_delta};
pub use sources::{SourceKind, SourceRecord, collect_sources};
pub use state::TurnState;
pub use usage::TokenUsage;
