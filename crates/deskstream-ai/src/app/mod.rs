//! Hosted application service - client trait, wire types and implementations

mod bailian;
mod client;
mod frame;
pub mod mock;

pub use bailian::BailianClient;
pub use client::{AppClient, AppRequest, FrameIter};
pub use frame::{
    AppFrame, AppOutput, AppUsage, ModelUsage, UNORDERED_SEQ_ID, WorkflowInnerMessage,
    WorkflowMessage,
};
