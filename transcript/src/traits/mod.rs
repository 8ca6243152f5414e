//! Capabilities the orchestrator and its sources depend on.

pub mod captions;
pub mod process;
pub mod source;
