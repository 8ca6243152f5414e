//! Resilient transcript acquisition for external videos.
//!
//! A single call, [`TranscriptService::resolve_transcript`], hides a chain of
//! unreliable upstreams behind a cache:
//! - an in-process caption library (cheapest)
//! - a script run by an external interpreter
//! - a rotating pool of third-party relay instances, chosen from a health directory
//!
//! Each source sits behind the [`traits::source::Source`] trait, so the chain can be
//! assembled, reordered or stubbed without touching the orchestrator.

pub mod cache;
pub mod directory;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod sources;
pub mod subtitle;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use cache::TranscriptCache;
pub use error::{Error, ErrorKind};
pub use orchestrator::TranscriptService;
pub use types::transcript::{SourceKind, TranscriptRequest, TranscriptResult, VideoRef};
