//! Transcript source (escalation stage) trait.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::types::transcript::{SourceKind, TranscriptRequest};
use crate::Error;

/// One strategy for obtaining a transcript.
///
/// The orchestrator holds an ordered list of sources and tries them one at a time,
/// cheapest first. A source returns raw text fragments; joining and whitespace
/// normalization happen in the orchestrator so every source is held to the same
/// output contract. Implementations must return promptly with `ErrorKind::Cancelled`
/// once `cancel` fires and must bound every network call or subprocess they make.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Source: Send + Sync {
    /// Which strategy this is, for logging and diagnostics.
    fn kind(&self) -> SourceKind;

    /// Make one attempt at fetching the transcript for `request`.
    ///
    /// Failures are not retried by the orchestrator; a source that wants retries
    /// must perform them internally.
    async fn attempt(
        &self,
        request: &TranscriptRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, Error>;
}
