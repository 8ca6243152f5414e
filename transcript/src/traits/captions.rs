//! In-process caption library capability.

use async_trait::async_trait;

use crate::types::cue::Cue;
use crate::Error;

/// Anything that can list the caption cues of a video in a given language.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionFetcher: Send + Sync {
    async fn fetch_captions(&self, video_ref: &str, language: &str) -> Result<Vec<Cue>, Error>;
}
