//! Transcript orchestrator: the single entry point of the crate.

use log::*;
use tokio_util::sync::CancellationToken;

use crate::cache::TranscriptCache;
use crate::error::{cancelled, invalid_request, not_available, Error, StageFailure};
use crate::traits::source::Source;
use crate::types::transcript::{SourceKind, TranscriptRequest, TranscriptResult};

/// Resolves transcripts through an ordered escalation chain behind a cache.
///
/// Sources are tried strictly one after another; the first one producing non-empty
/// text wins and is written through to the cache. Failures are collected and only
/// surfaced when every source has failed.
pub struct TranscriptService {
    sources: Vec<Box<dyn Source>>,
    cache: TranscriptCache,
}

impl TranscriptService {
    pub fn new(sources: Vec<Box<dyn Source>>, cache: TranscriptCache) -> Self {
        Self { sources, cache }
    }

    pub fn cache(&self) -> &TranscriptCache {
        &self.cache
    }

    /// Kinds of the configured sources, in escalation order.
    pub fn source_kinds(&self) -> Vec<SourceKind> {
        self.sources.iter().map(|source| source.kind()).collect()
    }

    /// Resolve the transcript for `request`.
    ///
    /// Fails with `NotAvailable` once every source failed, `Cancelled` when `cancel`
    /// fires first, and `InvalidRequest` for an empty video reference. The cache is
    /// only written on success.
    pub async fn resolve_transcript(
        &self,
        request: &TranscriptRequest,
        cancel: &CancellationToken,
    ) -> Result<TranscriptResult, Error> {
        if request.video_ref.trim().is_empty() {
            return Err(invalid_request("Video reference must not be empty"));
        }

        let key = request.cache_key();
        if let Some(text) = self.cache.get(&key) {
            debug!("Transcript cache hit for {}", key);
            return Ok(TranscriptResult {
                text,
                source_used: SourceKind::Cache,
            });
        }

        let mut failures: Vec<StageFailure> = Vec::new();
        for source in &self.sources {
            if cancel.is_cancelled() {
                info!("Transcript request for {} cancelled", key);
                return Err(cancelled());
            }

            let kind = source.kind();
            debug!("Trying {} source for {}", kind, key);
            match source.attempt(request, cancel).await {
                Ok(fragments) => {
                    let text = normalize(&fragments);
                    if text.is_empty() {
                        warn!("{} source returned an empty transcript for {}", kind, key);
                        failures.push(StageFailure {
                            source: kind,
                            message: "empty transcript".to_string(),
                        });
                        continue;
                    }

                    info!("Resolved transcript for {} via {} source", key, kind);
                    self.cache.put(key, text.clone());
                    return Ok(TranscriptResult {
                        text,
                        source_used: kind,
                    });
                }
                Err(e) if e.is_cancelled() => {
                    info!("Transcript request for {} cancelled during {} source", key, kind);
                    return Err(e);
                }
                Err(e) => {
                    warn!("{} source failed for {}: {}", kind, key, e);
                    failures.push(StageFailure {
                        source: kind,
                        message: e.to_string(),
                    });
                }
            }
        }

        error!(
            "Transcript not available for {} after {} sources",
            key,
            failures.len()
        );
        Err(not_available(failures))
    }
}

/// Join fragments with single spaces, collapsing all whitespace runs.
fn normalize(fragments: &[String]) -> String {
    fragments
        .iter()
        .flat_map(|fragment| fragment.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}
