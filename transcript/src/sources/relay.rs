//! Relay fetcher: captions through third-party relay instances.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::*;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::directory::{normalize_endpoint, InstanceDirectory};
use crate::error::{cancelled, configuration_error, stage_error, Error, StageErrorKind};
use crate::http::{cancellable, get_json, get_text, BackoffPolicy, HttpClient, HttpClientBuilder};
use crate::subtitle;
use crate::traits::source::Source;
use crate::types::relay::CaptionTrack;
use crate::types::transcript::{SourceKind, TranscriptRequest};

/// Relays tried after the directory's own list.
pub const RELIABLE_EXTRA_INSTANCES: [&str; 3] = ["inv.nadeko.net", "yewtu.be", "inv.tux.pizza"];

#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Per-request timeout against a relay.
    pub timeout: Duration,
    /// Pause between failed endpoints. Its retry count also bounds transient retries
    /// against a single endpoint.
    pub backoff: BackoffPolicy,
    pub extra_instances: Vec<String>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8),
            backoff: BackoffPolicy::fixed(Duration::from_millis(500)),
            extra_instances: RELIABLE_EXTRA_INSTANCES
                .iter()
                .map(|domain| domain.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CaptionListing {
    #[serde(default)]
    captions: Vec<CaptionTrack>,
}

/// Last escalation stage: iterates relay endpoints in order until one yields a
/// non-empty transcript.
pub struct RelayFetcher {
    client: HttpClient,
    directory: Arc<InstanceDirectory>,
    settings: RelaySettings,
}

impl RelayFetcher {
    pub fn new(directory: Arc<InstanceDirectory>, settings: RelaySettings) -> Result<Self, Error> {
        let client = HttpClientBuilder::new()
            .with_timeout(settings.timeout)
            .with_retry_policy(settings.backoff.clone())
            .build()?;
        Ok(Self::with_client(client, directory, settings))
    }

    pub fn with_client(
        client: HttpClient,
        directory: Arc<InstanceDirectory>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            client,
            directory,
            settings,
        }
    }

    /// Directory instances first, then the extras, de-duplicated in order.
    pub async fn candidate_endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = Vec::new();
        let healthy = self.directory.healthy_instances().await;
        for endpoint in healthy
            .iter()
            .chain(self.settings.extra_instances.iter())
            .map(|domain| normalize_endpoint(domain))
        {
            if !endpoints.contains(&endpoint) {
                endpoints.push(endpoint);
            }
        }
        endpoints
    }

    /// Fetch the plain transcript text of `video_ref` from the first relay that has one.
    pub async fn fetch_via_relays(
        &self,
        video_ref: &str,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<String, Error> {
        let endpoints = cancellable(cancel, async { Ok(self.candidate_endpoints().await) }).await?;

        for (attempt, endpoint) in endpoints.iter().enumerate() {
            match cancellable(cancel, self.fetch_from(endpoint, video_ref, language)).await {
                Ok(text) => {
                    info!("Relay {} served transcript for {}", endpoint, video_ref);
                    return Ok(text);
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => debug!("Relay {} failed for {}: {}", endpoint, video_ref, e),
            }

            if attempt + 1 < endpoints.len() {
                let delay = self.settings.backoff.delay(attempt as u32);
                if !delay.is_zero() {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(cancelled()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        Err(stage_error(
            StageErrorKind::AllInstancesFailed,
            &format!("All {} relay instances failed", endpoints.len()),
        ))
    }

    async fn fetch_from(&self, endpoint: &str, video_ref: &str, language: &str) -> Result<String, Error> {
        let listing_url = format!("{}/api/v1/captions/{}", endpoint, video_ref);
        let listing: CaptionListing = get_json(&self.client, &listing_url).await?;

        let track = select_track(&listing.captions, language).ok_or_else(|| {
            stage_error(StageErrorKind::EmptyResult, "Relay listed no caption tracks")
        })?;
        debug!("Using {} caption track from {}", track.language_code, endpoint);

        let track_url = Url::parse(endpoint)
            .and_then(|base| base.join(&track.url))
            .map_err(|e| configuration_error(&format!("Invalid caption track URL: {e}")))?;
        let raw = get_text(&self.client, track_url.as_str()).await?;

        let text = subtitle::parse(&raw);
        if text.is_empty() {
            return Err(stage_error(
                StageErrorKind::EmptyResult,
                "Caption track contained no text",
            ));
        }
        Ok(text)
    }
}

/// The track matching `language`, else the first track.
fn select_track<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
    tracks
        .iter()
        .find(|track| track.language_code == language)
        .or_else(|| tracks.first())
}

#[async_trait]
impl Source for RelayFetcher {
    fn kind(&self) -> SourceKind {
        SourceKind::Relay
    }

    async fn attempt(
        &self,
        request: &TranscriptRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, Error> {
        let text = self
            .fetch_via_relays(&request.video_ref, request.primary_language(), cancel)
            .await?;
        Ok(vec![text])
    }
}
