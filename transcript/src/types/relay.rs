//! Types for the relay instance fleet.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One relay endpoint known to the instance directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayInstance {
    /// Base URL, e.g. `https://yewtu.be`.
    pub endpoint: String,
    pub last_known_healthy: DateTime<Utc>,
}

/// Immutable list of relay instances as of `fetched_at`.
///
/// The directory swaps whole snapshots; a snapshot is never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDirectorySnapshot {
    pub instances: Vec<RelayInstance>,
    pub fetched_at: DateTime<Utc>,
}

impl InstanceDirectorySnapshot {
    pub fn new(endpoints: Vec<String>, fetched_at: DateTime<Utc>) -> Self {
        let instances = endpoints
            .into_iter()
            .map(|endpoint| RelayInstance {
                endpoint,
                last_known_healthy: fetched_at,
            })
            .collect();
        Self {
            instances,
            fetched_at,
        }
    }

    /// True while the snapshot is younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.fetched_at) < ttl,
            // A TTL too large to represent never expires.
            Err(_) => true,
        }
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.instances
            .iter()
            .map(|instance| instance.endpoint.clone())
            .collect()
    }
}

/// Caption track advertised by a relay instance for one video.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub language_code: String,
    /// Track location, usually relative to the relay endpoint.
    pub url: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_freshness_respects_ttl() {
        let fetched_at = Utc::now();
        let snapshot = InstanceDirectorySnapshot::new(vec!["https://a.example".into()], fetched_at);
        let ttl = Duration::from_secs(3600);

        assert!(snapshot.is_fresh(ttl, fetched_at + chrono::Duration::minutes(59)));
        assert!(!snapshot.is_fresh(ttl, fetched_at + chrono::Duration::minutes(61)));
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let fetched_at = Utc::now();
        let snapshot = InstanceDirectorySnapshot::new(vec![], fetched_at);
        assert!(!snapshot.is_fresh(Duration::ZERO, fetched_at));
    }

    #[test]
    fn test_caption_track_deserializes_relay_shape() {
        let track: CaptionTrack = serde_json::from_str(
            r#"{"label":"English","languageCode":"en","url":"/api/v1/captions/abc?label=English"}"#,
        )
        .unwrap();
        assert_eq!(track.language_code, "en");
        assert_eq!(track.url, "/api/v1/captions/abc?label=English");
        assert_eq!(track.label.as_deref(), Some("English"));
    }
}
