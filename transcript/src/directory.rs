//! Directory of healthy relay instances.
//!
//! Keeps a time-bounded snapshot of relay endpoints fetched from a public directory
//! service. The directory never leaves the relay fetcher without candidates: when a
//! refresh fails it serves the previous snapshot, however stale, and before any
//! snapshot exists it serves a static list of known-reasonable endpoints.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use log::*;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{directory_error, DirectoryErrorKind, Error, ErrorKind};
use crate::http::{get_json, BackoffPolicy, HttpClient, HttpClientBuilder};
use crate::types::relay::InstanceDirectorySnapshot;

/// Public directory listing relay instances, sorted by health.
pub const DEFAULT_DIRECTORY_URL: &str = "https://api.invidious.io/instances.json?sort_by=health";

/// Served when the directory has never been reachable.
pub const STATIC_FALLBACK_INSTANCES: [&str; 7] = [
    "inv.nadeko.net",
    "yewtu.be",
    "inv.perditum.com",
    "invidious.nerdvpn.de",
    "invidious.f5.si",
    "inv.tux.pizza",
    "vid.puffyan.us",
];

/// Only instances advertising this transport are kept.
const SUPPORTED_TRANSPORT: &str = "https";

/// Instance directory settings.
#[derive(Debug, Clone)]
pub struct DirectorySettings {
    /// Directory listing URL.
    pub url: String,
    /// Timeout for the listing request.
    pub timeout: Duration,
    /// Age after which a snapshot is refreshed.
    pub ttl: Duration,
    /// Upper bound on instances kept from one listing.
    pub max_instances: usize,
    /// Endpoints served when no snapshot was ever obtained.
    pub fallback_instances: Vec<String>,
    /// Retries of the listing request on transient failures.
    pub retry: BackoffPolicy,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_DIRECTORY_URL.to_string(),
            timeout: Duration::from_secs(3),
            ttl: Duration::from_secs(60 * 60),
            max_instances: 8,
            fallback_instances: STATIC_FALLBACK_INSTANCES
                .iter()
                .map(|domain| domain.to_string())
                .collect(),
            retry: BackoffPolicy::none(),
        }
    }
}

/// Metadata object of one `[domain, metadata]` listing entry. Unused fields are ignored.
#[derive(Debug, Deserialize)]
struct InstanceMetadata {
    #[serde(rename = "type", default)]
    transport: Option<String>,
}

/// Owner of the relay instance snapshot.
///
/// Readers get an `Arc` to an immutable snapshot; a refresh swaps the whole
/// snapshot. Refreshes are single-flight: concurrent callers that find the snapshot
/// stale wait for the in-progress refresh and then re-check freshness.
pub struct InstanceDirectory {
    client: HttpClient,
    settings: DirectorySettings,
    snapshot: RwLock<Option<Arc<InstanceDirectorySnapshot>>>,
    refresh_lock: Mutex<()>,
}

impl InstanceDirectory {
    pub fn new(settings: DirectorySettings) -> Result<Self, Error> {
        let client = HttpClientBuilder::new()
            .with_timeout(settings.timeout)
            .with_retry_policy(settings.retry.clone())
            .build()?;
        Ok(Self::with_client(client, settings))
    }

    pub fn with_client(client: HttpClient, settings: DirectorySettings) -> Self {
        Self {
            client,
            settings,
            snapshot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// The current snapshot, if one was ever fetched.
    pub fn snapshot(&self) -> Option<Arc<InstanceDirectorySnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Ordered relay endpoints believed to be healthy.
    ///
    /// Never empty as long as a snapshot exists or the fallback list is non-empty.
    pub async fn healthy_instances(&self) -> Vec<String> {
        if let Some(snapshot) = self.fresh_snapshot() {
            return snapshot.endpoints();
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(snapshot) = self.fresh_snapshot() {
            debug!("Instance directory was refreshed by a concurrent caller");
            return snapshot.endpoints();
        }

        match self.fetch_instances().await {
            Ok(endpoints) => {
                info!("Refreshed relay instance directory with {} instances", endpoints.len());
                let snapshot = Arc::new(InstanceDirectorySnapshot::new(endpoints, Utc::now()));
                *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) =
                    Some(Arc::clone(&snapshot));
                snapshot.endpoints()
            }
            Err(e) => {
                warn!("Failed to update relay instance directory: {}", e);
                match self.snapshot() {
                    Some(stale) => {
                        debug!("Serving stale instance snapshot from {}", stale.fetched_at);
                        stale.endpoints()
                    }
                    None => self
                        .settings
                        .fallback_instances
                        .iter()
                        .map(|domain| normalize_endpoint(domain))
                        .collect(),
                }
            }
        }
    }

    fn fresh_snapshot(&self) -> Option<Arc<InstanceDirectorySnapshot>> {
        self.snapshot()
            .filter(|snapshot| snapshot.is_fresh(self.settings.ttl, Utc::now()))
    }

    async fn fetch_instances(&self) -> Result<Vec<String>, Error> {
        let listing: Vec<(String, InstanceMetadata)> =
            get_json(&self.client, &self.settings.url)
                .await
                .map_err(|e| Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::Directory(DirectoryErrorKind::Unavailable),
                })?;

        let endpoints: Vec<String> = listing
            .into_iter()
            .filter(|(_, metadata)| metadata.transport.as_deref() == Some(SUPPORTED_TRANSPORT))
            .map(|(domain, _)| normalize_endpoint(&domain))
            .take(self.settings.max_instances)
            .collect();

        if endpoints.is_empty() {
            return Err(directory_error(
                DirectoryErrorKind::NoHealthyInstances,
                "Directory listed no instances with a supported transport",
            ));
        }
        Ok(endpoints)
    }
}

/// Turn a bare domain or URL into a base URL without a trailing slash.
pub fn normalize_endpoint(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Server, ServerGuard};

    fn settings_for(server: &ServerGuard) -> DirectorySettings {
        DirectorySettings {
            url: format!("{}/instances.json", server.url()),
            ..DirectorySettings::default()
        }
    }

    fn listing(count: usize) -> String {
        let entries: Vec<serde_json::Value> = (0..count)
            .map(|i| serde_json::json!([format!("relay{i}.example"), {"type": "https", "uri": "x"}]))
            .collect();
        serde_json::Value::Array(entries).to_string()
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("yewtu.be"), "https://yewtu.be");
        assert_eq!(normalize_endpoint("https://yewtu.be/"), "https://yewtu.be");
        assert_eq!(normalize_endpoint("http://127.0.0.1:8080"), "http://127.0.0.1:8080");
    }

    #[tokio::test]
    async fn test_unreachable_directory_without_snapshot_serves_static_list() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/instances.json")
            .with_status(503)
            .create_async()
            .await;
        let directory = InstanceDirectory::new(settings_for(&server)).unwrap();

        let instances = directory.healthy_instances().await;

        assert!(!instances.is_empty());
        assert_eq!(instances.len(), STATIC_FALLBACK_INSTANCES.len());
        assert_eq!(instances[0], "https://inv.nadeko.net");
        assert!(directory.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_transient_listing_failure_is_retried_before_fallback() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/instances.json")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;
        let settings = DirectorySettings {
            retry: BackoffPolicy::fixed(Duration::ZERO).with_max_retries(2),
            ..settings_for(&server)
        };
        let directory = InstanceDirectory::new(settings).unwrap();

        let instances = directory.healthy_instances().await;

        assert_eq!(instances.len(), STATIC_FALLBACK_INSTANCES.len());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_listing_serves_static_list() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/instances.json")
            .with_status(200)
            .with_body("{\"not\": \"a list\"}")
            .create_async()
            .await;
        let directory = InstanceDirectory::new(settings_for(&server)).unwrap();

        let instances = directory.healthy_instances().await;
        assert_eq!(instances.len(), STATIC_FALLBACK_INSTANCES.len());
    }

    #[tokio::test]
    async fn test_refresh_filters_transport_and_bounds_prefix() {
        let mut server = Server::new_async().await;
        let body = serde_json::json!([
            ["onion.example", {"type": "onion"}],
            ["first.example", {"type": "https"}],
            ["nometa.example", {}],
            ["second.example", {"type": "https"}],
            ["third.example", {"type": "https"}]
        ])
        .to_string();
        let _mock = server
            .mock("GET", "/instances.json")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        let settings = DirectorySettings {
            max_instances: 2,
            ..settings_for(&server)
        };
        let directory = InstanceDirectory::new(settings).unwrap();

        let instances = directory.healthy_instances().await;

        assert_eq!(
            instances,
            vec!["https://first.example", "https://second.example"]
        );
        assert!(directory.snapshot().is_some());
    }

    #[tokio::test]
    async fn test_fresh_snapshot_is_served_without_network() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/instances.json")
            .with_status(200)
            .with_body(listing(3))
            .expect(1)
            .create_async()
            .await;
        let directory = InstanceDirectory::new(settings_for(&server)).unwrap();

        let first = directory.healthy_instances().await;
        let second = directory.healthy_instances().await;

        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_listing_without_supported_instances_is_a_failed_refresh() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/instances.json")
            .with_status(200)
            .with_body(serde_json::json!([["a.onion", {"type": "onion"}]]).to_string())
            .create_async()
            .await;
        let directory = InstanceDirectory::new(settings_for(&server)).unwrap();

        let instances = directory.healthy_instances().await;

        assert_eq!(instances.len(), STATIC_FALLBACK_INSTANCES.len());
        assert!(directory.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_prefers_stale_snapshot_over_static_list() {
        let mut server = Server::new_async().await;
        let ok = server
            .mock("GET", "/instances.json")
            .with_status(200)
            .with_body(listing(2))
            .create_async()
            .await;
        let settings = DirectorySettings {
            ttl: Duration::ZERO,
            ..settings_for(&server)
        };
        let directory = InstanceDirectory::new(settings).unwrap();

        let fresh = directory.healthy_instances().await;
        assert_eq!(fresh, vec!["https://relay0.example", "https://relay1.example"]);

        ok.remove_async().await;
        let failing = server
            .mock("GET", "/instances.json")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let stale = directory.healthy_instances().await;
        assert_eq!(stale, fresh);
        failing.assert_async().await;
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/instances.json")
            .with_status(200)
            .with_body(listing(4))
            .expect(1)
            .create_async()
            .await;
        let directory = Arc::new(InstanceDirectory::new(settings_for(&server)).unwrap());

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let directory = Arc::clone(&directory);
                tokio::spawn(async move { directory.healthy_instances().await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().len(), 4);
        }
        mock.assert_async().await;
    }
}
