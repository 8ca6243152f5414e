//! HTTP client building with middleware, plus request helpers shared by sources.

mod backoff;
mod client;

use std::future::Future;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

pub use backoff::BackoffPolicy;
pub use client::{HttpClient, HttpClientBuilder};

use crate::error::{cancelled, status_error, Error};

/// Race `fut` against `cancel`, preferring cancellation when both are ready.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(cancelled()),
        result = fut => result,
    }
}

/// GET `url` and return the body, failing on any non-success status.
pub(crate) async fn get_text(client: &HttpClient, url: &str) -> Result<String, Error> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status.as_u16(), url));
    }
    Ok(response.text().await?)
}

/// GET `url` and decode the body as JSON, failing on any non-success status.
pub(crate) async fn get_json<T: DeserializeOwned>(client: &HttpClient, url: &str) -> Result<T, Error> {
    let body = get_text(client, url).await?;
    Ok(serde_json::from_str(&body)?)
}
