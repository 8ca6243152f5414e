//! Primary library source: an in-process caption fetch, the cheapest strategy.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use log::*;
use scraper::{ElementRef, Html, Selector};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{configuration_error, stage_error, Error, StageErrorKind};
use crate::http::{cancellable, get_text, HttpClient, HttpClientBuilder};
use crate::traits::captions::CaptionFetcher;
use crate::traits::source::Source;
use crate::types::cue::Cue;
use crate::types::transcript::{SourceKind, TranscriptRequest};

/// Video provider origin serving the timed-text endpoint.
pub const DEFAULT_CAPTION_BASE_URL: &str = "https://www.youtube.com";

/// Settings for the in-process caption library.
#[derive(Debug, Clone)]
pub struct LibrarySettings {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CAPTION_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Caption fetcher backed by the provider's timed-text XML endpoint.
pub struct TimedTextClient {
    client: HttpClient,
    base_url: String,
}

impl TimedTextClient {
    pub fn new(settings: &LibrarySettings) -> Result<Self, Error> {
        let client = HttpClientBuilder::new()
            .with_timeout(settings.timeout)
            .build()?;
        Ok(Self::with_client(client, &settings.base_url))
    }

    pub fn with_client(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CaptionFetcher for TimedTextClient {
    async fn fetch_captions(&self, video_ref: &str, language: &str) -> Result<Vec<Cue>, Error> {
        let url = Url::parse_with_params(
            &format!("{}/api/timedtext", self.base_url),
            &[("v", video_ref), ("lang", language)],
        )
        .map_err(|e| configuration_error(&format!("Invalid caption base URL: {e}")))?;

        debug!("Fetching timed text for {video_ref} ({language})");
        let body = get_text(&self.client, url.as_str()).await?;
        Ok(parse_timed_text(&body))
    }
}

static TEXT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("text").expect("static selector is valid"));

/// Parse a `<transcript><text start=".." dur="..">..</text></transcript>` document.
///
/// Elements without text are skipped; anything that is not a `<text>` element is
/// ignored, so an empty or unexpected body yields no cues.
pub fn parse_timed_text(xml: &str) -> Vec<Cue> {
    let document = Html::parse_document(xml);
    document
        .select(&TEXT_SELECTOR)
        .filter_map(|element| {
            let text = cue_text(element);
            let text = text.trim();
            if text.is_empty() {
                return None;
            }

            let attr = |name: &str| {
                element
                    .value()
                    .attr(name)
                    .and_then(|value| value.parse::<f64>().ok())
                    .unwrap_or(0.0)
            };
            Some(Cue::new(text, attr("start"), attr("dur")))
        })
        .collect()
}

/// The endpoint escapes cue text twice: the document parser removes the outer
/// layer, and the payload is then parsed as a fragment of its own, which resolves
/// the inner entities and drops formatting tags.
fn cue_text(element: ElementRef) -> String {
    let payload: String = element.text().collect();
    Html::parse_fragment(&payload).root_element().text().collect()
}

/// First escalation stage: asks the in-process caption library for the primary
/// language only and is never retried.
pub struct LibrarySource {
    fetcher: Box<dyn CaptionFetcher>,
}

impl LibrarySource {
    pub fn new(fetcher: Box<dyn CaptionFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Source for LibrarySource {
    fn kind(&self) -> SourceKind {
        SourceKind::Library
    }

    async fn attempt(
        &self,
        request: &TranscriptRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, Error> {
        let cues = cancellable(
            cancel,
            self.fetcher
                .fetch_captions(&request.video_ref, request.primary_language()),
        )
        .await?;

        let fragments: Vec<String> = cues
            .into_iter()
            .map(|cue| cue.text)
            .filter(|text| !text.trim().is_empty())
            .collect();

        if fragments.is_empty() {
            return Err(stage_error(
                StageErrorKind::EmptyResult,
                "Caption library returned no cues",
            ));
        }
        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, HttpErrorKind};
    use crate::traits::captions::MockCaptionFetcher;
    use mockito::{Matcher, Server};

    const TIMED_TEXT: &str = r##"<?xml version="1.0" encoding="utf-8" ?><transcript>
<text start="0.5" dur="1.25">Hello &amp;amp; welcome</text>
<text start="1.75" dur="2">it&amp;#39;s
a test</text>
<text start="4" dur="1"></text>
<text start="5" dur="1">&lt;font color="#E5E5E5"&gt;&amp;#x41;&amp;#66;&lt;/font&gt; &amp;unknown;</text>
</transcript>"##;

    #[test]
    fn test_parse_timed_text_extracts_cues_and_decodes_entities() {
        let cues = parse_timed_text(TIMED_TEXT);

        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0], Cue::new("Hello & welcome", 0.5, 1.25));
        assert_eq!(cues[1].text, "it's\na test");
        assert_eq!(cues[1].start, 1.75);
        assert_eq!(cues[2].text, "AB &unknown;");
    }

    #[test]
    fn test_parse_timed_text_unescapes_each_layer_once() {
        let cues = parse_timed_text(
            r#"<transcript><text start="1" dur="2">I &amp;amp;lt;3 Rust</text><text start="3" dur="1">I &amp;lt;3 Rust</text></transcript>"#,
        );

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "I &lt;3 Rust");
        assert_eq!(cues[1].text, "I <3 Rust");
    }

    #[test]
    fn test_parse_timed_text_defaults_missing_timing() {
        let cues = parse_timed_text(r#"<transcript><text start="soon">hi</text></transcript>"#);

        assert_eq!(cues, vec![Cue::new("hi", 0.0, 0.0)]);
    }

    #[test]
    fn test_parse_timed_text_tolerates_garbage() {
        assert!(parse_timed_text("").is_empty());
        assert!(parse_timed_text("<html>blocked</html>").is_empty());
    }

    #[tokio::test]
    async fn test_timed_text_client_queries_video_and_language() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/timedtext")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("v".into(), "abc123XYZ_-".into()),
                Matcher::UrlEncoded("lang".into(), "en".into()),
            ]))
            .with_status(200)
            .with_body(TIMED_TEXT)
            .create_async()
            .await;
        let client = TimedTextClient::new(&LibrarySettings {
            base_url: server.url(),
            ..LibrarySettings::default()
        })
        .unwrap();

        let cues = client.fetch_captions("abc123XYZ_-", "en").await.unwrap();

        assert_eq!(cues.len(), 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_timed_text_client_reports_error_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/timedtext")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;
        let client = TimedTextClient::new(&LibrarySettings {
            base_url: server.url(),
            ..LibrarySettings::default()
        })
        .unwrap();

        let err = client.fetch_captions("abc123XYZ_-", "en").await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Http(HttpErrorKind::Status(429)));
    }

    #[tokio::test]
    async fn test_library_source_returns_cue_texts_for_primary_language() {
        let mut fetcher = MockCaptionFetcher::new();
        fetcher
            .expect_fetch_captions()
            .withf(|video_ref, language| video_ref == "abc123XYZ_-" && language == "de")
            .times(1)
            .returning(|_, _| Ok(vec![Cue::new("Hallo", 0.0, 1.0), Cue::new(" ", 1.0, 1.0), Cue::new("Welt", 1.0, 1.0)]));
        let source = LibrarySource::new(Box::new(fetcher));
        let request = TranscriptRequest::new("abc123XYZ_-").with_languages(["de", "en"]);

        let fragments = source
            .attempt(&request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(fragments, vec!["Hallo", "Welt"]);
    }

    #[tokio::test]
    async fn test_library_source_treats_empty_result_as_failure() {
        let mut fetcher = MockCaptionFetcher::new();
        fetcher
            .expect_fetch_captions()
            .returning(|_, _| Ok(Vec::new()));
        let source = LibrarySource::new(Box::new(fetcher));

        let err = source
            .attempt(&TranscriptRequest::new("abc123XYZ_-"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Stage(StageErrorKind::EmptyResult));
    }

    #[tokio::test]
    async fn test_library_source_honors_cancellation() {
        let mut fetcher = MockCaptionFetcher::new();
        fetcher
            .expect_fetch_captions()
            .returning(|_, _| Ok(vec![Cue::new("too late", 0.0, 1.0)]));
        let source = LibrarySource::new(Box::new(fetcher));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = source
            .attempt(&TranscriptRequest::new("abc123XYZ_-"), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
    }
}
