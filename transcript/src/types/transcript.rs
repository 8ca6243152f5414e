//! Types for transcript requests and results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{invalid_request, Error};

/// Language used when a request carries no usable preference.
pub const DEFAULT_LANGUAGE: &str = "en";

const VIDEO_REF_LEN: usize = 11;

/// The source that produced a transcript.
///
/// Diagnostic only: callers may log or expose it, but must not depend on which
/// source answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Cache,
    Library,
    Interpreter,
    Relay,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Cache => "cache",
            SourceKind::Library => "library",
            SourceKind::Interpreter => "interpreter",
            SourceKind::Relay => "relay",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated external video identifier.
///
/// The inbound boundary parses user input into a `VideoRef` before calling into the
/// core; the core itself treats the identifier as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoRef(String);

impl VideoRef {
    /// Accepts exactly 11 URL-safe characters (`A-Z a-z 0-9 _ -`).
    pub fn parse(value: &str) -> Result<Self, Error> {
        let valid = value.len() == VIDEO_REF_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(invalid_request(&format!("Invalid video reference: {value:?}")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for VideoRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A request to resolve the transcript of one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRequest {
    pub video_ref: String,
    /// Ordered language tags, most preferred first. Never empty.
    pub language_preference: Vec<String>,
}

impl TranscriptRequest {
    /// Create a request preferring the default language.
    pub fn new(video_ref: impl Into<String>) -> Self {
        Self {
            video_ref: video_ref.into(),
            language_preference: vec![DEFAULT_LANGUAGE.to_string()],
        }
    }

    /// Replace the language preference. Blank tags are dropped; an empty list falls
    /// back to the default language.
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let languages: Vec<String> = languages
            .into_iter()
            .map(|lang| lang.as_ref().trim().to_string())
            .filter(|lang| !lang.is_empty())
            .collect();

        self.language_preference = if languages.is_empty() {
            vec![DEFAULT_LANGUAGE.to_string()]
        } else {
            languages
        };
        self
    }

    pub fn primary_language(&self) -> &str {
        self.language_preference
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Cache key: `videoRef:primaryLanguage`.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.video_ref, self.primary_language())
    }

    /// Canonical watch URL handed to out-of-process fetchers.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_ref)
    }
}

impl From<VideoRef> for TranscriptRequest {
    fn from(video_ref: VideoRef) -> Self {
        TranscriptRequest::new(video_ref.into_inner())
    }
}

/// A successfully resolved transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptResult {
    /// Whitespace-normalized transcript text. Never empty.
    pub text: String,
    pub source_used: SourceKind,
}
