//! Error types for the `transcript` crate.
//!
//! Follows the platform pattern of a root `Error` struct holding an error kind tree
//! and an optional source for error chaining. Only `NotAvailable`, `Cancelled` and
//! `InvalidRequest` are expected to escape `TranscriptService::resolve_transcript`;
//! every other kind is produced by a single source and converted into an escalation
//! decision by the orchestrator.

use std::error::Error as StdError;
use std::fmt;

use crate::types::transcript::SourceKind;

/// Top-level error type for the transcript crate.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in transcript acquisition.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// A single source failed; the orchestrator escalates to the next one.
    Stage(StageErrorKind),
    /// The instance directory upstream could not be used. Always recovered internally.
    Directory(DirectoryErrorKind),
    /// Transport-level failure talking to an upstream.
    Http(HttpErrorKind),
    /// Every source was tried and none produced a transcript.
    NotAvailable(Vec<StageFailure>),
    /// The caller's cancellation token fired before a transcript was produced.
    Cancelled,
    /// The request could not be attempted at all (e.g. empty video reference).
    InvalidRequest,
    /// A client or runner could not be constructed from the given settings.
    Configuration,
}

/// Reasons a single source attempt fails.
#[derive(Debug, PartialEq)]
pub enum StageErrorKind {
    EmptyResult,
    /// The upstream answered with an explicit error report.
    Upstream,
    InvalidResponse,
    Spawn,
    ExitStatus,
    Timeout,
    AllInstancesFailed,
}

/// Reasons the instance directory upstream could not be used.
#[derive(Debug, PartialEq)]
pub enum DirectoryErrorKind {
    Unavailable,
    NoHealthyInstances,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Status(u16),
    Timeout,
    Network,
}

/// Diagnostic record of one failed source, retained for the terminal error.
#[derive(Debug, Clone, PartialEq)]
pub struct StageFailure {
    pub source: SourceKind,
    pub message: String,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        self.error_kind == ErrorKind::Cancelled
    }

    pub fn is_not_available(&self) -> bool {
        matches!(self.error_kind, ErrorKind::NotAvailable(_))
    }

    /// Per-source diagnostics carried by a `NotAvailable` error.
    pub fn failures(&self) -> &[StageFailure] {
        match &self.error_kind {
            ErrorKind::NotAvailable(failures) => failures,
            _ => &[],
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Stage(kind) => write!(f, "Source error: {:?}", kind)?,
            ErrorKind::Directory(kind) => write!(f, "Instance directory error: {:?}", kind)?,
            ErrorKind::Http(HttpErrorKind::Status(code)) => {
                write!(f, "HTTP error: unexpected status {}", code)?
            }
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind)?,
            ErrorKind::NotAvailable(failures) => {
                write!(f, "Transcript not available (all sources failed)")?;
                if !failures.is_empty() {
                    let joined = failures
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ");
                    write!(f, ": {}", joined)?;
                }
                return Ok(());
            }
            ErrorKind::Cancelled => return write!(f, "Transcript request cancelled"),
            ErrorKind::InvalidRequest => write!(f, "Invalid transcript request")?,
            ErrorKind::Configuration => write!(f, "Invalid configuration")?,
        }
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_timeout() {
            ErrorKind::Http(HttpErrorKind::Timeout)
        } else if let Some(status) = err.status() {
            ErrorKind::Http(HttpErrorKind::Status(status.as_u16()))
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else if err.is_decode() {
            ErrorKind::Stage(StageErrorKind::InvalidResponse)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            other => Error {
                source: Some(Box::new(other)),
                error_kind: ErrorKind::Http(HttpErrorKind::Network),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Stage(StageErrorKind::InvalidResponse),
        }
    }
}

/// Helper function to create source (stage) errors.
pub fn stage_error(kind: StageErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Stage(kind),
    }
}

/// Helper function to create instance directory errors.
pub fn directory_error(kind: DirectoryErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Directory(kind),
    }
}

/// Helper function to create an error for a non-success HTTP response.
pub fn status_error(status: u16, url: &str) -> Error {
    Error {
        source: Some(format!("GET {} returned {}", url, status).into()),
        error_kind: ErrorKind::Http(HttpErrorKind::Status(status)),
    }
}

/// Helper function to create the terminal error once every source has failed.
pub fn not_available(failures: Vec<StageFailure>) -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::NotAvailable(failures),
    }
}

/// Helper function to create a cancellation error.
pub fn cancelled() -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::Cancelled,
    }
}

/// Helper function to create invalid request errors.
pub fn invalid_request(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::InvalidRequest,
    }
}

/// Helper function to create configuration errors.
pub fn configuration_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Configuration,
    }
}
