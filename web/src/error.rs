use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

use transcript::{Error as TranscriptError, ErrorKind};

#[derive(Debug)]
pub struct Error(TranscriptError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{}", self.0)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self.0.error_kind {
            ErrorKind::InvalidRequest => {
                debug!("Rejected transcript request: {}", self.0);
                (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response()
            }
            ErrorKind::NotAvailable(_) => {
                (StatusCode::NOT_FOUND, "TRANSCRIPT NOT AVAILABLE").into_response()
            }
            ErrorKind::Cancelled => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE UNAVAILABLE").into_response()
            }
            _ => {
                error!("Unexpected transcript error: {}", self.0);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<TranscriptError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcript::error::{cancelled, invalid_request, not_available, stage_error, StageErrorKind};

    #[test]
    fn test_error_kinds_map_to_status_codes() {
        let cases = [
            (invalid_request("bad id"), StatusCode::BAD_REQUEST),
            (not_available(vec![]), StatusCode::NOT_FOUND),
            (cancelled(), StatusCode::SERVICE_UNAVAILABLE),
            (
                stage_error(StageErrorKind::Timeout, "leaked"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(Error::from(err).into_response().status(), expected);
        }
    }
}
