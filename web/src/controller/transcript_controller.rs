use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use log::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::controller::ApiResponse;
use crate::params::transcript::TranscriptParams;
use crate::{AppState, Error};
use transcript::{TranscriptRequest, VideoRef};

/// Transcript of one video.
#[derive(Debug, Serialize, ToSchema)]
pub struct TranscriptResponse {
    pub video_id: String,
    /// Plain transcript text, whitespace normalized.
    pub transcript: String,
    /// Which source answered: `cache`, `library`, `interpreter` or `relay`. Diagnostic only.
    pub source: String,
}

/// GET the transcript of a video, trying every available source.
#[utoipa::path(
    get,
    path = "/videos/{video_id}/transcript",
    params(
        ("video_id" = String, Path, description = "11-character video id"),
        TranscriptParams
    ),
    responses(
        (status = 200, description = "Successfully resolved the transcript", body = TranscriptResponse),
        (status = 400, description = "Invalid video id"),
        (status = 404, description = "No source could provide a transcript"),
        (status = 503, description = "Service shutting down")
    )
)]
pub async fn read(
    State(app_state): State<AppState>,
    Path(video_id): Path<String>,
    Query(params): Query<TranscriptParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Transcript for video: {video_id}");

    let video_ref = VideoRef::parse(&video_id)?;
    let request = TranscriptRequest::from(video_ref).with_languages(params.languages());
    let cancel = app_state.shutdown.child_token();

    let result = app_state
        .transcripts_ref()
        .resolve_transcript(&request, &cancel)
        .await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        TranscriptResponse {
            video_id,
            transcript: result.text,
            source: result.source_used.to_string(),
        },
    )))
}
