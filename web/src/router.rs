use crate::controller::{health_check_controller, transcript_controller};
use crate::AppState;
use axum::{routing::get, Router};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Learnloop Transcript API"
        ),
        paths(
            health_check_controller::health_check,
            transcript_controller::read,
        ),
        components(
            schemas(
                transcript_controller::TranscriptResponse,
            )
        ),
        tags(
            (name = "learnloop", description = "Resilient transcript acquisition for external videos")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(transcript_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn transcript_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/videos/{video_id}/transcript",
            get(transcript_controller::read),
        )
        .with_state(app_state)
}
