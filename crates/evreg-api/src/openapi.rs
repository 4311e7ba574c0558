//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "evreg API — Door Check-in",
        version = "0.3.2",
        description = "Badge scanning and idempotent check-in for registered event participants.",
        license(name = "MIT")
    ),
    paths(
        crate::routes::checkin::check_in,
        crate::routes::checkin::resolve,
        crate::routes::checkin::stats,
        crate::routes::participants::get_participant,
        crate::routes::metrics::get_metrics,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::checkin::ScanRequest,
        crate::routes::checkin::CheckInResponse,
        crate::routes::checkin::ParticipantView,
        crate::routes::checkin::ResolveResponse,
        crate::routes::checkin::StatsResponse,
        crate::routes::participants::ParticipantResponse,
        crate::middleware::metrics::MetricsSnapshot,
    )),
    tags(
        (name = "checkin", description = "Badge scanning and check-in"),
        (name = "participants", description = "Participant lookup"),
        (name = "operations", description = "Service counters"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
