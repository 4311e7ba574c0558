//! # Check-in API
//!
//! The door scanner posts whatever it decoded from the badge. The code may
//! arrive as a JSON string or, from older scanner builds, as the parsed QR
//! payload itself; both go through the same normalizer.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use evreg_core::{CheckInError, CheckInOutcome, ParticipantSummary};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::StaffSession;
use crate::error::{AppError, ErrorBody};
use crate::extractors::extract_json;
use crate::state::AppState;

/// Scan submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScanRequest {
    /// Raw scanned or typed code. Any JSON value; strings are used as-is.
    #[serde(default)]
    pub code: serde_json::Value,
}

/// Participant fields shown to door staff.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantView {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_code: Option<String>,
}

impl From<ParticipantSummary> for ParticipantView {
    fn from(s: ParticipantSummary) -> Self {
        Self {
            id: s.id,
            name: s.name,
            email: s.email,
            phone: s.phone,
            participant_code: s.participant_code,
        }
    }
}

/// Successful or duplicate check-in.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckInResponse {
    /// "success" or "duplicate".
    pub status: String,
    /// Identifier the code resolved to.
    pub registration_id: String,
    /// Which badge format matched.
    pub format: String,
    pub participant: ParticipantView,
    /// For duplicates, the time of the first check-in.
    pub checked_in_at: DateTime<Utc>,
    pub message: String,
}

/// Normalization result without a check-in.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolveResponse {
    pub registration_id: String,
    pub format: String,
}

/// Attendance counters.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub registered: u64,
    pub checked_in: u64,
    pub pending: u64,
}

/// Build the check-in router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/checkin", post(check_in))
        .route("/v1/checkin/resolve", post(resolve))
        .route("/v1/checkin/stats", get(stats))
}

/// POST /v1/checkin — Normalize a scanned code and check the participant in.
#[utoipa::path(
    post,
    path = "/v1/checkin",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Checked in, or already checked in", body = CheckInResponse),
        (status = 404, description = "No participant for this code", body = ErrorBody),
        (status = 422, description = "Invalid QR code", body = ErrorBody),
        (status = 500, description = "Corrupt participant record", body = ErrorBody),
        (status = 503, description = "Store unavailable, retry", body = ErrorBody),
    ),
    tag = "checkin"
)]
#[tracing::instrument(skip_all, fields(operator = %session.operator))]
pub(crate) async fn check_in(
    State(state): State<AppState>,
    session: StaffSession,
    body: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<CheckInResponse>, AppError> {
    let req = extract_json(body)?;

    let result = match state.coordinator.scan_value(&req.code).await {
        Ok(result) => result,
        Err(err) => {
            // Only transient failures count as unavailability; corrupt rows
            // and conflicts surface as 500 and are left to the error counter.
            match &err {
                CheckInError::UnrecognizedFormat(_) => state.metrics.record_unrecognized(),
                CheckInError::Store(e) if e.is_transient() => state.metrics.record_unavailable(),
                CheckInError::Store(_) => {}
            }
            return Err(err.into());
        }
    };
    let status = result.outcome.status();
    state.metrics.record_outcome(status);

    let registration_id = result.resolved.registration_id.into_string();
    let format = result.resolved.format.as_str().to_string();

    let (participant, checked_in_at, message) = match result.outcome {
        CheckInOutcome::Success {
            participant,
            checked_in_at,
        } => (participant, checked_in_at, "Check-in successful"),
        CheckInOutcome::Duplicate {
            participant,
            checked_in_at,
        } => (participant, checked_in_at, "Already checked in"),
        CheckInOutcome::NotFound { registration_id } => {
            return Err(AppError::NotFound(format!(
                "no participant for code {registration_id}"
            )));
        }
    };

    Ok(Json(CheckInResponse {
        status: status.as_str().to_string(),
        registration_id,
        format,
        participant: participant.into(),
        checked_in_at,
        message: message.to_string(),
    }))
}

/// POST /v1/checkin/resolve — Normalize a code without checking in.
#[utoipa::path(
    post,
    path = "/v1/checkin/resolve",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Code recognized", body = ResolveResponse),
        (status = 422, description = "Invalid QR code", body = ErrorBody),
    ),
    tag = "checkin"
)]
pub(crate) async fn resolve(
    State(state): State<AppState>,
    body: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ResolveResponse>, AppError> {
    let req = extract_json(body)?;
    let resolved = state.coordinator.resolve_value(&req.code)?;
    Ok(Json(ResolveResponse {
        registration_id: resolved.registration_id.into_string(),
        format: resolved.format.as_str().to_string(),
    }))
}

/// GET /v1/checkin/stats — Attendance counters.
#[utoipa::path(
    get,
    path = "/v1/checkin/stats",
    responses(
        (status = 200, description = "Attendance counters", body = StatsResponse),
        (status = 503, description = "Store unavailable", body = ErrorBody),
    ),
    tag = "checkin"
)]
pub(crate) async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.coordinator.stats().await?;
    Ok(Json(StatsResponse {
        registered: stats.registered,
        checked_in: stats.checked_in,
        pending: stats.pending(),
    }))
}
