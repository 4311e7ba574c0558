//! # Participant Lookup
//!
//! Read-only view of a participant, addressed by any of its codes. Used by
//! the door desk to answer "has this person arrived yet?" without scanning.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use evreg_core::Participant;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

/// Full participant record as stored.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ParticipantResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Registration form answers.
    pub attributes: serde_json::Value,
    pub checked_in: bool,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
}

impl From<Participant> for ParticipantResponse {
    fn from(p: Participant) -> Self {
        Self {
            id: p.id.to_string(),
            participant_code: p.participant_code,
            access_code: p.access_code,
            name: p.name,
            email: p.email,
            phone: p.phone,
            attributes: serde_json::Value::Object(p.attributes),
            checked_in: p.checked_in,
            checked_in_at: p.checked_in_at,
            registered_at: p.registered_at,
        }
    }
}

/// Build the participants router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/participants/:registration_id", get(get_participant))
}

/// GET /v1/participants/:registration_id — Look up a participant.
#[utoipa::path(
    get,
    path = "/v1/participants/{registration_id}",
    params(
        ("registration_id" = String, Path,
         description = "Participant id, participant code or access code"),
    ),
    responses(
        (status = 200, description = "Participant found", body = ParticipantResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 503, description = "Store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "participants"
)]
pub(crate) async fn get_participant(
    State(state): State<AppState>,
    Path(registration_id): Path<String>,
) -> Result<Json<ParticipantResponse>, AppError> {
    state
        .coordinator
        .lookup(&registration_id)
        .await?
        .map(|p| Json(p.into()))
        .ok_or_else(|| AppError::NotFound(format!("participant {registration_id} not found")))
}
