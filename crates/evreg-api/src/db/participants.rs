//! Participant persistence operations.
//!
//! All queries run against the `participants` table. An identifier matches
//! a row through its id, its access code, or its participant code (stored
//! upper-case, matched case-insensitively), in that priority order.
//!
//! The check-in is one statement:
//!
//! ```sql
//! UPDATE participants SET checked_in = TRUE, checked_in_at = $2
//! WHERE id = <match> AND checked_in = FALSE
//! RETURNING ...
//! ```
//!
//! Postgres re-checks `checked_in = FALSE` after acquiring the row lock, so
//! of two concurrent scans exactly one gets a row back. An empty result is
//! then disambiguated with a plain read: row present means duplicate, row
//! absent means not found.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use evreg_core::{
    AttendanceStats, MarkOutcome, Participant, ParticipantId, ParticipantStore, StoreError,
};
use sqlx::PgPool;

const COLUMNS: &str = "id, participant_code, access_code, name, email, phone, attributes, \
                       checked_in, checked_in_at, registered_at";

/// Resolves `$1` to at most one participant id.
const MATCH_ID: &str = "(SELECT id FROM participants
                        WHERE id = $1 OR access_code = $1 OR participant_code = upper($1)
                        ORDER BY (id = $1) DESC, (access_code = $1) DESC NULLS LAST
                        LIMIT 1)";

/// Postgres-backed participant store.
#[derive(Debug, Clone)]
pub struct PgParticipantStore {
    pool: PgPool,
}

impl PgParticipantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a participant unless its id or a code is already taken.
    ///
    /// Returns `true` if the row was inserted. Used to import seed files
    /// idempotently.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] if one of the codes is held by another row
    /// as the other kind of code (participant code vs. access code). The
    /// `participants_codes_disjoint` trigger raises it; `ON CONFLICT` does
    /// not absorb it.
    pub async fn insert_if_absent(&self, participant: &Participant) -> Result<bool, StoreError> {
        let attributes = serde_json::Value::Object(participant.attributes.clone());
        let result = sqlx::query(
            "INSERT INTO participants
                 (id, participant_code, access_code, name, email, phone, attributes,
                  checked_in, checked_in_at, registered_at)
             VALUES ($1, upper($2), $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT DO NOTHING",
        )
        .bind(participant.id.as_str())
        .bind(participant.participant_code.as_deref())
        .bind(participant.access_code.as_deref())
        .bind(&participant.name)
        .bind(&participant.email)
        .bind(participant.phone.as_deref())
        .bind(&attributes)
        .bind(participant.checked_in)
        .bind(participant.checked_in_at)
        .bind(participant.registered_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ParticipantStore for PgParticipantStore {
    async fn find(&self, identifier: &str) -> Result<Option<Participant>, StoreError> {
        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {COLUMNS} FROM participants WHERE id = {MATCH_ID}"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(ParticipantRow::into_participant).transpose()
    }

    async fn find_and_mark_checked_in(
        &self,
        identifier: &str,
        at: DateTime<Utc>,
    ) -> Result<MarkOutcome, StoreError> {
        let marked = sqlx::query_as::<_, ParticipantRow>(&format!(
            "UPDATE participants SET checked_in = TRUE, checked_in_at = $2
             WHERE id = {MATCH_ID} AND checked_in = FALSE
             RETURNING {COLUMNS}"
        ))
        .bind(identifier)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        if let Some(row) = marked {
            return Ok(MarkOutcome::Marked(row.into_participant()?));
        }

        Ok(match self.find(identifier).await? {
            Some(participant) => MarkOutcome::AlreadyCheckedIn(participant),
            None => MarkOutcome::NotFound,
        })
    }

    async fn stats(&self) -> Result<AttendanceStats, StoreError> {
        let (registered, checked_in) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE checked_in) FROM participants",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(AttendanceStats {
            registered: u64::try_from(registered).unwrap_or_default(),
            checked_in: u64::try_from(checked_in).unwrap_or_default(),
        })
    }
}

/// Map a SQLx error to the store taxonomy.
///
/// Unique violations are conflicts, undecodable rows are corruption, and
/// everything else (pool timeouts, I/O, protocol) is transient.
fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_) => StoreError::Corrupt {
            id: "unknown".to_string(),
            reason: err.to_string(),
        },
        _ => StoreError::Unavailable(err.to_string()),
    }
}

/// Internal row type for SQLx mapping.
#[derive(Debug, sqlx::FromRow)]
struct ParticipantRow {
    id: String,
    participant_code: Option<String>,
    access_code: Option<String>,
    name: String,
    email: String,
    phone: Option<String>,
    attributes: serde_json::Value,
    checked_in: bool,
    checked_in_at: Option<DateTime<Utc>>,
    registered_at: DateTime<Utc>,
}

impl ParticipantRow {
    fn into_participant(self) -> Result<Participant, StoreError> {
        let corrupt = |id: &str, reason: String| {
            tracing::error!(id, reason = %reason, "corrupt participant row");
            StoreError::Corrupt {
                id: id.to_string(),
                reason,
            }
        };

        let id = ParticipantId::new(self.id.as_str())
            .map_err(|e| corrupt(&self.id, e.to_string()))?;
        let attributes = match self.attributes {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(corrupt(
                    &self.id,
                    format!("attributes must be a JSON object, got {other}"),
                ))
            }
        };

        let participant = Participant {
            id,
            participant_code: self.participant_code,
            access_code: self.access_code,
            name: self.name,
            email: self.email,
            phone: self.phone,
            attributes,
            checked_in: self.checked_in,
            checked_in_at: self.checked_in_at,
            registered_at: self.registered_at,
        };
        participant
            .validate()
            .map_err(|e| corrupt(&self.id, e.to_string()))?;
        Ok(participant)
    }
}
