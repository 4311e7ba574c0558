//! # Check-in Coordinator
//!
//! Orchestrates one scan: normalize → atomic find-and-mark → result shaping.
//!
//! The coordinator holds no mutable state of its own. Concurrent scans of
//! the same badge are serialized by the store's conditional update, so
//! exactly one of them observes [`CheckInOutcome::Success`] and every other
//! one observes [`CheckInOutcome::Duplicate`] carrying the original
//! timestamp.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{CheckInError, StoreError};
use crate::normalize::{normalize, normalize_value, CodeFormat, ResolvedCode};
use crate::participant::{AttendanceStats, Participant, ParticipantSummary};
use crate::store::{MarkOutcome, ParticipantStore};

/// Discriminant of a check-in result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    /// First successful check-in.
    Success,
    /// Participant was already checked in.
    Duplicate,
    /// No participant answers to the identifier.
    NotFound,
}

impl CheckInStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Duplicate => "duplicate",
            Self::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for CheckInStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shaped result of a check-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInOutcome {
    /// This call checked the participant in.
    Success {
        participant: ParticipantSummary,
        checked_in_at: DateTime<Utc>,
    },
    /// The participant was already checked in. `checked_in_at` is the
    /// original time, never the time of this scan.
    Duplicate {
        participant: ParticipantSummary,
        checked_in_at: DateTime<Utc>,
    },
    /// The identifier did not match any participant.
    NotFound { registration_id: String },
}

impl CheckInOutcome {
    /// The outcome discriminant.
    pub fn status(&self) -> CheckInStatus {
        match self {
            Self::Success { .. } => CheckInStatus::Success,
            Self::Duplicate { .. } => CheckInStatus::Duplicate,
            Self::NotFound { .. } => CheckInStatus::NotFound,
        }
    }

    /// Participant display fields, absent for not-found.
    pub fn participant(&self) -> Option<&ParticipantSummary> {
        match self {
            Self::Success { participant, .. } | Self::Duplicate { participant, .. } => {
                Some(participant)
            }
            Self::NotFound { .. } => None,
        }
    }

    /// Check-in time, absent for not-found.
    pub fn checked_in_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Success { checked_in_at, .. } | Self::Duplicate { checked_in_at, .. } => {
                Some(*checked_in_at)
            }
            Self::NotFound { .. } => None,
        }
    }
}

/// A scan result together with how the raw code was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub resolved: ResolvedCode,
    pub outcome: CheckInOutcome,
}

/// Coordinates normalization and the atomic check-in transition.
///
/// Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct CheckInCoordinator {
    store: Arc<dyn ParticipantStore>,
}

impl std::fmt::Debug for CheckInCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckInCoordinator").finish_non_exhaustive()
    }
}

impl CheckInCoordinator {
    /// Create a coordinator over the given store.
    pub fn new(store: Arc<dyn ParticipantStore>) -> Self {
        Self { store }
    }

    /// Normalize a raw code without touching the store.
    pub fn resolve(&self, raw: &str) -> Result<ResolvedCode, CheckInError> {
        Ok(normalize(raw)?)
    }

    /// Like [`resolve`](Self::resolve) for codes delivered as arbitrary JSON
    /// values.
    pub fn resolve_value(&self, raw: &serde_json::Value) -> Result<ResolvedCode, CheckInError> {
        match raw {
            serde_json::Value::String(s) => self.resolve(s),
            other => Ok(normalize_value(other)?),
        }
    }

    /// Normalize a raw scanned string and check the participant in.
    pub async fn scan(&self, raw: &str) -> Result<ScanResult, CheckInError> {
        let resolved = normalize(raw).map_err(|e| {
            tracing::debug!(raw_len = raw.len(), "scan rejected: unrecognized format");
            e
        })?;
        self.scan_resolved(resolved).await
    }

    /// Like [`scan`](Self::scan) for codes delivered as arbitrary JSON values.
    pub async fn scan_value(&self, raw: &serde_json::Value) -> Result<ScanResult, CheckInError> {
        let resolved = normalize_value(raw)?;
        self.scan_resolved(resolved).await
    }

    async fn scan_resolved(&self, resolved: ResolvedCode) -> Result<ScanResult, CheckInError> {
        let outcome = self
            .check_in_as(resolved.registration_id.as_str(), resolved.format)
            .await?;
        Ok(ScanResult { resolved, outcome })
    }

    /// Check in the participant answering to `registration_id`.
    ///
    /// The identifier is not validated; one that matches nothing is
    /// [`CheckInOutcome::NotFound`].
    pub async fn check_in(&self, registration_id: &str) -> Result<CheckInOutcome, CheckInError> {
        let registration_id = registration_id.trim();
        let at = Utc::now();

        let marked = self
            .store
            .find_and_mark_checked_in(registration_id, at)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, registration_id, "check-in store call failed");
                e
            })?;

        let outcome = match marked {
            MarkOutcome::NotFound => CheckInOutcome::NotFound {
                registration_id: registration_id.to_string(),
            },
            MarkOutcome::Marked(participant) => CheckInOutcome::Success {
                checked_in_at: stamped_at(&participant)?,
                participant: participant.summary(),
            },
            MarkOutcome::AlreadyCheckedIn(participant) => CheckInOutcome::Duplicate {
                checked_in_at: stamped_at(&participant)?,
                participant: participant.summary(),
            },
        };
        Ok(outcome)
    }

    async fn check_in_as(
        &self,
        registration_id: &str,
        format: CodeFormat,
    ) -> Result<CheckInOutcome, CheckInError> {
        let outcome = self.check_in(registration_id).await?;
        tracing::info!(
            registration_id,
            format = %format,
            status = %outcome.status(),
            "check-in processed"
        );
        Ok(outcome)
    }

    /// Read-only participant lookup.
    pub async fn lookup(&self, registration_id: &str) -> Result<Option<Participant>, CheckInError> {
        Ok(self.store.find(registration_id.trim()).await?)
    }

    /// Attendance counters.
    pub async fn stats(&self) -> Result<AttendanceStats, CheckInError> {
        Ok(self.store.stats().await?)
    }
}

/// A checked-in record must carry its check-in time.
fn stamped_at(participant: &Participant) -> Result<DateTime<Utc>, StoreError> {
    participant.checked_in_at.ok_or_else(|| StoreError::Corrupt {
        id: participant.id.to_string(),
        reason: "checked in without a check-in timestamp".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnrecognizedFormat;
    use crate::identity::ParticipantId;
    use crate::memory::InMemoryParticipantStore;
    use async_trait::async_trait;
    use serde_json::json;

    const ID: &str = "507f1f77bcf86cd799439011";

    fn seeded() -> (InMemoryParticipantStore, CheckInCoordinator) {
        let store = InMemoryParticipantStore::new();
        let id = ParticipantId::new(ID).unwrap();
        let ada = Participant::new(id, "Ada Lovelace", "ada@example.org")
            .with_participant_code("KDYES2547")
            .unwrap()
            .with_access_code("Q7XK2M9P")
            .unwrap();
        store.insert(ada).unwrap();
        let coordinator = CheckInCoordinator::new(Arc::new(store.clone()));
        (store, coordinator)
    }

    #[tokio::test]
    async fn first_success_then_duplicate_with_same_time() {
        let (_, coordinator) = seeded();

        let first = coordinator.check_in(ID).await.unwrap();
        assert_eq!(first.status(), CheckInStatus::Success);
        let first_at = first.checked_in_at().unwrap();
        assert_eq!(first.participant().unwrap().name, "Ada Lovelace");

        let second = coordinator.check_in(ID).await.unwrap();
        assert_eq!(second.status(), CheckInStatus::Duplicate);
        assert_eq!(second.checked_in_at(), Some(first_at));
        assert_eq!(second.participant().unwrap().id, ID);
    }

    #[tokio::test]
    async fn duplicate_through_a_different_code() {
        let (_, coordinator) = seeded();

        let first = coordinator.scan("KDYES2547").await.unwrap();
        assert_eq!(first.outcome.status(), CheckInStatus::Success);

        let second = coordinator.scan("Q7XK2M9P").await.unwrap();
        assert_eq!(second.outcome.status(), CheckInStatus::Duplicate);
        assert_eq!(
            second.outcome.checked_in_at(),
            first.outcome.checked_in_at()
        );
    }

    #[tokio::test]
    async fn unknown_identifier_is_not_found() {
        let (store, coordinator) = seeded();
        let outcome = coordinator.check_in("abc123").await.unwrap();
        assert_eq!(
            outcome,
            CheckInOutcome::NotFound {
                registration_id: "abc123".to_string()
            }
        );
        assert!(outcome.participant().is_none());
        assert!(!store.get(ID).unwrap().checked_in);
    }

    #[tokio::test]
    async fn arbitrary_identifier_shape_is_not_found_not_error() {
        let (_, coordinator) = seeded();
        let outcome = coordinator.check_in("💥 ; DROP TABLE").await.unwrap();
        assert_eq!(outcome.status(), CheckInStatus::NotFound);
    }

    #[tokio::test]
    async fn scan_rejects_unrecognized_format() {
        let (store, coordinator) = seeded();
        let err = coordinator.scan("not-a-code").await.unwrap_err();
        assert!(matches!(err, CheckInError::UnrecognizedFormat(UnrecognizedFormat)));
        assert!(!store.get(ID).unwrap().checked_in);
    }

    #[tokio::test]
    async fn scan_reports_resolved_format() {
        let (_, coordinator) = seeded();
        let raw = format!(r#"{{"type":"registration","registrationId":"{ID}"}}"#);
        let result = coordinator.scan(&raw).await.unwrap();
        assert_eq!(result.resolved.format, CodeFormat::RegistrationPayload);
        assert_eq!(result.outcome.status(), CheckInStatus::Success);
    }

    #[tokio::test]
    async fn scan_value_coerces_non_strings() {
        let (_, coordinator) = seeded();
        let result = coordinator
            .scan_value(&serde_json::json!({"registrationId": "kdyes2547"}))
            .await
            .unwrap();
        assert_eq!(result.outcome.status(), CheckInStatus::Success);
    }

    #[test]
    fn resolve_does_not_touch_store() {
        let (store, coordinator) = seeded();
        let resolved = coordinator.resolve(ID).unwrap();
        assert_eq!(resolved.registration_id.as_str(), ID);
        assert!(!store.get(ID).unwrap().checked_in);
    }

    #[test]
    fn resolve_value_accepts_strings_numbers_and_objects() {
        let (store, coordinator) = seeded();

        let from_text = coordinator.resolve_value(&json!("  KDYES2547 ")).unwrap();
        assert_eq!(from_text.registration_id.as_str(), "KDYES2547");
        assert_eq!(from_text.format, CodeFormat::ParticipantCode);

        let from_number = coordinator.resolve_value(&json!(12345678)).unwrap();
        assert_eq!(from_number.format, CodeFormat::AccessCode);

        let from_object = coordinator
            .resolve_value(&json!({"type": "registration", "registrationId": ID}))
            .unwrap();
        assert_eq!(from_object.registration_id.as_str(), ID);
        assert_eq!(from_object.format, CodeFormat::RegistrationPayload);

        assert!(matches!(
            coordinator.resolve_value(&json!(null)),
            Err(CheckInError::UnrecognizedFormat(_))
        ));
        assert!(!store.get(ID).unwrap().checked_in);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_scans_yield_exactly_one_success() {
        let (_, coordinator) = seeded();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let c = coordinator.clone();
                tokio::spawn(async move { c.check_in(ID).await })
            })
            .collect();

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap().unwrap());
        }

        let successes = outcomes
            .iter()
            .filter(|o| o.status() == CheckInStatus::Success)
            .count();
        let duplicates = outcomes
            .iter()
            .filter(|o| o.status() == CheckInStatus::Duplicate)
            .count();
        assert_eq!(successes, 1);
        assert_eq!(duplicates, 15);

        let times: std::collections::HashSet<_> =
            outcomes.iter().filter_map(|o| o.checked_in_at()).collect();
        assert_eq!(times.len(), 1, "every result carries the first check-in time");
    }

    #[tokio::test]
    async fn two_simultaneous_scans() {
        let (_, coordinator) = seeded();
        let (a, b) = tokio::join!(coordinator.check_in(ID), coordinator.check_in(ID));
        let mut statuses = vec![a.unwrap().status(), b.unwrap().status()];
        statuses.sort_by_key(|s| s.as_str());
        assert_eq!(statuses, vec![CheckInStatus::Duplicate, CheckInStatus::Success]);
    }

    struct DownStore;

    #[async_trait]
    impl ParticipantStore for DownStore {
        async fn find(&self, _: &str) -> Result<Option<Participant>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn find_and_mark_checked_in(
            &self,
            _: &str,
            _: DateTime<Utc>,
        ) -> Result<MarkOutcome, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn stats(&self) -> Result<AttendanceStats, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn store_failure_is_surfaced_not_masked() {
        let coordinator = CheckInCoordinator::new(Arc::new(DownStore));
        let err = coordinator.check_in(ID).await.unwrap_err();
        match err {
            CheckInError::Store(e) => assert!(e.is_transient()),
            other => panic!("expected store error, got {other:?}"),
        }
    }

    struct CorruptStore;

    #[async_trait]
    impl ParticipantStore for CorruptStore {
        async fn find(&self, _: &str) -> Result<Option<Participant>, StoreError> {
            Ok(None)
        }

        async fn find_and_mark_checked_in(
            &self,
            _: &str,
            _: DateTime<Utc>,
        ) -> Result<MarkOutcome, StoreError> {
            let mut p = Participant::new(ParticipantId::new(ID).unwrap(), "A", "a@example.org");
            p.checked_in = true;
            Ok(MarkOutcome::AlreadyCheckedIn(p))
        }

        async fn stats(&self) -> Result<AttendanceStats, StoreError> {
            Ok(AttendanceStats::default())
        }
    }

    #[tokio::test]
    async fn checked_in_without_timestamp_is_corrupt() {
        let coordinator = CheckInCoordinator::new(Arc::new(CorruptStore));
        let err = coordinator.check_in(ID).await.unwrap_err();
        assert!(matches!(err, CheckInError::Store(StoreError::Corrupt { .. })));
    }
}
