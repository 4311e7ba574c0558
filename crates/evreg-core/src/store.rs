//! # Participant Store Contract
//!
//! The check-in flow needs three things from storage: a read-only lookup,
//! an atomic conditional check-in, and attendance counters.
//!
//! `find_and_mark_checked_in` MUST be a single atomic operation in the
//! backing store: "set `checked_in = true, checked_in_at = at` where the
//! identifier matches and `checked_in` is false". Implementations must not
//! split it into a read followed by a write, or two simultaneous scans of
//! one badge could both report success.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::participant::{AttendanceStats, Participant};

/// Outcome of the atomic find-and-mark operation.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkOutcome {
    /// No participant answers to the identifier.
    NotFound,
    /// This call performed the transition. The record is post-update.
    Marked(Participant),
    /// The participant was already checked in; the record is unchanged.
    AlreadyCheckedIn(Participant),
}

/// Storage backend for participant records.
///
/// Identifiers are matched against the canonical id, the participant code
/// (case-insensitive) and the legacy access code.
#[async_trait]
pub trait ParticipantStore: Send + Sync + 'static {
    /// Look up a participant without modifying it.
    async fn find(&self, identifier: &str) -> Result<Option<Participant>, StoreError>;

    /// Atomically check in the participant if not already checked in.
    async fn find_and_mark_checked_in(
        &self,
        identifier: &str,
        at: DateTime<Utc>,
    ) -> Result<MarkOutcome, StoreError>;

    /// Attendance counters.
    async fn stats(&self) -> Result<AttendanceStats, StoreError>;
}
