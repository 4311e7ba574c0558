//! # Error Hierarchy
//!
//! Structured error types for the check-in flow, built with `thiserror`.
//!
//! The taxonomy is deliberately small:
//!
//! - [`UnrecognizedFormat`] — a scanned code matched none of the known shapes.
//! - [`StoreError`] — the participant store failed; transient failures are
//!   safe to retry with the same identifier.
//! - [`CheckInError`] — what the coordinator surfaces to callers.
//!
//! "Not found" and "already checked in" are outcomes, not errors. See
//! [`crate::coordinator::CheckInOutcome`].

use thiserror::Error;

/// A scanned or typed code matched none of the accepted registration code shapes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unrecognized registration code format")]
pub struct UnrecognizedFormat;

/// Participant store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached or the query failed in transit.
    #[error("participant store unavailable: {0}")]
    Unavailable(String),

    /// A stored record violates a participant invariant (e.g. checked in
    /// without a check-in timestamp).
    #[error("corrupt participant record {id}: {reason}")]
    Corrupt {
        /// Canonical id of the offending record.
        id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A uniqueness constraint on an id or registration code was violated.
    #[error("registration code conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Whether the caller may retry the same operation unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Errors surfaced by the check-in coordinator.
#[derive(Error, Debug)]
pub enum CheckInError {
    /// The raw code could not be normalized into a registration identifier.
    #[error(transparent)]
    UnrecognizedFormat(#[from] UnrecognizedFormat),

    /// The participant store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validation errors for participant identifiers and registration codes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Canonical participant id is not 24 lowercase hex characters.
    #[error("invalid participant id: \"{0}\" (expected 24 lowercase hex characters)")]
    InvalidParticipantId(String),

    /// Participant code is not `KDYES` followed by digits.
    #[error("invalid participant code: \"{0}\" (expected KDYES followed by digits)")]
    InvalidParticipantCode(String),

    /// Access code is not 8 uppercase alphanumeric characters.
    #[error("invalid access code: \"{0}\" (expected 8 uppercase alphanumeric characters)")]
    InvalidAccessCode(String),

    /// `checked_in` and `checked_in_at` disagree.
    #[error("participant {0}: check-in flag and check-in time disagree")]
    InconsistentCheckIn(String),
}
