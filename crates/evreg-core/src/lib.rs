//! # evreg-core — Door Check-in Core
//!
//! The check-in flow for event registration. No HTTP, no SQL: the API crate
//! wires these types to Axum and Postgres.
//!
//! ## Components (leaf to root)
//!
//! - [`normalize`] — pure, total mapping from a scanned/typed string to a
//!   registration identifier across every badge format ever printed.
//! - [`store`] — the [`ParticipantStore`] contract. Its one load-bearing
//!   operation is the atomic conditional check-in.
//! - [`memory`] — in-memory [`ParticipantStore`].
//! - [`coordinator`] — [`CheckInCoordinator`]: normalize, transition, shape.
//!
//! ## Invariants
//!
//! 1. A participant's `checked_in` flag never reverts to `false`.
//! 2. `checked_in_at` is written once, by the first successful check-in.
//! 3. Any accepted code shape for one registration resolves to the same
//!    participant.
//! 4. Two simultaneous scans of one badge produce one success and one
//!    duplicate, never two successes.

pub mod coordinator;
pub mod error;
pub mod identity;
pub mod memory;
pub mod normalize;
pub mod participant;
pub mod store;

// Re-export primary types at crate root for ergonomic imports.
pub use coordinator::{CheckInCoordinator, CheckInOutcome, CheckInStatus, ScanResult};
pub use error::{CheckInError, StoreError, UnrecognizedFormat, ValidationError};
pub use identity::{ParticipantId, RegistrationId};
pub use memory::InMemoryParticipantStore;
pub use normalize::{normalize, normalize_value, CodeFormat, ResolvedCode};
pub use participant::{AttendanceStats, Participant, ParticipantSummary};
pub use store::{MarkOutcome, ParticipantStore};
