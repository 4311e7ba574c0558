//! # API Route Modules
//!
//! - `checkin` — badge scanning: check-in, resolve-only, attendance stats.
//! - `participants` — read-only participant lookup through any code.
//! - `metrics` — in-process request and check-in outcome counters.

pub mod checkin;
pub mod metrics;
pub mod participants;
