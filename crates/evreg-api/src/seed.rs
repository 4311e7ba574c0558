//! # Participant Seeding
//!
//! Loads a JSON array of participants exported from the registration system
//! so the in-memory store can serve a door without a database.

use std::path::Path;

use evreg_core::{InMemoryParticipantStore, Participant, StoreError, ValidationError};
use thiserror::Error;

/// Failure loading a seed file.
#[derive(Error, Debug)]
pub enum SeedError {
    #[error("cannot read seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("seed file {path} is not a JSON participant list: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("participant {index} in seed file is invalid: {source}")]
    Validation {
        index: usize,
        #[source]
        source: ValidationError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read and validate every participant in `path`.
pub fn load_participants(path: &Path) -> Result<Vec<Participant>, SeedError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: display.clone(),
        source,
    })?;
    let participants: Vec<Participant> =
        serde_json::from_str(&raw).map_err(|source| SeedError::Json {
            path: display,
            source,
        })?;

    for (index, participant) in participants.iter().enumerate() {
        participant
            .validate()
            .map_err(|source| SeedError::Validation { index, source })?;
    }
    Ok(participants)
}

/// Load `path` into `store`. Returns how many participants were inserted.
pub fn seed_store(store: &InMemoryParticipantStore, path: &Path) -> Result<usize, SeedError> {
    let participants = load_participants(path)?;
    let count = store.extend(participants)?;
    tracing::info!(count, path = %path.display(), "participants seeded");
    Ok(count)
}
