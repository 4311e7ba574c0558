//! # In-Memory Participant Store
//!
//! Process-local [`ParticipantStore`] for development, tests, and
//! single-node deployments without a database.
//!
//! All operations are synchronous under a `parking_lot::RwLock` (never held
//! across `.await`). The check-in transition runs inside one write-lock
//! critical section, which is what makes it atomic.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::identity::ParticipantId;
use crate::participant::{AttendanceStats, Participant, Transition};
use crate::store::{MarkOutcome, ParticipantStore};

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<ParticipantId, Participant>,
    /// Upper-cased participant code → id.
    by_participant_code: HashMap<String, ParticipantId>,
    /// Access code → id.
    by_access_code: HashMap<String, ParticipantId>,
}

impl Inner {
    fn resolve(&self, identifier: &str) -> Option<ParticipantId> {
        if let Ok(id) = ParticipantId::new(identifier) {
            if self.records.contains_key(&id) {
                return Some(id);
            }
        }
        let upper = identifier.to_ascii_uppercase();
        self.by_access_code
            .get(identifier)
            .or_else(|| self.by_participant_code.get(&upper))
            .cloned()
    }

    /// Whether `code` (upper-case) is already taken as either kind of code.
    ///
    /// Access codes and participant codes share one namespace: `KDYES123` is
    /// a valid shape for both, and resolution must not depend on lookup order.
    fn code_taken(&self, code: &str) -> bool {
        self.by_access_code.contains_key(code) || self.by_participant_code.contains_key(code)
    }
}

/// Thread-safe, cloneable in-memory participant store.
///
/// Clones share the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryParticipantStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryParticipantStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new participant.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] if the id is already taken, or if either code
    /// is already held by another record as a participant code or an access
    /// code.
    pub fn insert(&self, participant: Participant) -> Result<(), StoreError> {
        let mut inner = self.inner.write();

        if inner.records.contains_key(&participant.id) {
            return Err(StoreError::Conflict(format!(
                "participant id {} already registered",
                participant.id
            )));
        }
        let code = participant
            .participant_code
            .as_ref()
            .map(|c| c.to_ascii_uppercase());
        if let Some(code) = &code {
            if inner.code_taken(code) {
                return Err(StoreError::Conflict(format!(
                    "participant code {code} already registered"
                )));
            }
        }
        if let Some(access) = &participant.access_code {
            if inner.code_taken(access) {
                return Err(StoreError::Conflict(format!(
                    "access code {access} already registered"
                )));
            }
        }

        if let Some(code) = code {
            inner
                .by_participant_code
                .insert(code, participant.id.clone());
        }
        if let Some(access) = &participant.access_code {
            inner
                .by_access_code
                .insert(access.clone(), participant.id.clone());
        }
        inner.records.insert(participant.id.clone(), participant);
        Ok(())
    }

    /// Insert many participants, stopping at the first conflict.
    pub fn extend(
        &self,
        participants: impl IntoIterator<Item = Participant>,
    ) -> Result<usize, StoreError> {
        let mut count = 0;
        for participant in participants {
            self.insert(participant)?;
            count += 1;
        }
        Ok(count)
    }

    /// Atomically read-validate-update the record answering to `identifier`.
    ///
    /// The closure runs under the write lock. Returns `None` if no record
    /// matches.
    pub fn try_update<R>(
        &self,
        identifier: &str,
        f: impl FnOnce(&mut Participant) -> R,
    ) -> Option<R> {
        let mut inner = self.inner.write();
        let id = inner.resolve(identifier)?;
        inner.records.get_mut(&id).map(f)
    }

    /// Retrieve a record through any of its codes.
    pub fn get(&self, identifier: &str) -> Option<Participant> {
        let inner = self.inner.read();
        let id = inner.resolve(identifier)?;
        inner.records.get(&id).cloned()
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ParticipantStore for InMemoryParticipantStore {
    async fn find(&self, identifier: &str) -> Result<Option<Participant>, StoreError> {
        Ok(self.get(identifier))
    }

    async fn find_and_mark_checked_in(
        &self,
        identifier: &str,
        at: DateTime<Utc>,
    ) -> Result<MarkOutcome, StoreError> {
        let outcome = self.try_update(identifier, |participant| {
            match participant.mark_checked_in(at) {
                Transition::Marked(_) => MarkOutcome::Marked(participant.clone()),
                Transition::AlreadyCheckedIn(_) => {
                    MarkOutcome::AlreadyCheckedIn(participant.clone())
                }
            }
        });
        Ok(outcome.unwrap_or(MarkOutcome::NotFound))
    }

    async fn stats(&self) -> Result<AttendanceStats, StoreError> {
        let inner = self.inner.read();
        let checked_in = inner.records.values().filter(|p| p.checked_in).count();
        Ok(AttendanceStats {
            registered: inner.records.len() as u64,
            checked_in: checked_in as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "507f1f77bcf86cd799439011";
    const OTHER_ID: &str = "65a1b2c3d4e5f60718293a4b";

    fn sample() -> Participant {
        Participant::new(ParticipantId::new(ID).unwrap(), "Ada Lovelace", "ada@example.org")
            .with_participant_code("KDYES2547")
            .unwrap()
            .with_access_code("Q7XK2M9P")
            .unwrap()
    }

    #[test]
    fn new_store_is_empty() {
        let store = InMemoryParticipantStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn every_code_resolves_to_the_same_record() {
        let store = InMemoryParticipantStore::new();
        store.insert(sample()).unwrap();

        for identifier in [ID, "KDYES2547", "kdyes2547", "Q7XK2M9P"] {
            let found = store.get(identifier).unwrap();
            assert_eq!(found.id.as_str(), ID, "identifier {identifier}");
        }
        assert!(store.get("q7xk2m9p").is_none());
        assert!(store.get("abc123").is_none());
    }

    #[test]
    fn duplicate_codes_conflict() {
        let store = InMemoryParticipantStore::new();
        store.insert(sample()).unwrap();

        let same_id = sample();
        assert!(matches!(store.insert(same_id), Err(StoreError::Conflict(_))));

        let other = ParticipantId::new(OTHER_ID).unwrap();
        let same_code = Participant::new(other.clone(), "B", "b@example.org")
            .with_participant_code("kdyes2547")
            .unwrap();
        assert!(matches!(store.insert(same_code), Err(StoreError::Conflict(_))));

        let same_access = Participant::new(other, "C", "c@example.org")
            .with_access_code("Q7XK2M9P")
            .unwrap();
        assert!(matches!(store.insert(same_access), Err(StoreError::Conflict(_))));

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn access_code_cannot_reuse_a_participant_code() {
        let store = InMemoryParticipantStore::new();
        store
            .insert(
                Participant::new(ParticipantId::new(ID).unwrap(), "A", "a@example.org")
                    .with_participant_code("kdyes123")
                    .unwrap(),
            )
            .unwrap();

        let other = ParticipantId::new(OTHER_ID).unwrap();
        let clash = Participant::new(other, "B", "b@example.org")
            .with_access_code("KDYES123")
            .unwrap();
        assert!(matches!(store.insert(clash), Err(StoreError::Conflict(_))));

        assert_eq!(store.get("KDYES123").unwrap().id.as_str(), ID);
        assert!(store.get(OTHER_ID).is_none());
    }

    #[test]
    fn participant_code_cannot_reuse_an_access_code() {
        let store = InMemoryParticipantStore::new();
        store
            .insert(
                Participant::new(ParticipantId::new(ID).unwrap(), "A", "a@example.org")
                    .with_access_code("KDYES123")
                    .unwrap(),
            )
            .unwrap();

        let other = ParticipantId::new(OTHER_ID).unwrap();
        let clash = Participant::new(other, "B", "b@example.org")
            .with_participant_code("kdyes123")
            .unwrap();
        assert!(matches!(store.insert(clash), Err(StoreError::Conflict(_))));

        assert_eq!(store.get("kdyes123").unwrap().id.as_str(), ID);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn one_record_may_use_the_same_string_for_both_codes() {
        let store = InMemoryParticipantStore::new();
        store
            .insert(
                Participant::new(ParticipantId::new(ID).unwrap(), "A", "a@example.org")
                    .with_participant_code("KDYES123")
                    .unwrap()
                    .with_access_code("KDYES123")
                    .unwrap(),
            )
            .unwrap();
        assert_eq!(store.get("KDYES123").unwrap().id.as_str(), ID);
    }

    #[test]
    fn clone_shares_underlying_data() {
        let store = InMemoryParticipantStore::new();
        let clone = store.clone();
        store.insert(sample()).unwrap();
        assert_eq!(clone.len(), 1);
    }

    #[tokio::test]
    async fn mark_then_mark_again_keeps_first_time() {
        let store = InMemoryParticipantStore::new();
        store.insert(sample()).unwrap();

        let first_at = Utc::now();
        let first = store.find_and_mark_checked_in(ID, first_at).await.unwrap();
        let MarkOutcome::Marked(p) = first else {
            panic!("expected Marked, got {first:?}");
        };
        assert_eq!(p.checked_in_at, Some(first_at));

        let later = first_at + chrono::Duration::seconds(30);
        let second = store
            .find_and_mark_checked_in("KDYES2547", later)
            .await
            .unwrap();
        let MarkOutcome::AlreadyCheckedIn(p) = second else {
            panic!("expected AlreadyCheckedIn, got {second:?}");
        };
        assert_eq!(p.checked_in_at, Some(first_at));
    }

    #[tokio::test]
    async fn unknown_identifier_is_not_found() {
        let store = InMemoryParticipantStore::new();
        let outcome = store
            .find_and_mark_checked_in("abc123", Utc::now())
            .await
            .unwrap();
        assert_eq!(outcome, MarkOutcome::NotFound);
    }

    #[tokio::test]
    async fn stats_count_checked_in() {
        let store = InMemoryParticipantStore::new();
        store.insert(sample()).unwrap();
        store
            .insert(Participant::new(ParticipantId::new(OTHER_ID).unwrap(), "B", "b@example.org"))
            .unwrap();

        store.find_and_mark_checked_in(ID, Utc::now()).await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.registered, 2);
        assert_eq!(stats.checked_in, 1);
        assert_eq!(stats.pending(), 1);
    }

    #[tokio::test]
    async fn find_does_not_mutate() {
        let store = InMemoryParticipantStore::new();
        store.insert(sample()).unwrap();
        let found = store.find(ID).await.unwrap().unwrap();
        assert!(!found.checked_in);
        assert!(!store.get(ID).unwrap().checked_in);
    }
}
