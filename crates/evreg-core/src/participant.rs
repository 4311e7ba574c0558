//! # Participant Records
//!
//! A participant is created at registration time and mutated exactly once
//! by the check-in flow: `checked_in` goes from `false` to `true` and
//! `checked_in_at` is stamped. Neither field ever reverts, and the timestamp
//! is never overwritten by a later scan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{is_access_code, is_participant_code, ParticipantId};

/// A registered event participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Canonical store identifier.
    pub id: ParticipantId,
    /// Fixed-prefix participant code (`KDYES…`), stored upper-case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_code: Option<String>,
    /// Legacy 8-character access code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Demographic attributes captured by the registration form. Opaque here.
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub checked_in: bool,
    #[serde(default)]
    pub checked_in_at: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
}

/// Result of applying a check-in to a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The record moved from not-present to present at the given time.
    Marked(DateTime<Utc>),
    /// The record was already present; carries the original time if known.
    AlreadyCheckedIn(Option<DateTime<Utc>>),
}

impl Participant {
    /// Create a participant who has not checked in yet.
    pub fn new(id: ParticipantId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            participant_code: None,
            access_code: None,
            name: name.into(),
            email: email.into(),
            phone: None,
            attributes: serde_json::Map::new(),
            checked_in: false,
            checked_in_at: None,
            registered_at: Utc::now(),
        }
    }

    /// Attach a participant code. Stored upper-case.
    pub fn with_participant_code(mut self, code: &str) -> Result<Self, ValidationError> {
        let code = code.trim();
        if !is_participant_code(code) {
            return Err(ValidationError::InvalidParticipantCode(code.to_string()));
        }
        self.participant_code = Some(code.to_ascii_uppercase());
        Ok(self)
    }

    /// Attach a legacy access code.
    pub fn with_access_code(mut self, code: &str) -> Result<Self, ValidationError> {
        let code = code.trim();
        if !is_access_code(code) {
            return Err(ValidationError::InvalidAccessCode(code.to_string()));
        }
        self.access_code = Some(code.to_string());
        Ok(self)
    }

    /// Attach a phone number.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Check the record's codes against the accepted formats.
    ///
    /// Used when records arrive from outside the builder (seed files, rows).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(code) = &self.participant_code {
            if !is_participant_code(code) {
                return Err(ValidationError::InvalidParticipantCode(code.clone()));
            }
        }
        if let Some(code) = &self.access_code {
            if !is_access_code(code) {
                return Err(ValidationError::InvalidAccessCode(code.clone()));
            }
        }
        if self.checked_in != self.checked_in_at.is_some() {
            return Err(ValidationError::InconsistentCheckIn(self.id.to_string()));
        }
        Ok(())
    }

    /// Apply the one-way check-in transition.
    ///
    /// Sets both fields only if the participant was not yet checked in;
    /// otherwise leaves the record untouched.
    pub fn mark_checked_in(&mut self, at: DateTime<Utc>) -> Transition {
        if self.checked_in {
            return Transition::AlreadyCheckedIn(self.checked_in_at);
        }
        self.checked_in = true;
        self.checked_in_at = Some(at);
        Transition::Marked(at)
    }

    /// Display fields returned to the door staff.
    pub fn summary(&self) -> ParticipantSummary {
        ParticipantSummary {
            id: self.id.to_string(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            participant_code: self.participant_code.clone(),
        }
    }
}

/// Participant display fields carried on check-in results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_code: Option<String>,
}

/// Attendance counters for dashboard collaborators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceStats {
    /// Participants on record.
    pub registered: u64,
    /// Participants who have checked in.
    pub checked_in: u64,
}

impl AttendanceStats {
    /// Registered participants who have not checked in yet.
    pub fn pending(&self) -> u64 {
        self.registered.saturating_sub(self.checked_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Participant {
        Participant::new(
            ParticipantId::new("507f1f77bcf86cd799439011").unwrap(),
            "Ada Lovelace",
            "ada@example.org",
        )
    }

    #[test]
    fn new_participant_is_not_checked_in() {
        let p = sample();
        assert!(!p.checked_in);
        assert!(p.checked_in_at.is_none());
    }

    #[test]
    fn first_mark_stamps_time() {
        let mut p = sample();
        let at = Utc::now();
        assert_eq!(p.mark_checked_in(at), Transition::Marked(at));
        assert!(p.checked_in);
        assert_eq!(p.checked_in_at, Some(at));
    }

    #[test]
    fn second_mark_keeps_original_time() {
        let mut p = sample();
        let first = Utc::now();
        p.mark_checked_in(first);

        let later = first + Duration::minutes(5);
        assert_eq!(
            p.mark_checked_in(later),
            Transition::AlreadyCheckedIn(Some(first))
        );
        assert_eq!(p.checked_in_at, Some(first));
        assert!(p.checked_in);
    }

    #[test]
    fn participant_code_is_uppercased() {
        let p = sample().with_participant_code(" kdyes2547 ").unwrap();
        assert_eq!(p.participant_code.as_deref(), Some("KDYES2547"));
    }

    #[test]
    fn invalid_codes_are_rejected() {
        assert!(sample().with_participant_code("ABC123").is_err());
        assert!(sample().with_access_code("short").is_err());
        assert!(sample().with_access_code("lower123").is_err());
    }

    #[test]
    fn validate_catches_bad_deserialized_codes() {
        let mut p = sample();
        p.access_code = Some("bad".into());
        assert!(p.validate().is_err());
        p.access_code = Some("Q7XK2M9P".into());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn validate_requires_check_in_time_with_flag() {
        let mut p = sample();
        p.checked_in = true;
        assert!(matches!(
            p.validate(),
            Err(ValidationError::InconsistentCheckIn(_))
        ));
        p.checked_in_at = Some(Utc::now());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn summary_carries_display_fields() {
        let p = sample().with_phone("+31 6 1234 5678");
        let s = p.summary();
        assert_eq!(s.id, "507f1f77bcf86cd799439011");
        assert_eq!(s.name, "Ada Lovelace");
        assert_eq!(s.phone.as_deref(), Some("+31 6 1234 5678"));
    }

    #[test]
    fn stats_pending_never_underflows() {
        let stats = AttendanceStats {
            registered: 3,
            checked_in: 5,
        };
        assert_eq!(stats.pending(), 0);
    }
}
