//! # Identifier Newtypes
//!
//! A participant is reachable through three historically introduced codes:
//!
//! | Shape              | Example                    | Type / check             |
//! |--------------------|----------------------------|--------------------------|
//! | canonical store id | `507f1f77bcf86cd799439011` | [`ParticipantId`]        |
//! | participant code   | `KDYES2547`                | [`is_participant_code`]  |
//! | legacy access code | `Q7XK2M9P`                 | [`is_access_code`]       |
//!
//! [`RegistrationId`] is what the normalizer produces: a trimmed, non-empty
//! lookup key that is not guaranteed to match any participant.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Prefix of the fixed-prefix participant code format.
pub const PARTICIPANT_CODE_PREFIX: &str = "KDYES";

/// Length of the canonical store identifier.
pub const PARTICIPANT_ID_LEN: usize = 24;

/// Length of the legacy access code.
pub const ACCESS_CODE_LEN: usize = 8;

/// Whether `s` is a canonical store identifier (24 lowercase hex characters).
pub fn is_participant_id(s: &str) -> bool {
    s.len() == PARTICIPANT_ID_LEN
        && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Whether `s` is a participant code: `KDYES` (any case) followed by one or more digits.
pub fn is_participant_code(s: &str) -> bool {
    let prefix_len = PARTICIPANT_CODE_PREFIX.len();
    match (s.get(..prefix_len), s.get(prefix_len..)) {
        (Some(prefix), Some(digits)) => {
            prefix.eq_ignore_ascii_case(PARTICIPANT_CODE_PREFIX)
                && !digits.is_empty()
                && digits.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

/// Whether `s` is a legacy access code: exactly 8 uppercase ASCII letters or digits.
pub fn is_access_code(s: &str) -> bool {
    s.len() == ACCESS_CODE_LEN
        && s.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Canonical, storage-native participant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Parse a canonical identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidParticipantId`] unless the input is
    /// exactly 24 lowercase hex characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if is_participant_id(&s) {
            Ok(Self(s))
        } else {
            Err(ValidationError::InvalidParticipantId(s))
        }
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized registration lookup key.
///
/// Always trimmed and non-empty. Shape is not validated: it may be any of the
/// known code formats or an opaque id taken from a structured payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(String);

impl RegistrationId {
    /// Build a registration id from raw text. Returns `None` if the trimmed
    /// text is empty.
    pub fn new(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RegistrationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
