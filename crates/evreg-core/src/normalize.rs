//! # Registration Code Normalizer
//!
//! Maps whatever the door scanner decoded (or staff typed) to a registration
//! lookup key. Badges printed under every past issuing scheme stay valid, so
//! the accepted shapes only ever grow. A new scheme is a new step appended
//! to [`STEPS`]; existing steps are never changed.
//!
//! ## Resolution order (first match wins)
//!
//! 1. JSON object payload:
//!    a. `{"type": "registration", "registrationId": ..}`
//!    b. legacy `{"id": .., "name": .., "email": ..}`
//!    c. bare `{"registrationId": ..}`
//! 2. 24-character lowercase hex (canonical store id)
//! 3. `KDYES` + digits, any case (participant code)
//! 4. legacy prefix marker (`checkin://`, `registration:`) + remainder
//! 5. verification / registration URL, last path segment after the marker
//! 6. 8-character uppercase alphanumeric (legacy access code)
//!
//! Anything else is [`UnrecognizedFormat`]. A JSON object matching none of
//! 1a-1c falls through to steps 2-6 rather than failing outright.
//!
//! The normalizer is pure and total: it never panics and never touches the
//! store.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::UnrecognizedFormat;
use crate::identity::{
    is_access_code, is_participant_code, is_participant_id, RegistrationId, ACCESS_CODE_LEN,
    PARTICIPANT_ID_LEN,
};

/// URL-style prefix markers used by early badge printers.
pub const LEGACY_PREFIX_MARKERS: &[&str] = &["checkin://", "registration:"];

/// Path segments identifying a verification or registration link.
pub const URL_PATH_MARKERS: &[&str] = &["/verify/", "/registration/", "/register/", "/checkin/"];

/// Which accepted shape a code was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeFormat {
    /// Typed JSON payload `{"type":"registration","registrationId":..}`.
    RegistrationPayload,
    /// Legacy JSON payload with `id`, `name` and `email`.
    LegacyPayload,
    /// JSON payload with a bare `registrationId`.
    IdentifierPayload,
    /// 24-character lowercase hex store id.
    ParticipantId,
    /// `KDYES` + digits.
    ParticipantCode,
    /// Legacy URL-style prefix marker.
    LegacyPrefix,
    /// Last segment of a verification/registration URL.
    VerificationUrl,
    /// Legacy 8-character access code.
    AccessCode,
}

impl CodeFormat {
    /// Return the string representation of this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegistrationPayload => "registration_payload",
            Self::LegacyPayload => "legacy_payload",
            Self::IdentifierPayload => "identifier_payload",
            Self::ParticipantId => "participant_id",
            Self::ParticipantCode => "participant_code",
            Self::LegacyPrefix => "legacy_prefix",
            Self::VerificationUrl => "verification_url",
            Self::AccessCode => "access_code",
        }
    }
}

impl std::fmt::Display for CodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successfully normalized code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCode {
    pub registration_id: RegistrationId,
    pub format: CodeFormat,
}

type Step = fn(&str) -> Option<ResolvedCode>;

/// Resolution steps in priority order.
const STEPS: &[Step] = &[
    from_structured_payload,
    from_participant_id,
    from_participant_code,
    from_legacy_prefix,
    from_verification_url,
    from_access_code,
];

/// Normalize a scanned or typed code.
///
/// Surrounding whitespace is ignored.
pub fn normalize(raw: &str) -> Result<ResolvedCode, UnrecognizedFormat> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(UnrecognizedFormat);
    }
    STEPS
        .iter()
        .find_map(|step| step(input))
        .ok_or(UnrecognizedFormat)
}

/// Normalize a code that arrived as an arbitrary JSON value.
///
/// Scanning libraries occasionally hand over numbers or already-decoded
/// objects instead of text. Strings are used directly, `null` becomes the
/// empty string, and everything else is coerced to its JSON text first.
pub fn normalize_value(raw: &Value) -> Result<ResolvedCode, UnrecognizedFormat> {
    match raw {
        Value::String(s) => normalize(s),
        Value::Null => normalize(""),
        other => normalize(&other.to_string()),
    }
}

fn resolved(id: &str, format: CodeFormat) -> Option<ResolvedCode> {
    RegistrationId::new(id).map(|registration_id| ResolvedCode {
        registration_id,
        format,
    })
}

/// Read an identifier field from a JSON object. Accepts non-empty strings
/// and numbers.
fn identifier_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn from_structured_payload(input: &str) -> Option<ResolvedCode> {
    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(input) else {
        return None;
    };

    let tagged = obj.get("type").and_then(Value::as_str) == Some("registration");
    if tagged {
        if let Some(id) = identifier_field(&obj, "registrationId") {
            return resolved(&id, CodeFormat::RegistrationPayload);
        }
    }

    if obj.contains_key("name") && obj.contains_key("email") {
        if let Some(id) = identifier_field(&obj, "id") {
            return resolved(&id, CodeFormat::LegacyPayload);
        }
    }

    identifier_field(&obj, "registrationId")
        .and_then(|id| resolved(&id, CodeFormat::IdentifierPayload))
}

fn from_participant_id(input: &str) -> Option<ResolvedCode> {
    is_participant_id(input)
        .then(|| resolved(input, CodeFormat::ParticipantId))
        .flatten()
}

fn from_participant_code(input: &str) -> Option<ResolvedCode> {
    is_participant_code(input)
        .then(|| resolved(input, CodeFormat::ParticipantCode))
        .flatten()
}

fn from_legacy_prefix(input: &str) -> Option<ResolvedCode> {
    LEGACY_PREFIX_MARKERS.iter().find_map(|marker| {
        let head = input.get(..marker.len())?;
        if !head.eq_ignore_ascii_case(marker) {
            return None;
        }
        resolved(&input[marker.len()..], CodeFormat::LegacyPrefix)
    })
}

fn from_verification_url(input: &str) -> Option<ResolvedCode> {
    let path = input.split(['?', '#']).next().unwrap_or(input);
    // ASCII lowering keeps byte offsets, so marker positions index `path`.
    let lowered = path.to_ascii_lowercase();
    let tail_start = URL_PATH_MARKERS
        .iter()
        .filter_map(|m| lowered.rfind(m).map(|at| at + m.len()))
        .max()?;

    // Only a segment after the last marker counts; a bare marker is not a code.
    let segment = path[tail_start..].split('/').filter(|s| !s.is_empty()).last()?;
    let len = segment.chars().count();

    if len == PARTICIPANT_ID_LEN || len == ACCESS_CODE_LEN || is_participant_code(segment) {
        resolved(segment, CodeFormat::VerificationUrl)
    } else {
        None
    }
}

fn from_access_code(input: &str) -> Option<ResolvedCode> {
    is_access_code(input)
        .then(|| resolved(input, CodeFormat::AccessCode))
        .flatten()
}
