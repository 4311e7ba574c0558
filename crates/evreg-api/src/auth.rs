//! # Door Staff Authentication
//!
//! Bearer token middleware for the check-in API.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {operator}:{secret}   — named operator (e.g. "door-2:s3cret")
//! Bearer {secret}              — anonymous staff, operator "staff"
//! ```
//!
//! Every authenticated request gets a [`StaffSession`] injected into the
//! request extensions. Handlers receive it through `FromRequestParts`; there
//! is no ambient "is authenticated" flag anywhere else.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// Operator name used when the token carries no operator prefix, or when
/// authentication is disabled.
pub const DEFAULT_OPERATOR: &str = "staff";

/// Maximum accepted operator name length.
const MAX_OPERATOR_LEN: usize = 64;

// ── StaffSession ────────────────────────────────────────────────────────────

/// Authenticated door-staff context for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffSession {
    /// Who is scanning. Recorded on every check-in log line.
    pub operator: String,
}

impl StaffSession {
    fn anonymous() -> Self {
        Self {
            operator: DEFAULT_OPERATOR.to_string(),
        }
    }
}

/// Extracts the session that the auth middleware injected into extensions.
/// Returns 401 if no session is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for StaffSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<StaffSession>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no staff session in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer tokens.
///
/// When lengths differ, performs a dummy comparison so timing does not
/// depend on how much of the secret matched.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token of the form `{operator}:{secret}` or `{secret}`.
///
/// The secret itself may contain colons; only the first one separates the
/// operator, and only when the whole token is not already the secret.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<StaffSession, String> {
    if constant_time_token_eq(provided, expected_secret) {
        return Ok(StaffSession::anonymous());
    }

    let Some((operator, secret)) = provided.split_once(':') else {
        return Err("invalid bearer token".into());
    };
    if !constant_time_token_eq(secret, expected_secret) {
        return Err("invalid bearer token".into());
    }

    let operator = operator.trim();
    if operator.is_empty() {
        return Ok(StaffSession::anonymous());
    }
    if operator.len() > MAX_OPERATOR_LEN
        || !operator
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err("invalid operator name".into());
    }

    Ok(StaffSession {
        operator: operator.to_string(),
    })
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the Bearer token from the Authorization header and inject the
/// resulting [`StaffSession`].
///
/// When `AuthConfig.token` is `None`, all requests are allowed as the
/// anonymous operator (development mode).
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    match expected_token {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header.and_then(|v| v.strip_prefix("Bearer ")) {
                Some(provided) => match parse_bearer_token(provided, expected) {
                    Ok(session) => {
                        request.extensions_mut().insert(session);
                        next.run(request).await
                    }
                    Err(msg) => {
                        tracing::warn!(
                            reason = %msg,
                            "authentication failed: invalid bearer token"
                        );
                        unauthorized_response(&msg)
                    }
                },
                None if auth_header.is_some() => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    unauthorized_response("authorization header must use Bearer scheme")
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    unauthorized_response("missing authorization header")
                }
            }
        }
        _ => {
            request.extensions_mut().insert(StaffSession::anonymous());
            next.run(request).await
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
