//! # evreg-api — Door Check-in HTTP Service
//!
//! Axum service in front of the [`evreg_core`] check-in flow.
//!
//! ## API Surface
//!
//! | Path                                  | Module                     |
//! |---------------------------------------|----------------------------|
//! | `POST /v1/checkin`                    | [`routes::checkin`]        |
//! | `POST /v1/checkin/resolve`            | [`routes::checkin`]        |
//! | `GET /v1/checkin/stats`               | [`routes::checkin`]        |
//! | `GET /v1/participants/:id`            | [`routes::participants`]   |
//! | `GET /v1/metrics`                     | [`routes::metrics`]        |
//! | `GET /openapi.json`                   | [`openapi`]                |
//! | `GET /health/liveness`, `/readiness`  | this module, no auth       |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod seed;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::Router;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware
/// so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = state.metrics.clone();

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::checkin::router())
        .merge(routes::participants::router())
        .merge(routes::metrics::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .with_state(state.clone());

    // Unauthenticated health probes.
    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// Liveness probe: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once the participant store answers, 503 otherwise.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.coordinator.stats().await {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, backend = state.backend.as_str(), "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "participant store unavailable")
        }
    }
}
