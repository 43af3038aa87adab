//! # pixora-api: Verification Request Service for the Pixora Marketplace
//!
//! Users ask to be verified as the real person behind their account; admins
//! review the queue and approve or reject each request once.
//!
//! ## API Surface
//!
//! | Route                                                    | Module                  |
//! |----------------------------------------------------------|-------------------------|
//! | `POST /api/user/verification-request`                    | [`routes::verification`] |
//! | `GET  /api/user/verification-requests`                   | [`routes::verification`] |
//! | `GET  /api/admin/{,pending-,approved-,rejected-}verification-requests` | [`routes::admin`] |
//! | `PUT  /api/admin/verification-requests/:id/status`       | [`routes::admin`]       |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → AuthMiddleware → Handler
//! ```
//!
//! Health probes and the banner are mounted outside the auth middleware.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod store;
pub mod users;
pub mod workflow;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        secret: state.config.auth_secret.clone(),
    };

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::verification::router())
        .merge(routes::admin::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    // Unauthenticated probes.
    let health = Router::new()
        .route("/", get(banner))
        .route("/health", get(health_status))
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

async fn banner() -> &'static str {
    "Pixora verification API"
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 503 when a configured database does not answer.
async fn readiness(State(state): State<AppState>) -> Result<&'static str, AppError> {
    if let Some(pool) = &state.db_pool {
        db::ping(pool).await.map_err(|e| {
            tracing::warn!(error = %e, "readiness check failed: database unreachable");
            AppError::ServiceUnavailable("database unreachable".into())
        })?;
    }
    Ok("ready")
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    database: &'static str,
}

/// Aggregate health: service status plus database connectivity.
async fn health_status(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let database = match &state.db_pool {
        None => "in_memory",
        Some(pool) => match db::ping(pool).await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::warn!(error = %e, "health check: database unreachable");
                "disconnected"
            }
        },
    };
    let (code, status) = if database == "disconnected" {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::OK, "healthy")
    };
    (code, Json(HealthStatus { status, database }))
}
