//! # Admin Review Queue
//!
//! Status listings over every user's requests, and the approve/reject
//! decision on a pending request. All routes require the `admin` role.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use pixora_state::StatusFilter;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::Identity;
use crate::error::AppError;
use crate::extractors::extract_query;
use crate::routes::verification::{into_responses, VerificationRequestResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusUpdateParams {
    /// `approved` or `rejected`.
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdateResponse {
    pub message: String,
}

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/verification-requests", get(list_all))
        .route(
            "/api/admin/pending-verification-requests",
            get(list_pending),
        )
        .route(
            "/api/admin/approved-verification-requests",
            get(list_approved),
        )
        .route(
            "/api/admin/rejected-verification-requests",
            get(list_rejected),
        )
        .route(
            "/api/admin/verification-requests/:request_id/status",
            put(update_status),
        )
}

async fn list(
    state: &AppState,
    identity: &Identity,
    filter: StatusFilter,
) -> Result<Json<Vec<VerificationRequestResponse>>, AppError> {
    let records = state.workflow.list_by_status(identity, filter).await?;
    Ok(Json(into_responses(records)))
}

/// GET /api/admin/verification-requests: Every request, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/verification-requests",
    responses(
        (status = 200, description = "All verification requests", body = Vec<VerificationRequestResponse>),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Nothing found (not_found listing policy only)", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
async fn list_all(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<VerificationRequestResponse>>, AppError> {
    list(&state, &identity, StatusFilter::All).await
}

/// GET /api/admin/pending-verification-requests
#[utoipa::path(
    get,
    path = "/api/admin/pending-verification-requests",
    responses(
        (status = 200, description = "Pending verification requests", body = Vec<VerificationRequestResponse>),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
async fn list_pending(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<VerificationRequestResponse>>, AppError> {
    list(&state, &identity, StatusFilter::Pending).await
}

/// GET /api/admin/approved-verification-requests
#[utoipa::path(
    get,
    path = "/api/admin/approved-verification-requests",
    responses(
        (status = 200, description = "Approved verification requests", body = Vec<VerificationRequestResponse>),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
async fn list_approved(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<VerificationRequestResponse>>, AppError> {
    list(&state, &identity, StatusFilter::Approved).await
}

/// GET /api/admin/rejected-verification-requests
#[utoipa::path(
    get,
    path = "/api/admin/rejected-verification-requests",
    responses(
        (status = 200, description = "Rejected verification requests", body = Vec<VerificationRequestResponse>),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
async fn list_rejected(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<VerificationRequestResponse>>, AppError> {
    list(&state, &identity, StatusFilter::Rejected).await
}

/// PUT /api/admin/verification-requests/:request_id/status: Approve or reject.
#[utoipa::path(
    put,
    path = "/api/admin/verification-requests/{request_id}/status",
    params(
        ("request_id" = String, Path, description = "Verification request ID"),
        StatusUpdateParams,
    ),
    responses(
        (status = 200, description = "Status updated", body = StatusUpdateResponse),
        (status = 400, description = "Unsupported status or request no longer pending", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Request not found", body = crate::error::ErrorBody),
        (status = 409, description = "Request changed concurrently", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
async fn update_status(
    State(state): State<AppState>,
    identity: Identity,
    Path(request_id): Path<String>,
    params: Result<Query<StatusUpdateParams>, QueryRejection>,
) -> Result<Json<StatusUpdateResponse>, AppError> {
    let params = extract_query(params)?;
    let decision = params.status.as_deref().unwrap_or_default();
    let outcome = state
        .workflow
        .review_decision(&identity, &request_id, decision)
        .await?;
    Ok(Json(StatusUpdateResponse {
        message: outcome.message(),
    }))
}
