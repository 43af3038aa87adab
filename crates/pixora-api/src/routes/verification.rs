//! # Verification Requests: User Surface
//!
//! A signed-in user asks to be verified by handing in an address, both
//! sides of an identity document, and a link to an article about them.
//! They can then follow the progress of their requests.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pixora_core::{format_request_date, RequestId, ValidationError};
use pixora_state::{VerificationRequest, VerificationStatus, VerificationSubmission};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Identity;
use crate::error::AppError;
use crate::extractors::{extract_domain, IntoDomain};
use crate::state::AppState;

/// Verification request submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitVerificationRequest {
    pub address: String,
    /// Front of the identity document, base64-encoded image.
    pub id_front_image: String,
    /// Back of the identity document, base64-encoded image.
    pub id_back_image: String,
    /// Absolute http(s) URL of an article about the user.
    pub about_user_article_link: String,
}

impl IntoDomain for SubmitVerificationRequest {
    type Output = VerificationSubmission;

    fn into_domain(self) -> Result<VerificationSubmission, ValidationError> {
        VerificationSubmission::new(
            &self.address,
            &self.id_front_image,
            &self.id_back_image,
            &self.about_user_article_link,
        )
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitVerificationResponse {
    pub message: String,
    #[schema(value_type = String, format = Uuid)]
    pub request_id: RequestId,
}

/// A verification request as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerificationRequestResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: RequestId,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub address: String,
    pub id_front_image: String,
    pub id_back_image: String,
    pub about_user_article_link: String,
    /// `pending`, `approved` or `rejected`.
    #[schema(value_type = String)]
    pub status: VerificationStatus,
    /// UTC, formatted `YYYY-MM-DD HH:MM:SS`.
    pub request_date: String,
}

impl From<VerificationRequest> for VerificationRequestResponse {
    fn from(r: VerificationRequest) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id.to_string(),
            user_email: r.user_email,
            user_name: r.user_name,
            address: r.address,
            id_front_image: r.id_front_image,
            id_back_image: r.id_back_image,
            about_user_article_link: r.about_user_article_link.to_string(),
            status: r.status,
            request_date: format_request_date(&r.request_date),
        }
    }
}

pub(crate) fn into_responses(records: Vec<VerificationRequest>) -> Vec<VerificationRequestResponse> {
    records.into_iter().map(Into::into).collect()
}

/// Build the user verification router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/user/verification-request",
            post(submit_verification_request),
        )
        .route(
            "/api/user/verification-requests",
            get(list_my_verification_requests),
        )
}

/// POST /api/user/verification-request: Submit a verification request.
#[utoipa::path(
    post,
    path = "/api/user/verification-request",
    request_body = SubmitVerificationRequest,
    responses(
        (status = 201, description = "Request created", body = SubmitVerificationResponse),
        (status = 400, description = "Invalid input or a request is already pending", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid credentials", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "verification"
)]
async fn submit_verification_request(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<SubmitVerificationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitVerificationResponse>), AppError> {
    let submission = extract_domain(body)?;
    let request_id = state.workflow.submit(&identity, submission).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitVerificationResponse {
            message: "Verification request submitted successfully".to_string(),
            request_id,
        }),
    ))
}

/// GET /api/user/verification-requests: The caller's requests, newest first.
#[utoipa::path(
    get,
    path = "/api/user/verification-requests",
    responses(
        (status = 200, description = "Caller's verification requests", body = Vec<VerificationRequestResponse>),
        (status = 401, description = "Missing or invalid credentials", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "verification"
)]
async fn list_my_verification_requests(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<VerificationRequestResponse>>, AppError> {
    let records = state.workflow.list_mine(&identity).await?;
    Ok(Json(into_responses(records)))
}
