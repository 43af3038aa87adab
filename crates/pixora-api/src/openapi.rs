//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pixora Verification API",
        version = "0.1.0",
        description = "Identity-verification requests for the Pixora marketplace: user submission and tracking, admin review queue.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // User surface
        crate::routes::verification::submit_verification_request,
        crate::routes::verification::list_my_verification_requests,
        // Admin review queue
        crate::routes::admin::list_all,
        crate::routes::admin::list_pending,
        crate::routes::admin::list_approved,
        crate::routes::admin::list_rejected,
        crate::routes::admin::update_status,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::auth::Role,
        crate::routes::verification::SubmitVerificationRequest,
        crate::routes::verification::SubmitVerificationResponse,
        crate::routes::verification::VerificationRequestResponse,
        crate::routes::admin::StatusUpdateResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "verification", description = "User verification requests"),
        (name = "admin", description = "Admin review queue"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by every path.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
