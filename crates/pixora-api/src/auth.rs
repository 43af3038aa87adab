//! # Authentication & Authorization Middleware
//!
//! Bearer JWT middleware. Roles are resolved from the user directory.
//!
//! ## Token Format
//!
//! ```text
//! Authorization: Bearer <jwt>
//! ```
//!
//! The JWT is HS256-signed with the configured `AUTH_SECRET` and carries
//! [`Claims`]: `sub` (the user id), `iat` and `exp`. Any other claim is
//! ignored. With no secret configured the gate stays closed: every
//! authenticated route answers 401.
//!
//! ## Identities
//!
//! The middleware injects a [`CallerIdentity`] (the verified subject) into
//! request extensions. Handlers take an [`Identity`] instead, which resolves
//! the subject against the [`UserDirectory`](crate::users::UserDirectory).
//! The caller's role is the one stored on that account; a token naming an
//! unknown user is rejected with 401.

use std::str::FromStr;

use axum::extract::{FromRequestParts, Request};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pixora_core::UserId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;
use crate::users::UserProfile;
use crate::workflow::WorkflowError;

// ── Role ────────────────────────────────────────────────────────────────────

/// Account role, stored on the user record.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Marketplace member. May submit and list their own requests.
    #[default]
    User,
    /// Reviewer. May list every request and decide pending ones.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

// ── Claims ──────────────────────────────────────────────────────────────────

/// JWT claims accepted by the middleware.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a token for `user_id`, valid for `ttl`.
pub fn issue_token(
    secret: &str,
    user_id: &UserId,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify signature and expiry, returning the subject.
pub fn validate_token(token: &str, secret: &str) -> Result<CallerIdentity, String> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| format!("invalid token: {e}"))?;

    let user_id = UserId::new(data.claims.sub).map_err(|e| format!("invalid subject: {e}"))?;
    Ok(CallerIdentity { user_id })
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Subject of a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: UserId,
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Identity ────────────────────────────────────────────────────────────────

/// An authenticated caller resolved to a known user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: UserProfile,
}

impl Identity {
    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }

    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = CallerIdentity::from_request_parts(parts, state).await?;
        match state.users.find(&caller.user_id).await? {
            Some(user) => Ok(Identity { user }),
            None => {
                tracing::warn!(user_id = %caller.user_id, "authentication failed: unknown user");
                Err(WorkflowError::Unauthenticated("could not validate credentials".into()).into())
            }
        }
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the secret to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the Bearer token from the Authorization header and inject the
/// resulting [`CallerIdentity`] into request extensions.
///
/// When `AuthConfig.secret` is `None` no token can be valid and the request
/// is refused.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.secret.clone());

    let Some(secret) = expected else {
        tracing::warn!("authentication failed: no AUTH_SECRET configured");
        return unauthorized_response("authentication is not configured");
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(header_value) if header_value.starts_with("Bearer ") => {
            let provided = &header_value[7..];
            match validate_token(provided, &secret) {
                Ok(identity) => {
                    request.extensions_mut().insert(identity);
                    next.run(request).await
                }
                Err(msg) => {
                    tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                    unauthorized_response("could not validate credentials")
                }
            }
        }
        Some(_) => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            unauthorized_response("authorization header must use Bearer scheme")
        }
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            unauthorized_response("missing authorization header")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    AppError::Unauthorized(message.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::state::AppConfig;
    use crate::users::UserDirectory;

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn token(secret: &str, user: &str) -> String {
        issue_token(secret, &uid(user), Duration::hours(1)).unwrap()
    }

    /// Build a minimal router with the auth middleware and a simple handler.
    fn test_app(secret: Option<String>) -> Router {
        let auth_config = AuthConfig { secret };
        Router::new()
            .route(
                "/test",
                get(|caller: CallerIdentity| async move { caller.user_id.to_string() }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(auth_config))
    }

    fn get_with_auth(value: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/test");
        if let Some(v) = value {
            builder = builder.header("Authorization", v);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn detail_of(response: Response) -> String {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["code"], "UNAUTHORIZED");
        err["detail"].as_str().unwrap().to_string()
    }

    // ── Middleware ───────────────────────────────────────────────

    #[tokio::test]
    async fn valid_bearer_token_accepted() {
        let app = test_app(Some("s3cret".to_string()));
        let header = format!("Bearer {}", token("s3cret", "u1"));
        let response = app.oneshot(get_with_auth(Some(&header))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"u1");
    }

    #[tokio::test]
    async fn missing_authorization_header_rejected() {
        let app = test_app(Some("s3cret".to_string()));
        let response = app.oneshot(get_with_auth(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
        assert!(detail_of(response).await.contains("missing"));
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_rejected() {
        let app = test_app(Some("s3cret".to_string()));
        let header = format!("Bearer {}", token("guess", "u1"));
        let response = app.oneshot(get_with_auth(Some(&header))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(detail_of(response).await, "could not validate credentials");
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let app = test_app(Some("s3cret".to_string()));
        let response = app
            .oneshot(get_with_auth(Some("Basic dXNlcjpwYXNz")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(detail_of(response).await.contains("Bearer"));
    }

    #[tokio::test]
    async fn unconfigured_secret_fails_closed() {
        let app = test_app(None);
        let header = format!("Bearer {}", token("anything", "u1"));
        let response = app.oneshot(get_with_auth(Some(&header))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // ── Token validation ─────────────────────────────────────────

    #[test]
    fn issued_token_validates_to_subject() {
        let caller = validate_token(&token("k", "u-42"), "k").unwrap();
        assert_eq!(caller.user_id.as_str(), "u-42");
    }

    #[test]
    fn expired_token_rejected() {
        let stale = issue_token("k", &uid("u1"), Duration::hours(-2)).unwrap();
        assert!(validate_token(&stale, "k").unwrap_err().contains("invalid token"));
    }

    #[test]
    fn tampered_payload_rejected() {
        let genuine = token("k", "u1");
        let forged_payload = {
            let other = token("k", "a1");
            other.split('.').nth(1).unwrap().to_string()
        };
        let mut parts: Vec<&str> = genuine.split('.').collect();
        parts[1] = &forged_payload;
        let spliced = parts.join(".");
        // Same secret, same header, but the signature covers a different payload.
        assert!(validate_token(&spliced, "k").is_err());
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(validate_token("k", "k").is_err());
        assert!(validate_token("user:u1:k", "k").is_err());
        assert!(validate_token("", "k").is_err());
    }

    #[test]
    fn empty_subject_rejected() {
        let claims = Claims {
            sub: String::new(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let jwt = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"k")).unwrap();
        assert!(validate_token(&jwt, "k").unwrap_err().contains("subject"));
    }

    #[test]
    fn role_parses_stored_values_only() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert!("ADMIN".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn auth_config_debug_redacts() {
        let debug = format!(
            "{:?}",
            AuthConfig {
                secret: Some("hunter2".into())
            }
        );
        assert!(!debug.contains("hunter2"));
    }

    // ── Identity resolution ──────────────────────────────────────

    fn member(id: &str, role: Role) -> UserProfile {
        UserProfile {
            id: uid(id),
            email: format!("{id}@example.com"),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            role,
        }
    }

    fn identity_app(users: UserDirectory) -> Router {
        let state = AppState::with_config(
            AppConfig {
                auth_secret: Some("s3cret".into()),
                ..AppConfig::default()
            },
            users,
        );
        Router::new()
            .route(
                "/whoami",
                get(|identity: Identity| async move {
                    format!("{} {}", identity.user.email, identity.role().as_str())
                }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(AuthConfig {
                secret: Some("s3cret".into()),
            }))
            .with_state(state)
    }

    fn whoami(jwt: &str) -> Request<Body> {
        Request::builder()
            .uri("/whoami")
            .header("Authorization", format!("Bearer {jwt}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn identity_resolves_known_user() {
        let users = UserDirectory::in_memory([member("u1", Role::User)]);
        let response = identity_app(users)
            .oneshot(whoami(&token("s3cret", "u1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"u1@example.com user");
    }

    #[tokio::test]
    async fn role_claim_in_token_is_ignored() {
        #[derive(Serialize)]
        struct Escalated {
            sub: String,
            role: String,
            iat: i64,
            exp: i64,
        }
        let claims = Escalated {
            sub: "u1".into(),
            role: "admin".into(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let jwt = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"s3cret"),
        )
        .unwrap();

        let users = UserDirectory::in_memory([member("u1", Role::User)]);
        let response = identity_app(users).oneshot(whoami(&jwt)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"u1@example.com user");
    }

    #[tokio::test]
    async fn identity_rejects_unknown_user() {
        let response = identity_app(UserDirectory::in_memory([]))
            .oneshot(whoami(&token("s3cret", "ghost")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(detail_of(response).await.contains("could not validate"));
    }
}
