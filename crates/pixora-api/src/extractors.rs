//! # Custom Extractors & Validation
//!
//! Request DTOs arrive as loosely-typed JSON and are converted into
//! validated domain values before any handler logic runs. The
//! [`IntoDomain`] trait names that conversion; the helpers below map both
//! deserialization and validation failures to [`AppError::BadRequest`].

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;
use pixora_core::ValidationError;

use crate::error::AppError;

/// Request types that convert into a validated domain value.
pub trait IntoDomain {
    type Output;

    fn into_domain(self) -> Result<Self::Output, ValidationError>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and convert it with [`IntoDomain`].
pub fn extract_domain<T: IntoDomain>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T::Output, AppError> {
    let value = extract_json(result)?;
    Ok(value.into_domain()?)
}

/// Extract query parameters, mapping rejections to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}
