//! # Validation Errors
//!
//! Errors raised when constructing a domain primitive from untrusted input.
//! Each variant names the offending field so the API layer can return a
//! precise message without re-inspecting the request.

use thiserror::Error;

/// Rejected input for a domain primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was missing or blank.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// A URL field did not parse.
    #[error("{field} is not a valid URL: {reason}")]
    InvalidUrl {
        /// Field that carried the URL.
        field: &'static str,
        /// Parser diagnostic.
        reason: String,
    },

    /// A URL parsed but uses a scheme other than http/https.
    #[error("{field} must use http or https, got '{scheme}'")]
    UnsupportedScheme {
        /// Field that carried the URL.
        field: &'static str,
        /// The rejected scheme.
        scheme: String,
    },

    /// A verification request identifier was not a UUID.
    #[error("invalid request id '{0}'")]
    InvalidRequestId(String),
}
