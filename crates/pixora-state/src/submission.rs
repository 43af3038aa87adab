//! # Submissions
//!
//! What a user hands in when asking to be verified, and the identity
//! snapshot copied into the request at that instant.

use pixora_core::{ArticleLink, UserId, ValidationError};
use serde::{Deserialize, Serialize};

/// Snapshot of the submitting user, denormalized into the request.
///
/// Taken once at submission. Later profile edits do not rewrite it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub user_id: UserId,
    pub email: String,
    /// `"{first_name} {last_name}"`.
    pub name: String,
}

impl Applicant {
    pub fn new(user_id: UserId, email: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            user_id,
            email: email.to_string(),
            name: format!("{} {}", first_name.trim(), last_name.trim())
                .trim()
                .to_string(),
        }
    }
}

/// Validated verification input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationSubmission {
    pub address: String,
    pub id_front_image: String,
    pub id_back_image: String,
    pub about_user_article_link: ArticleLink,
}

impl VerificationSubmission {
    /// Validate raw fields. Every field is required; the link must be an
    /// absolute http(s) URL.
    pub fn new(
        address: &str,
        id_front_image: &str,
        id_back_image: &str,
        about_user_article_link: &str,
    ) -> Result<Self, ValidationError> {
        let address = required("address", address)?;
        let id_front_image = required("id_front_image", id_front_image)?;
        let id_back_image = required("id_back_image", id_back_image)?;
        let about_user_article_link = ArticleLink::parse(about_user_article_link)?;
        Ok(Self {
            address,
            id_front_image,
            id_back_image,
            about_user_article_link,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}
