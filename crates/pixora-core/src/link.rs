//! # Article Link
//!
//! The `about_user_article_link` of a verification request must be an
//! absolute http(s) URL. [`ArticleLink`] is only constructible through
//! [`ArticleLink::parse`], so a stored request always carries a link that
//! passed this check.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ValidationError;

const FIELD: &str = "about_user_article_link";

/// A validated absolute http/https URL, kept exactly as submitted apart
/// from surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArticleLink(String);

impl ArticleLink {
    /// Validate a link. `Url` is only used for the check; the trimmed input
    /// is what gets stored.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyField(FIELD));
        }
        let url = Url::parse(trimmed).map_err(|e| ValidationError::InvalidUrl {
            field: FIELD,
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ValidationError::UnsupportedScheme {
                    field: FIELD,
                    scheme: other.to_string(),
                })
            }
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ValidationError::InvalidUrl {
                field: FIELD,
                reason: "missing host".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ArticleLink {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ArticleLink> for String {
    fn from(link: ArticleLink) -> Self {
        link.0
    }
}

impl std::fmt::Display for ArticleLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
