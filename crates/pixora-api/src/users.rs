//! # User Directory
//!
//! Read-only lookup of the marketplace's user accounts. Account creation
//! and credentials live elsewhere; this service only needs the profile of
//! the caller it is serving, including the role that decides whether they
//! may review requests.

use std::path::Path;

use pixora_core::UserId;
use pixora_state::Applicant;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use crate::auth::Role;
use crate::db;
use crate::state::Store;
use crate::store::StoreError;

/// A user account as seen by this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
}

impl UserProfile {
    /// The identity snapshot copied into a new verification request.
    pub fn applicant(&self) -> Applicant {
        Applicant::new(
            self.id.clone(),
            &self.email,
            &self.first_name,
            &self.last_name,
        )
    }
}

/// Failure loading a users file.
#[derive(Error, Debug)]
pub enum UsersFileError {
    #[error("cannot read users file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed users file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Where user profiles are looked up.
#[derive(Debug, Clone)]
pub enum UserDirectory {
    Memory(Store<UserId, UserProfile>),
    Postgres(PgPool),
}

impl UserDirectory {
    /// In-memory directory holding exactly `profiles`.
    pub fn in_memory(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        let store = Store::new();
        for profile in profiles {
            store.insert(profile.id.clone(), profile);
        }
        Self::Memory(store)
    }

    /// In-memory directory loaded from a JSON array of profiles.
    pub fn from_json_file(path: &Path) -> Result<Self, UsersFileError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| UsersFileError::Io {
            path: display.clone(),
            source,
        })?;
        let profiles: Vec<UserProfile> =
            serde_json::from_str(&raw).map_err(|source| UsersFileError::Parse {
                path: display,
                source,
            })?;
        tracing::info!(count = profiles.len(), "loaded user profiles");
        Ok(Self::in_memory(profiles))
    }

    pub async fn find(&self, id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.get(id)),
            Self::Postgres(pool) => db::users::find_by_id(pool, id).await,
        }
    }
}
