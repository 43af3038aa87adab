//! User directory reads. The `users` table is owned by the account service;
//! this crate only looks profiles up.

use pixora_core::UserId;
use sqlx::PgPool;

use crate::auth::Role;
use crate::store::StoreError;
use crate::users::UserProfile;

/// Fetch a user profile by id.
pub async fn find_by_id(pool: &PgPool, id: &UserId) -> Result<Option<UserProfile>, StoreError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, first_name, last_name, role FROM users WHERE id = $1",
    )
    .bind(id.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(UserRow::try_into_profile).transpose()
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
}

impl UserRow {
    /// Unknown roles are errors. An account never falls back to a default
    /// role when the stored value cannot be read.
    fn try_into_profile(self) -> Result<UserProfile, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: self.id.clone(),
            reason,
        };
        let id = UserId::new(self.id.clone()).map_err(|e| corrupt(e.to_string()))?;
        let role: Role = self.role.parse().map_err(corrupt)?;
        Ok(UserProfile {
            id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            role,
        })
    }
}
