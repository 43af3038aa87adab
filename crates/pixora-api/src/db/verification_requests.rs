//! Verification request persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `verification_requests`
//! table. The transition table itself lives in `pixora-state`; SQL only
//! carries the guard that makes a decision atomic: the row must still be
//! `pending` when the `UPDATE` runs.

use chrono::{DateTime, Utc};
use pixora_core::{ArticleLink, RequestId, UserId};
use pixora_state::{VerificationRequest, VerificationStatus};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::store::{RequestFilter, StatusPatch, StoreError};

/// Name of the partial unique index enforcing one pending request per user.
const ONE_PENDING_PER_USER: &str = "verification_requests_one_pending_per_user";

const SELECT_COLUMNS: &str = "SELECT id, user_id, user_email, user_name, address, \
     id_front_image, id_back_image, about_user_article_link, status, request_date \
     FROM verification_requests";

/// Insert a new request.
///
/// A second pending row for the same user violates
/// `verification_requests_one_pending_per_user` and is reported as
/// [`StoreError::DuplicatePending`].
pub async fn insert(pool: &PgPool, record: &VerificationRequest) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO verification_requests
            (id, user_id, user_email, user_name, address, id_front_image, id_back_image,
             about_user_article_link, status, request_date)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(*record.id.as_uuid())
    .bind(record.user_id.as_str())
    .bind(&record.user_email)
    .bind(&record.user_name)
    .bind(&record.address)
    .bind(&record.id_front_image)
    .bind(&record.id_back_image)
    .bind(record.about_user_article_link.as_str())
    .bind(record.status.as_str())
    .bind(record.request_date)
    .execute(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.constraint() == Some(ONE_PENDING_PER_USER) => {
            StoreError::DuplicatePending(record.user_id.clone())
        }
        _ => StoreError::Database(e),
    })?;

    Ok(())
}

/// First matching request, newest first.
pub async fn find_one(
    pool: &PgPool,
    filter: &RequestFilter,
) -> Result<Option<VerificationRequest>, StoreError> {
    let mut qb = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY request_date DESC, id DESC LIMIT 1");

    let row = qb
        .build_query_as::<VerificationRow>()
        .fetch_optional(pool)
        .await?;

    row.map(VerificationRow::try_into_record).transpose()
}

/// Every matching request, newest first.
pub async fn find_many(
    pool: &PgPool,
    filter: &RequestFilter,
) -> Result<Vec<VerificationRequest>, StoreError> {
    let mut qb = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY request_date DESC, id DESC");

    let rows = qb
        .build_query_as::<VerificationRow>()
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(VerificationRow::try_into_record)
        .collect()
}

/// Set the decided status on every matching row that is still pending.
///
/// Returns the number of rows changed.
pub async fn conditional_update(
    pool: &PgPool,
    filter: &RequestFilter,
    patch: StatusPatch,
) -> Result<u64, StoreError> {
    // Only pending rows may move.
    if filter.status.is_some_and(|s| s != VerificationStatus::Pending) {
        return Ok(0);
    }
    let guarded = filter.clone().with_status(VerificationStatus::Pending);

    let mut qb = QueryBuilder::<Postgres>::new("UPDATE verification_requests SET status = ");
    qb.push_bind(patch.decision.target_status().as_str());
    push_filter(&mut qb, &guarded);

    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected())
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &RequestFilter) {
    let mut sep = " WHERE ";
    if let Some(id) = filter.id {
        qb.push(sep).push("id = ").push_bind(*id.as_uuid());
        sep = " AND ";
    }
    if let Some(user_id) = &filter.user_id {
        qb.push(sep)
            .push("user_id = ")
            .push_bind(user_id.as_str().to_string());
        sep = " AND ";
    }
    if let Some(status) = filter.status {
        qb.push(sep).push("status = ").push_bind(status.as_str());
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct VerificationRow {
    id: Uuid,
    user_id: String,
    user_email: String,
    user_name: String,
    address: String,
    id_front_image: String,
    id_back_image: String,
    about_user_article_link: String,
    status: String,
    request_date: DateTime<Utc>,
}

impl VerificationRow {
    /// Decode a row. Unknown statuses and malformed fields are errors,
    /// never silently defaulted.
    fn try_into_record(self) -> Result<VerificationRequest, StoreError> {
        let corrupt = |reason: String| {
            tracing::error!(id = %self.id, reason = %reason, "undecodable verification request row");
            StoreError::Corrupt {
                id: self.id.to_string(),
                reason,
            }
        };

        let status: VerificationStatus = self.status.parse().map_err(|e| corrupt(format!("{e}")))?;
        let user_id = UserId::new(self.user_id.clone()).map_err(|e| corrupt(e.to_string()))?;
        let about_user_article_link =
            ArticleLink::parse(&self.about_user_article_link).map_err(|e| corrupt(e.to_string()))?;

        Ok(VerificationRequest {
            id: RequestId::from_uuid(self.id),
            user_id,
            user_email: self.user_email,
            user_name: self.user_name,
            address: self.address,
            id_front_image: self.id_front_image,
            id_back_image: self.id_back_image,
            about_user_article_link,
            status,
            request_date: self.request_date,
        })
    }
}
