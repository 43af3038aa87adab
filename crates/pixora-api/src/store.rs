//! # Verification Request Store
//!
//! Document-store seam over verification requests. Two backends:
//!
//! - **Memory**: a [`Store`] keyed by request id. Every compound operation
//!   runs under a single write lock.
//! - **Postgres**: the `verification_requests` table. The
//!   one-pending-per-user rule is a partial unique index, and the status
//!   guard on updates is part of the `UPDATE ... WHERE` clause.
//!
//! Both backends give the same answers: listings newest first, and
//! conditional updates that report how many records actually changed.

use pixora_core::{RequestId, UserId};
use pixora_state::{ReviewDecision, StatusFilter, VerificationRequest, VerificationStatus};
use sqlx::PgPool;
use thiserror::Error;

use crate::db;
use crate::state::Store;

/// Store failure.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The user already has a pending request.
    #[error("user {0} already has a pending verification request")]
    DuplicatePending(UserId),

    /// A stored row could not be decoded into a domain value.
    #[error("corrupt stored record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Field match for reads and conditional updates. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub id: Option<RequestId>,
    pub user_id: Option<UserId>,
    pub status: Option<VerificationStatus>,
}

impl RequestFilter {
    pub fn by_id(id: RequestId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn by_status(filter: StatusFilter) -> Self {
        Self {
            status: filter.status(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: VerificationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, record: &VerificationRequest) -> bool {
        self.id.map_or(true, |id| record.id == id)
            && self.user_id.as_ref().map_or(true, |u| &record.user_id == u)
            && self.status.map_or(true, |s| record.status == s)
    }
}

/// Change applied by [`DocumentStore::conditional_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPatch {
    pub decision: ReviewDecision,
}

/// Verification request persistence.
#[derive(Debug, Clone)]
pub enum DocumentStore {
    Memory(Store<RequestId, VerificationRequest>),
    Postgres(PgPool),
}

impl DocumentStore {
    pub fn in_memory() -> Self {
        Self::Memory(Store::new())
    }

    /// Persist a new record.
    ///
    /// Refuses a pending record for a user who already has one, atomically
    /// with the insert.
    pub async fn insert(&self, record: VerificationRequest) -> Result<RequestId, StoreError> {
        let id = record.id;
        match self {
            Self::Memory(store) => {
                let user_id = record.user_id.clone();
                let guard_pending = record.is_pending();
                store
                    .insert_unless(id, record, |existing| {
                        guard_pending && existing.is_pending() && existing.user_id == user_id
                    })
                    .map_err(|existing| StoreError::DuplicatePending(existing.user_id))?;
            }
            Self::Postgres(pool) => db::verification_requests::insert(pool, &record).await?,
        }
        Ok(id)
    }

    /// First record matching `filter` in listing order.
    pub async fn find_one(
        &self,
        filter: &RequestFilter,
    ) -> Result<Option<VerificationRequest>, StoreError> {
        match self {
            Self::Memory(_) => Ok(self.find_many(filter).await?.into_iter().next()),
            Self::Postgres(pool) => db::verification_requests::find_one(pool, filter).await,
        }
    }

    /// Every record matching `filter`, newest first.
    pub async fn find_many(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<VerificationRequest>, StoreError> {
        match self {
            Self::Memory(store) => {
                let mut records = store.filter(|r| filter.matches(r));
                records.sort_by(VerificationRequest::newest_first);
                Ok(records)
            }
            Self::Postgres(pool) => db::verification_requests::find_many(pool, filter).await,
        }
    }

    /// Apply `patch` to every record matching `filter`, as one atomic
    /// step per record. Returns how many records changed.
    ///
    /// A record whose status does not permit the decision is left untouched
    /// and not counted, whatever the filter says.
    pub async fn conditional_update(
        &self,
        filter: &RequestFilter,
        patch: StatusPatch,
    ) -> Result<u64, StoreError> {
        match self {
            Self::Memory(store) => Ok(store.update_where(
                |r| filter.matches(r),
                |r| r.apply_decision(patch.decision).is_ok(),
            )),
            Self::Postgres(pool) => {
                db::verification_requests::conditional_update(pool, filter, patch).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pixora_state::{Applicant, VerificationSubmission};

    fn request(user: &str, age_secs: i64) -> VerificationRequest {
        VerificationRequest::open(
            Applicant::new(UserId::new(user).unwrap(), "a@example.com", "Ada", "Lovelace"),
            VerificationSubmission::new("1 Main St", "front", "back", "https://ada.example/bio")
                .unwrap(),
            Utc::now() - Duration::seconds(age_secs),
        )
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn second_pending_insert_for_same_user_is_refused() {
        let store = DocumentStore::in_memory();
        store.insert(request("U1", 10)).await.unwrap();
        let err = store.insert(request("U1", 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePending(u) if u == user("U1")));
        // A different user is unaffected.
        store.insert(request("U2", 0)).await.unwrap();
    }

    #[tokio::test]
    async fn insert_allowed_after_previous_request_decided() {
        let store = DocumentStore::in_memory();
        let first = store.insert(request("U1", 10)).await.unwrap();
        let patch = StatusPatch {
            decision: ReviewDecision::Rejected,
        };
        let n = store
            .conditional_update(&RequestFilter::by_id(first), patch)
            .await
            .unwrap();
        assert_eq!(n, 1);
        store.insert(request("U1", 0)).await.unwrap();
    }

    #[tokio::test]
    async fn find_many_is_newest_first() {
        let store = DocumentStore::in_memory();
        let old = request("U1", 60);
        let mid = request("U2", 30);
        let new = request("U3", 0);
        for r in [mid.clone(), new.clone(), old.clone()] {
            store.insert(r).await.unwrap();
        }
        let ids: Vec<_> = store
            .find_many(&RequestFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![new.id, mid.id, old.id]);
    }

    #[tokio::test]
    async fn filters_combine() {
        let store = DocumentStore::in_memory();
        let a = store.insert(request("U1", 10)).await.unwrap();
        store.insert(request("U2", 5)).await.unwrap();
        store
            .conditional_update(
                &RequestFilter::by_id(a),
                StatusPatch {
                    decision: ReviewDecision::Approved,
                },
            )
            .await
            .unwrap();

        let approved_for_u1 = store
            .find_many(&RequestFilter::for_user(user("U1")).with_status(VerificationStatus::Approved))
            .await
            .unwrap();
        assert_eq!(approved_for_u1.len(), 1);
        assert_eq!(approved_for_u1[0].id, a);

        let pending = store
            .find_many(&RequestFilter::by_status(StatusFilter::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].user_id, user("U2"));

        assert!(store
            .find_one(&RequestFilter::by_id(RequestId::new()))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn conditional_update_guards_on_status() {
        let store = DocumentStore::in_memory();
        let id = store.insert(request("U1", 0)).await.unwrap();
        let guarded = RequestFilter::by_id(id).with_status(VerificationStatus::Pending);
        let approve = StatusPatch {
            decision: ReviewDecision::Approved,
        };
        let reject = StatusPatch {
            decision: ReviewDecision::Rejected,
        };
        assert_eq!(store.conditional_update(&guarded, approve).await.unwrap(), 1);
        assert_eq!(store.conditional_update(&guarded, reject).await.unwrap(), 0);
        // Even without the status in the filter a terminal record does not move.
        assert_eq!(
            store
                .conditional_update(&RequestFilter::by_id(id), reject)
                .await
                .unwrap(),
            0
        );
        let stored = store.find_one(&RequestFilter::by_id(id)).await.unwrap().unwrap();
        assert_eq!(stored.status, VerificationStatus::Approved);
    }
}
