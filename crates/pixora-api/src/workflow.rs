//! # Verification Workflow
//!
//! The service behind both HTTP surfaces. Users submit and list their own
//! requests; admins list by status and decide pending requests.
//!
//! ## Invariants
//!
//! - A user has at most one pending request at any instant. The check and
//!   the insert are one store operation.
//! - Approved and rejected are terminal. A decision is applied with a
//!   conditional update that matches on `status = pending`, so of two
//!   reviewers racing on the same request exactly one wins.
//! - Listings are ordered by `request_date` descending, ties by id.

use chrono::Utc;
use pixora_core::RequestId;
use pixora_state::{
    DecisionError, ReviewDecision, StatusFilter, TransitionError, VerificationRequest,
    VerificationStatus, VerificationSubmission,
};
use thiserror::Error;

use crate::auth::Identity;
use crate::state::EmptyListPolicy;
use crate::store::{DocumentStore, RequestFilter, StatusPatch, StoreError};

/// Workflow failure, one variant per outcome a caller can act on.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("You already have a pending verification request")]
    ConflictExistingPending,

    #[error(transparent)]
    InvalidState(#[from] TransitionError),

    #[error("{0}")]
    NotFound(String),

    #[error("verification request {0} was modified concurrently, reload and retry")]
    ConcurrentModification(RequestId),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicatePending(_) => Self::ConflictExistingPending,
            other => Self::Store(other),
        }
    }
}

impl From<DecisionError> for WorkflowError {
    fn from(err: DecisionError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<pixora_core::ValidationError> for WorkflowError {
    fn from(err: pixora_core::ValidationError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

/// Result of a successful review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub id: RequestId,
    pub status: VerificationStatus,
}

impl ReviewOutcome {
    /// Confirmation text returned to the reviewer.
    pub fn message(&self) -> String {
        format!(
            "Verification request {} status updated to {}",
            self.id, self.status
        )
    }
}

#[derive(Debug, Clone)]
pub struct VerificationWorkflow {
    store: DocumentStore,
    empty_list_policy: EmptyListPolicy,
}

impl VerificationWorkflow {
    pub fn new(store: DocumentStore, empty_list_policy: EmptyListPolicy) -> Self {
        Self {
            store,
            empty_list_policy,
        }
    }

    /// Open a new pending request for the caller.
    pub async fn submit(
        &self,
        identity: &Identity,
        submission: VerificationSubmission,
    ) -> Result<RequestId, WorkflowError> {
        let record =
            VerificationRequest::open(identity.user.applicant(), submission, Utc::now());
        let id = match self.store.insert(record).await {
            Ok(id) => id,
            Err(StoreError::DuplicatePending(user_id)) => {
                tracing::info!(user_id = %user_id, "submission refused: request already pending");
                return Err(WorkflowError::ConflictExistingPending);
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            request_id = %id,
            user_id = %identity.user_id(),
            status = %VerificationStatus::Pending,
            "verification request submitted"
        );
        Ok(id)
    }

    /// Every request the caller has submitted, newest first.
    pub async fn list_mine(
        &self,
        identity: &Identity,
    ) -> Result<Vec<VerificationRequest>, WorkflowError> {
        let filter = RequestFilter::for_user(identity.user_id().clone());
        Ok(self.store.find_many(&filter).await?)
    }

    /// Admin listing by status, newest first.
    pub async fn list_by_status(
        &self,
        identity: &Identity,
        filter: StatusFilter,
    ) -> Result<Vec<VerificationRequest>, WorkflowError> {
        require_admin(identity)?;

        let records = self
            .store
            .find_many(&RequestFilter::by_status(filter))
            .await?;

        if records.is_empty() && self.empty_list_policy == EmptyListPolicy::NotFound {
            return Err(WorkflowError::NotFound(format!("No {} found", filter.describe())));
        }
        Ok(records)
    }

    /// Approve or reject a pending request.
    ///
    /// `request_id` and `decision` are taken raw from the caller. Validation
    /// order: caller role, decision value, request id, current status.
    pub async fn review_decision(
        &self,
        identity: &Identity,
        request_id: &str,
        decision: &str,
    ) -> Result<ReviewOutcome, WorkflowError> {
        require_admin(identity)?;

        let decision: ReviewDecision = decision.parse()?;
        let id: RequestId = request_id
            .parse()
            .map_err(|_| WorkflowError::NotFound("Verification request not found".into()))?;

        let current = self
            .store
            .find_one(&RequestFilter::by_id(id))
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Verification request not found".into()))?;

        current.check_decision(decision)?;
        self.apply_decision(identity, &current, decision).await
    }

    /// Write a decision checked against `current`. The write only lands if
    /// the stored request is still pending.
    async fn apply_decision(
        &self,
        identity: &Identity,
        current: &VerificationRequest,
        decision: ReviewDecision,
    ) -> Result<ReviewOutcome, WorkflowError> {
        let id = current.id;
        let guarded = RequestFilter::by_id(id).with_status(VerificationStatus::Pending);
        let modified = self
            .store
            .conditional_update(&guarded, StatusPatch { decision })
            .await?;
        if modified == 0 {
            tracing::warn!(request_id = %id, "review lost a race with another reviewer");
            return Err(WorkflowError::ConcurrentModification(id));
        }

        let status = decision.target_status();
        tracing::info!(
            request_id = %id,
            user_id = %current.user_id,
            reviewer = %identity.user_id(),
            status = %status,
            "verification request reviewed"
        );
        Ok(ReviewOutcome { id, status })
    }
}

fn require_admin(identity: &Identity) -> Result<(), WorkflowError> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(WorkflowError::Forbidden(format!(
            "role 'admin' required, caller has '{}'",
            identity.role().as_str()
        )))
    }
}
