//! # Verification Request State Machine
//!
//! Three states, two terminal. The request record carries its own status and
//! refuses any change that the transition table does not list.
//!
//! ## Design Decision
//!
//! With a single non-terminal state the typestate pattern would add two
//! zero-sized types and no safety: the interesting check (is the stored
//! record still pending?) happens at runtime against data read from a
//! store. An enum plus a table lookup is used instead.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use pixora_core::{ArticleLink, RequestId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::submission::{Applicant, VerificationSubmission};

// ─── Status ──────────────────────────────────────────────────────────

/// Lifecycle state of a verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Awaiting admin review. The only non-terminal state.
    Pending,
    /// Admin accepted the request. Terminal.
    Approved,
    /// Admin declined the request. Terminal.
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether no further transition is permitted.
    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// States reachable from this one in a single step.
    pub fn valid_transitions(&self) -> &'static [VerificationStatus] {
        match self {
            Self::Pending => &[Self::Approved, Self::Rejected],
            Self::Approved | Self::Rejected => &[],
        }
    }

    pub fn can_transition_to(&self, target: VerificationStatus) -> bool {
        self.valid_transitions().contains(&target)
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored status string that is not one of the three known states.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown verification status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for VerificationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// ─── Review Decision ─────────────────────────────────────────────────

/// What an admin may decide about a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    /// The status a request ends in after this decision.
    pub fn target_status(&self) -> VerificationStatus {
        match self {
            Self::Approved => VerificationStatus::Approved,
            Self::Rejected => VerificationStatus::Rejected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.target_status().as_str()
    }
}

impl std::fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected review decision input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecisionError {
    #[error("invalid status '{0}'. Allowed values are 'approved' or 'rejected'")]
    Unsupported(String),
}

impl FromStr for ReviewDecision {
    type Err = DecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(DecisionError::Unsupported(other.to_string())),
        }
    }
}

// ─── Status Filter ───────────────────────────────────────────────────

/// Admin listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    All,
    Pending,
    Approved,
    Rejected,
}

impl StatusFilter {
    /// The status to match, or `None` for every status.
    pub fn status(&self) -> Option<VerificationStatus> {
        match self {
            Self::All => None,
            Self::Pending => Some(VerificationStatus::Pending),
            Self::Approved => Some(VerificationStatus::Approved),
            Self::Rejected => Some(VerificationStatus::Rejected),
        }
    }

    /// Human description used in "nothing found" messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::All => "verification requests",
            Self::Pending => "pending verification requests",
            Self::Approved => "approved verification requests",
            Self::Rejected => "rejected verification requests",
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// A status change the transition table does not allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("only pending requests can be updated (request {id} is {from}, attempted {to})")]
    NotPending {
        id: RequestId,
        from: VerificationStatus,
        to: VerificationStatus,
    },
}

// ─── Record ──────────────────────────────────────────────────────────

/// A verification request as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub id: RequestId,
    pub user_id: UserId,
    pub user_email: String,
    pub user_name: String,
    pub address: String,
    pub id_front_image: String,
    pub id_back_image: String,
    pub about_user_article_link: ArticleLink,
    pub status: VerificationStatus,
    /// Set once at creation.
    pub request_date: DateTime<Utc>,
}

impl VerificationRequest {
    /// Open a new pending request for `applicant`, dated `now`.
    pub fn open(
        applicant: Applicant,
        submission: VerificationSubmission,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            user_id: applicant.user_id,
            user_email: applicant.email,
            user_name: applicant.name,
            address: submission.address,
            id_front_image: submission.id_front_image,
            id_back_image: submission.id_back_image,
            about_user_article_link: submission.about_user_article_link,
            status: VerificationStatus::Pending,
            request_date: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == VerificationStatus::Pending
    }

    /// Check that `decision` is allowed from the current status without
    /// changing anything.
    pub fn check_decision(&self, decision: ReviewDecision) -> Result<(), TransitionError> {
        let to = decision.target_status();
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(TransitionError::NotPending {
                id: self.id,
                from: self.status,
                to,
            })
        }
    }

    /// Apply an admin decision. Only pending requests move.
    pub fn apply_decision(
        &mut self,
        decision: ReviewDecision,
    ) -> Result<VerificationStatus, TransitionError> {
        self.check_decision(decision)?;
        self.status = decision.target_status();
        Ok(self.status)
    }

    /// Listing order: newest `request_date` first, ties broken by id
    /// (descending) so that repeated listings are identical.
    pub fn newest_first(a: &Self, b: &Self) -> Ordering {
        b.request_date
            .cmp(&a.request_date)
            .then_with(|| b.id.cmp(&a.id))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn applicant(user: &str) -> Applicant {
        Applicant::new(UserId::new(user).unwrap(), "john.doe@example.com", "John", "Doe")
    }

    fn submission() -> VerificationSubmission {
        VerificationSubmission::new("1 Main St", "b64a", "b64b", "https://x.example/u").unwrap()
    }

    fn make_request() -> VerificationRequest {
        VerificationRequest::open(applicant("U1"), submission(), Utc::now())
    }

    // ── Status table ─────────────────────────────────────────────────

    #[test]
    fn pending_is_the_only_non_terminal_state() {
        assert!(!VerificationStatus::Pending.is_terminal());
        assert!(VerificationStatus::Approved.is_terminal());
        assert!(VerificationStatus::Rejected.is_terminal());
    }

    #[test]
    fn nothing_transitions_into_pending() {
        for s in [
            VerificationStatus::Pending,
            VerificationStatus::Approved,
            VerificationStatus::Rejected,
        ] {
            assert!(!s.can_transition_to(VerificationStatus::Pending));
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            VerificationStatus::Pending,
            VerificationStatus::Approved,
            VerificationStatus::Rejected,
        ] {
            assert_eq!(s.as_str().parse::<VerificationStatus>().unwrap(), s);
        }
        assert!("PENDING".parse::<VerificationStatus>().is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&VerificationStatus::Approved).unwrap(),
            "\"approved\""
        );
    }

    // ── Decisions ────────────────────────────────────────────────────

    #[test]
    fn decision_parses_allowed_values_only() {
        assert_eq!("approved".parse::<ReviewDecision>().unwrap(), ReviewDecision::Approved);
        assert_eq!("rejected".parse::<ReviewDecision>().unwrap(), ReviewDecision::Rejected);
        assert_eq!(
            "cancelled".parse::<ReviewDecision>().unwrap_err(),
            DecisionError::Unsupported("cancelled".to_string())
        );
        assert!("pending".parse::<ReviewDecision>().is_err());
    }

    #[test]
    fn status_filter_maps_to_status() {
        assert_eq!(StatusFilter::All.status(), None);
        assert_eq!(StatusFilter::Pending.status(), Some(VerificationStatus::Pending));
        assert_eq!(StatusFilter::Rejected.status(), Some(VerificationStatus::Rejected));
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    #[test]
    fn new_request_is_pending_with_snapshot() {
        let r = make_request();
        assert!(r.is_pending());
        assert_eq!(r.user_id.as_str(), "U1");
        assert_eq!(r.user_name, "John Doe");
        assert_eq!(r.user_email, "john.doe@example.com");
    }

    #[test]
    fn approve_pending_request() {
        let mut r = make_request();
        assert_eq!(
            r.apply_decision(ReviewDecision::Approved).unwrap(),
            VerificationStatus::Approved
        );
        assert_eq!(r.status, VerificationStatus::Approved);
    }

    #[test]
    fn reject_pending_request() {
        let mut r = make_request();
        r.apply_decision(ReviewDecision::Rejected).unwrap();
        assert_eq!(r.status, VerificationStatus::Rejected);
    }

    #[test]
    fn terminal_request_refuses_any_decision() {
        let mut r = make_request();
        r.apply_decision(ReviewDecision::Approved).unwrap();
        let err = r.apply_decision(ReviewDecision::Rejected).unwrap_err();
        assert_eq!(
            err,
            TransitionError::NotPending {
                id: r.id,
                from: VerificationStatus::Approved,
                to: VerificationStatus::Rejected,
            }
        );
        assert!(r.apply_decision(ReviewDecision::Approved).is_err());
        assert_eq!(r.status, VerificationStatus::Approved);
    }

    #[test]
    fn request_date_survives_decision() {
        let mut r = make_request();
        let before = r.request_date;
        r.apply_decision(ReviewDecision::Rejected).unwrap();
        assert_eq!(r.request_date, before);
    }

    #[test]
    fn newest_first_orders_by_date_then_id() {
        let now = Utc::now();
        let older = VerificationRequest::open(applicant("U1"), submission(), now - chrono::Duration::seconds(5));
        let newer = VerificationRequest::open(applicant("U1"), submission(), now);
        let mut v = vec![older.clone(), newer.clone()];
        v.sort_by(VerificationRequest::newest_first);
        assert_eq!(v[0].id, newer.id);
        assert_eq!(v[1].id, older.id);
    }

    fn decision_strategy() -> impl Strategy<Value = ReviewDecision> {
        prop_oneof![Just(ReviewDecision::Approved), Just(ReviewDecision::Rejected)]
    }

    proptest! {
        #[test]
        fn only_first_decision_ever_applies(decisions in proptest::collection::vec(decision_strategy(), 1..12)) {
            let mut r = make_request();
            let mut applied = 0usize;
            for d in &decisions {
                if r.apply_decision(*d).is_ok() {
                    applied += 1;
                }
            }
            prop_assert_eq!(applied, 1);
            prop_assert_eq!(r.status, decisions[0].target_status());
            prop_assert!(r.status.is_terminal());
        }
    }
}
