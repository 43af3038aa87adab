//! # pixora-state: Verification Request Lifecycle
//!
//! ## State Machine
//!
//! ```text
//!  [pending] --approve--> [approved]   (terminal)
//!  [pending] --reject-->  [rejected]   (terminal)
//! ```
//!
//! There is no transition out of a terminal state and no transition back
//! into `pending`. The transition table lives in
//! [`VerificationStatus::valid_transitions`]; every mutation goes through
//! [`VerificationRequest::apply_decision`], which consults it.
//!
//! Persistence layers must express the same guard natively (a conditional
//! update matching on the expected prior status) so that two reviewers
//! racing on one request cannot both succeed.

pub mod submission;
pub mod verification;

pub use submission::{Applicant, VerificationSubmission};
pub use verification::{
    DecisionError, ReviewDecision, StatusFilter, TransitionError, UnknownStatus,
    VerificationRequest, VerificationStatus,
};
