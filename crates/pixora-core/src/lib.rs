//! # pixora-core: Foundational Types for the Pixora Backend
//!
//! Leaf crate of the workspace. Defines the identifier newtypes, the
//! validated article link, request-date formatting, and the validation
//! error type shared by the state machine and the API layer.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pixora-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod link;
pub mod temporal;

pub use error::ValidationError;
pub use identity::{RequestId, UserId};
pub use link::ArticleLink;
pub use temporal::{format_request_date, REQUEST_DATE_FORMAT};
