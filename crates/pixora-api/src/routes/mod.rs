//! # API Route Modules
//!
//! - `verification`: the user surface (`/api/user/*`). Submit a
//!   verification request and list the caller's own requests.
//! - `admin`: the review queue (`/api/admin/*`). Status listings and
//!   approve/reject.

pub mod admin;
pub mod verification;
