//! Wire types for the Job Tracker backend.
//!
//! # Core Concepts
//!
//! - [`User`]: The authenticated account, returned by `/auth/me`.
//! - [`Application`]: A tracked job application. Identity is `id`; the
//!   store only relies on `id` and `status`, everything else is carried along.
//! - [`GitHubProject`]: A repository imported from GitHub for a username,
//!   used as material for generated outreach emails.
//! - [`RateLimit`]: The last known GitHub API quota.

mod application;
mod github;
mod user;

pub use application::*;
pub use github::*;
pub use user::*;
