//! HTTP access to the Job Tracker backend.

mod client;
mod error;

pub use client::{ApiClient, DEFAULT_URL};
pub use error::{ApiError, ErrorBody, ErrorDetail, ValidationIssue};
