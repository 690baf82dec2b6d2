//! Client for the Job Tracker service: a typed API client, durable session
//! storage, and the auth, applications and GitHub state stores.

pub mod api;
pub mod app;
pub mod config;
pub mod models;
pub mod render;
pub mod router;
pub mod storage;
pub mod store;

pub use app::JobTracker;
