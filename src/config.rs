//! Client configuration.
//!
//! Read from environment variables, with CLI flags taking precedence:
//! - `JOB_TRACKER_URL` - Backend base URL (default: `http://localhost:8000/api/v1`)
//! - `JOB_TRACKER_STORAGE` - Path of the storage file (default: platform data directory)

use std::path::PathBuf;

use crate::api::DEFAULT_URL;

pub const URL_VAR: &str = "JOB_TRACKER_URL";
pub const STORAGE_VAR: &str = "JOB_TRACKER_STORAGE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Storage file; `None` means the platform data directory.
    pub storage_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_URL.to_string(),
            storage_path: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            base_url: get(URL_VAR).unwrap_or_else(|| DEFAULT_URL.to_string()),
            storage_path: get(STORAGE_VAR).map(PathBuf::from),
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url;
        }
        self
    }

    pub fn with_storage_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.storage_path = path;
        }
        self
    }
}
