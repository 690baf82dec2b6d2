//! The application context handed to the front end.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::router::{guard, Navigator, Route};
use crate::storage::{FileStorage, SharedStorage, StorageError};
use crate::store::{ApplicationsStore, AuthStore, GitHubStore, SessionEvent};

const EVENT_CAPACITY: usize = 16;

/// Storage, API client and the three stores, wired together.
#[derive(Debug, Clone)]
pub struct JobTracker {
    pub storage: SharedStorage,
    pub api: ApiClient,
    pub auth: AuthStore,
    pub applications: ApplicationsStore,
    pub github: GitHubStore,
}

impl JobTracker {
    /// Open the configured storage file and connect to the configured backend.
    pub fn new(config: &ClientConfig) -> Result<Self, StorageError> {
        let storage = match config.storage_path {
            Some(ref path) => FileStorage::open(path)?,
            None => FileStorage::open_default()?,
        };
        tracing::debug!("Using storage at {}", storage.path().display());
        let tracker = Self::with_storage(config.base_url.clone(), Arc::new(storage));
        tracing::debug!("Using backend at {}", tracker.api.base_url());
        Ok(tracker)
    }

    pub fn with_storage(base_url: impl Into<String>, storage: SharedStorage) -> Self {
        let api = ApiClient::new(base_url, Arc::clone(&storage));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            auth: AuthStore::new(api.clone(), Arc::clone(&storage), events),
            applications: ApplicationsStore::new(api.clone()),
            github: GitHubStore::new(api.clone(), Arc::clone(&storage)),
            storage,
            api,
        }
    }

    /// A navigator starting at `start` (through the guard) that follows session events.
    pub fn navigator(&self, start: Route) -> Navigator {
        let start = guard(start, self.auth.is_authenticated());
        Navigator::new(start, self.auth.subscribe())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.auth.subscribe()
    }
}
