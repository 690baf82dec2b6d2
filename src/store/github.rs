use reqwest::StatusCode;

use super::{Reducer, StateCell};
use crate::api::{ApiClient, ApiError};
use crate::models::{FetchProjectsInput, GitHubProject, RateLimit};
use crate::storage::{SharedStorage, GITHUB_USERNAME_KEY};

pub const USERNAME_NOT_SET: &str = "GitHub username not set";
pub const RATE_LIMIT_EXCEEDED: &str =
    "GitHub API rate limit exceeded. Try again later or add a GitHub token.";
const FETCH_FAILED: &str = "Failed to fetch GitHub projects";
const LIST_FAILED: &str = "Failed to get GitHub projects";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GitHubState {
    pub projects: Vec<GitHubProject>,
    pub username: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    /// Set once `projects` has been loaded from the backend.
    pub initialized: bool,
    pub rate_limit: Option<RateLimit>,
}

impl GitHubState {
    pub fn from_storage(storage: &SharedStorage) -> Self {
        Self {
            username: storage.get(GITHUB_USERNAME_KEY).filter(|u| !u.is_empty()),
            ..Self::default()
        }
    }

    pub fn has_username(&self) -> bool {
        self.username.is_some()
    }

    /// The cached projects, if they can be served without a request.
    fn cached_projects(&self) -> Option<Vec<GitHubProject>> {
        (self.initialized && !self.projects.is_empty()).then(|| self.projects.clone())
    }
}

#[derive(Debug, Clone)]
pub enum GitHubMutation {
    SetProjects(Vec<GitHubProject>),
    SetUsername(Option<String>),
    SetLoading(bool),
    SetError(Option<String>),
    SetInitialized(bool),
    SetRateLimit(Option<RateLimit>),
}

impl Reducer for GitHubState {
    type Mutation = GitHubMutation;

    fn reduce(self, mutation: GitHubMutation) -> Self {
        match mutation {
            GitHubMutation::SetProjects(projects) => Self { projects, ..self },
            GitHubMutation::SetUsername(username) => Self { username, ..self },
            GitHubMutation::SetLoading(loading) => Self { loading, ..self },
            GitHubMutation::SetError(error) => Self { error, ..self },
            GitHubMutation::SetInitialized(initialized) => Self {
                initialized,
                ..self
            },
            GitHubMutation::SetRateLimit(rate_limit) => Self { rate_limit, ..self },
        }
    }
}

/// Options for [`GitHubStore::fetch_projects`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Username to fetch for; the stored username is used when absent.
    pub username: Option<String>,
    /// GitHub token for a higher rate limit.
    pub token: Option<String>,
}

/// 429, or a 403 whose detail mentions the rate limit.
pub fn is_rate_limited(error: &ApiError) -> bool {
    error.is_status(StatusCode::TOO_MANY_REQUESTS)
        || (error.is_status(StatusCode::FORBIDDEN)
            && error.detail().is_some_and(|d| d.contains("rate limit")))
}

/// The backend has nothing listed for this user yet.
fn is_not_found(error: &ApiError) -> bool {
    error.is_status(StatusCode::NOT_FOUND)
        || error
            .detail()
            .is_some_and(|d| d.contains("No projects found"))
}

/// GitHub projects imported for the user, cached after the first load.
#[derive(Debug, Clone)]
pub struct GitHubStore {
    api: ApiClient,
    storage: SharedStorage,
    state: StateCell<GitHubState>,
}

impl GitHubStore {
    pub fn new(api: ApiClient, storage: SharedStorage) -> Self {
        let state = StateCell::new(GitHubState::from_storage(&storage));
        Self {
            api,
            storage,
            state,
        }
    }

    pub fn snapshot(&self) -> GitHubState {
        self.state.snapshot()
    }

    pub fn projects(&self) -> Vec<GitHubProject> {
        self.state.read(|s| s.projects.clone())
    }

    pub fn username(&self) -> Option<String> {
        self.state.read(|s| s.username.clone())
    }

    pub fn has_username(&self) -> bool {
        self.state.read(GitHubState::has_username)
    }

    pub fn initialized(&self) -> bool {
        self.state.read(|s| s.initialized)
    }

    pub fn rate_limit(&self) -> Option<RateLimit> {
        self.state.read(|s| s.rate_limit.clone())
    }

    /// Remember the GitHub username. Does not fetch anything.
    ///
    /// An empty username clears it.
    pub fn set_username(&self, username: &str) {
        let username = username.trim();
        if username.is_empty() {
            self.storage.remove(GITHUB_USERNAME_KEY);
            self.state.commit(GitHubMutation::SetUsername(None));
        } else {
            self.storage.set(GITHUB_USERNAME_KEY, username);
            self.state
                .commit(GitHubMutation::SetUsername(Some(username.to_string())));
        }
    }

    /// Return the cached projects, loading them on first use.
    ///
    /// When the backend has nothing listed and a username is known, the
    /// projects are fetched from GitHub instead. A 404 without a username is
    /// an empty list, not an error.
    pub async fn get_projects(&self) -> Result<Vec<GitHubProject>, ApiError> {
        if let Some(cached) = self.state.read(GitHubState::cached_projects) {
            return Ok(cached);
        }

        self.state.commit(GitHubMutation::SetLoading(true));
        self.state.commit(GitHubMutation::SetError(None));

        let result = match self.api.list_github_projects().await {
            Ok(projects) => {
                self.state
                    .commit(GitHubMutation::SetProjects(projects.clone()));
                self.state.commit(GitHubMutation::SetInitialized(true));
                Ok(projects)
            }
            Err(e) => self.recover_listing(e).await,
        };

        self.state.commit(GitHubMutation::SetLoading(false));
        result
    }

    async fn recover_listing(&self, error: ApiError) -> Result<Vec<GitHubProject>, ApiError> {
        if let Some(username) = self.username() {
            if is_not_found(&error) {
                tracing::info!("No projects listed yet, fetching from GitHub for {}", username);
                return self
                    .fetch_projects(FetchOptions {
                        username: Some(username),
                        token: None,
                    })
                    .await;
            }
        }

        if error.is_status(StatusCode::NOT_FOUND) {
            tracing::debug!("No projects listed yet");
        } else {
            tracing::warn!("Failed to get GitHub projects: {}", error);
            self.state
                .commit(GitHubMutation::SetError(Some(error.message_or(LIST_FAILED))));
        }
        Ok(Vec::new())
    }

    /// Import projects from GitHub, replacing the cache.
    ///
    /// Without a username (given or stored) this records an error and
    /// returns an empty list without sending anything.
    pub async fn fetch_projects(
        &self,
        options: FetchOptions,
    ) -> Result<Vec<GitHubProject>, ApiError> {
        let Some(username) = options
            .username
            .filter(|u| !u.is_empty())
            .or_else(|| self.username())
        else {
            self.state
                .commit(GitHubMutation::SetError(Some(USERNAME_NOT_SET.to_string())));
            return Ok(Vec::new());
        };

        self.state.commit(GitHubMutation::SetLoading(true));
        self.state.commit(GitHubMutation::SetError(None));

        let input = FetchProjectsInput {
            username,
            token: options.token,
        };
        let result = self.api.fetch_github_projects(&input).await;
        match result {
            Ok(ref projects) => {
                tracing::info!("Fetched {} projects for {}", projects.len(), input.username);
                self.state
                    .commit(GitHubMutation::SetProjects(projects.clone()));
                self.state.commit(GitHubMutation::SetInitialized(true));
            }
            Err(ref e) => {
                tracing::warn!("Failed to fetch GitHub projects: {}", e);
                let message = if is_rate_limited(e) {
                    RATE_LIMIT_EXCEEDED.to_string()
                } else {
                    e.message_or(FETCH_FAILED)
                };
                self.state.commit(GitHubMutation::SetError(Some(message)));
            }
        }

        self.state.commit(GitHubMutation::SetLoading(false));
        result
    }

    /// Look up the current GitHub quota. Failures are logged and yield `None`.
    pub async fn get_rate_limit(&self, token: Option<&str>) -> Option<RateLimit> {
        match self.api.get_github_rate_limit(token).await {
            Ok(rate_limit) => {
                self.state
                    .commit(GitHubMutation::SetRateLimit(Some(rate_limit.clone())));
                Some(rate_limit)
            }
            Err(e) => {
                tracing::warn!("Failed to get rate limit info: {}", e);
                None
            }
        }
    }
}
