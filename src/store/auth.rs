use reqwest::StatusCode;
use tokio::sync::broadcast;

use super::{Reducer, StateCell};
use crate::api::{ApiClient, ApiError};
use crate::models::{Credentials, NewUser, User};
use crate::storage::{SharedStorage, TOKEN_KEY};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const FETCH_USER_FAILED: &str = "Failed to fetch user";

/// Session transitions, published for whoever drives navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Registered,
    LoggedOut,
}

/// Where the session currently stands, derived from [`AuthState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Anonymous,
    Authenticating,
    Authenticated,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub token: Option<String>,
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
}

impl AuthState {
    /// Initial state, picking up a token left in storage by a previous run.
    pub fn from_storage(storage: &SharedStorage) -> Self {
        Self {
            token: storage.get(TOKEN_KEY).filter(|t| !t.is_empty()),
            ..Self::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn status(&self) -> AuthStatus {
        if self.loading {
            AuthStatus::Authenticating
        } else if self.token.is_some() {
            AuthStatus::Authenticated
        } else if self.error.is_some() {
            AuthStatus::Error
        } else {
            AuthStatus::Anonymous
        }
    }
}

#[derive(Debug, Clone)]
pub enum AuthMutation {
    SetToken(String),
    SetUser(User),
    SetLoading(bool),
    SetError(Option<String>),
    Logout,
}

impl Reducer for AuthState {
    type Mutation = AuthMutation;

    fn reduce(self, mutation: AuthMutation) -> Self {
        match mutation {
            AuthMutation::SetToken(token) => Self {
                token: Some(token),
                ..self
            },
            AuthMutation::SetUser(user) => Self {
                user: Some(user),
                ..self
            },
            AuthMutation::SetLoading(loading) => Self { loading, ..self },
            AuthMutation::SetError(error) => Self { error, ..self },
            AuthMutation::Logout => Self {
                token: None,
                user: None,
                ..self
            },
        }
    }
}

/// Session store: login, registration, profile and logout.
#[derive(Debug, Clone)]
pub struct AuthStore {
    api: ApiClient,
    storage: SharedStorage,
    state: StateCell<AuthState>,
    events: broadcast::Sender<SessionEvent>,
}

impl AuthStore {
    pub fn new(
        api: ApiClient,
        storage: SharedStorage,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let state = StateCell::new(AuthState::from_storage(&storage));
        Self {
            api,
            storage,
            state,
            events,
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.snapshot()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read(AuthState::is_authenticated)
    }

    pub fn user(&self) -> Option<User> {
        self.state.read(|s| s.user.clone())
    }

    pub fn status(&self) -> AuthStatus {
        self.state.read(AuthState::status)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine, e.g. in one-shot CLI commands.
        let _ = self.events.send(event);
    }

    /// Log in, persist the token and load the profile.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        self.state.commit(AuthMutation::SetLoading(true));
        self.state.commit(AuthMutation::SetError(None));

        let result = self.try_login(credentials).await;
        if let Err(ref e) = result {
            tracing::warn!("Login failed: {}", e);
            self.state
                .commit(AuthMutation::SetError(Some(e.message_or(LOGIN_FAILED))));
        }

        self.state.commit(AuthMutation::SetLoading(false));
        result
    }

    async fn try_login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        let token = self.api.login(credentials).await?;

        self.storage.set(TOKEN_KEY, &token.access_token);
        self.state.commit(AuthMutation::SetToken(token.access_token));

        let user = self.api.get_profile().await?;
        self.state.commit(AuthMutation::SetUser(user.clone()));

        tracing::info!("Logged in as {}", user.username);
        self.emit(SessionEvent::LoggedIn);
        Ok(user)
    }

    /// Create an account. The caller still has to log in afterwards.
    pub async fn register(&self, new_user: &NewUser) -> Result<User, ApiError> {
        self.state.commit(AuthMutation::SetLoading(true));
        self.state.commit(AuthMutation::SetError(None));

        let result = self.api.register(new_user).await;
        match result {
            Ok(ref user) => {
                tracing::info!("Registered {}", user.username);
                self.emit(SessionEvent::Registered);
            }
            Err(ref e) => {
                tracing::warn!("Registration failed: {}", e);
                self.state.commit(AuthMutation::SetError(Some(
                    e.message_or(REGISTRATION_FAILED),
                )));
            }
        }

        self.state.commit(AuthMutation::SetLoading(false));
        result
    }

    /// Refresh the profile of the stored session.
    ///
    /// Returns `Ok(None)` without any request when no token is stored. A 401
    /// means the token was rejected and ends the session.
    pub async fn fetch_user(&self) -> Result<Option<User>, ApiError> {
        if self.storage.get(TOKEN_KEY).filter(|t| !t.is_empty()).is_none() {
            return Ok(None);
        }

        self.state.commit(AuthMutation::SetLoading(true));

        let result = self.api.get_profile().await;
        match result {
            Ok(ref user) => self.state.commit(AuthMutation::SetUser(user.clone())),
            Err(ref e) => {
                tracing::warn!("Failed to fetch user: {}", e);
                self.state.commit(AuthMutation::SetError(Some(
                    e.message_or(FETCH_USER_FAILED),
                )));
                if e.is_status(StatusCode::UNAUTHORIZED) {
                    self.logout();
                }
            }
        }

        self.state.commit(AuthMutation::SetLoading(false));
        result.map(Some)
    }

    /// Forget the session locally. The backend keeps no session to end.
    pub fn logout(&self) {
        self.storage.remove(TOKEN_KEY);
        self.state.commit(AuthMutation::Logout);
        tracing::info!("Logged out");
        self.emit(SessionEvent::LoggedOut);
    }
}
