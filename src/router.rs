//! Named views, the authentication guard, and session-driven redirects.

use std::fmt;

use tokio::sync::broadcast;

use crate::store::SessionEvent;

/// A named view of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Applications,
    NewApplication,
    EditApplication(String),
    Login,
    Register,
    GitHubProjects,
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Applications => "applications",
            Self::NewApplication => "new-application",
            Self::EditApplication(_) => "edit-application",
            Self::Login => "login",
            Self::Register => "register",
            Self::GitHubProjects => "github-projects",
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Dashboard => "/".to_string(),
            Self::Applications => "/applications".to_string(),
            Self::NewApplication => "/applications/new".to_string(),
            Self::EditApplication(id) => format!("/applications/{}", id),
            Self::Login => "/login".to_string(),
            Self::Register => "/register".to_string(),
            Self::GitHubProjects => "/github".to_string(),
        }
    }

    /// Resolve a path to a route. `/applications/new` wins over the id pattern.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim_end_matches('/');
        match path {
            "" => Some(Self::Dashboard),
            "/applications" => Some(Self::Applications),
            "/applications/new" => Some(Self::NewApplication),
            "/login" => Some(Self::Login),
            "/register" => Some(Self::Register),
            "/github" => Some(Self::GitHubProjects),
            _ => path
                .strip_prefix("/applications/")
                .filter(|id| !id.is_empty() && !id.contains('/'))
                .map(|id| Self::EditApplication(id.to_string())),
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Self::Login | Self::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where navigation to `to` actually lands for the given session.
pub fn guard(to: Route, authenticated: bool) -> Route {
    if to.requires_auth() && !authenticated {
        Route::Login
    } else if !to.requires_auth() && authenticated {
        Route::Dashboard
    } else {
        to
    }
}

/// The view a session transition sends the user to.
pub fn redirect_for(event: SessionEvent) -> Route {
    match event {
        SessionEvent::LoggedIn => Route::Dashboard,
        SessionEvent::Registered | SessionEvent::LoggedOut => Route::Login,
    }
}

/// Tracks the current view and follows session events.
#[derive(Debug)]
pub struct Navigator {
    current: Route,
    history: Vec<Route>,
    events: broadcast::Receiver<SessionEvent>,
}

impl Navigator {
    pub fn new(start: Route, events: broadcast::Receiver<SessionEvent>) -> Self {
        Self {
            current: start,
            history: Vec::new(),
            events,
        }
    }

    pub fn current(&self) -> &Route {
        &self.current
    }

    /// Every view left so far, oldest first.
    pub fn history(&self) -> &[Route] {
        &self.history
    }

    /// Navigate to `to` through the guard and return where we ended up.
    pub fn navigate(&mut self, to: Route, authenticated: bool) -> &Route {
        let target = guard(to, authenticated);
        self.go(target);
        &self.current
    }

    /// Apply redirects for all session events published since the last call.
    pub fn sync(&mut self) -> &Route {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    let target = redirect_for(event);
                    tracing::debug!("{:?} -> {}", event, target);
                    self.go(target);
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Navigator missed {} session events", skipped);
                }
                Err(_) => break,
            }
        }
        &self.current
    }

    fn go(&mut self, target: Route) {
        if target != self.current {
            let previous = std::mem::replace(&mut self.current, target);
            self.history.push(previous);
        }
    }
}
