//! HTTP client for the Job Tracker API.
//!
//! Every request carries `Authorization: Bearer <token>` when a token is
//! present in durable storage at the time the request is built, so a login
//! or logout takes effect on the very next call.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::ApiError;
use crate::models::*;
use crate::storage::{SharedStorage, TOKEN_KEY};

/// Default URL for local development.
pub const DEFAULT_URL: &str = "http://localhost:8000/api/v1";

/// HTTP client for the Job Tracker API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    storage: SharedStorage,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, storage: SharedStorage) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            storage,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with the stored bearer token, if any.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);
        let mut req = self.client.request(method, &url);
        if let Some(token) = self.storage.get(TOKEN_KEY).filter(|t| !t.is_empty()) {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Handle response, converting HTTP errors to ApiError.
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_response(status, &body))
        }
    }

    /// Handle response that may return empty body (204 No Content).
    async fn handle_empty_response(&self, response: Response) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_response(status, &body))
        }
    }

    // ============================================================
    // Auth Operations
    // ============================================================

    /// Register a new account. Does not log in.
    pub async fn register(&self, user: &NewUser) -> Result<User, ApiError> {
        let response = self
            .request(Method::POST, "/auth/register")
            .json(user)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Exchange credentials for an access token (OAuth2 password grant, form-encoded).
    pub async fn login(&self, credentials: &Credentials) -> Result<AccessToken, ApiError> {
        let response = self
            .request(Method::POST, "/auth/login")
            .form(&[
                ("username", credentials.email.as_str()),
                ("password", credentials.password.as_str()),
                ("grant_type", "password"),
            ])
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Get the profile of the token's owner.
    pub async fn get_profile(&self) -> Result<User, ApiError> {
        let response = self.request(Method::GET, "/auth/me").send().await?;
        self.handle_response(response).await
    }

    // ============================================================
    // Application Operations
    // ============================================================

    pub async fn list_applications(&self) -> Result<Vec<Application>, ApiError> {
        let response = self.request(Method::GET, "/applications/").send().await?;
        self.handle_response(response).await
    }

    pub async fn get_application(&self, id: &str) -> Result<Application, ApiError> {
        let response = self
            .request(Method::GET, &format!("/applications/{}", id))
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn create_application(
        &self,
        input: &NewApplication,
    ) -> Result<Application, ApiError> {
        let response = self
            .request(Method::POST, "/applications/")
            .json(input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn update_application(
        &self,
        id: &str,
        input: &ApplicationUpdate,
    ) -> Result<Application, ApiError> {
        let response = self
            .request(Method::PUT, &format!("/applications/{}", id))
            .json(input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn delete_application(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("/applications/{}", id))
            .send()
            .await?;
        self.handle_empty_response(response).await
    }

    /// Ask the backend to write an outreach email for an application.
    pub async fn generate_email(
        &self,
        application_id: &str,
        input: &GenerateEmailInput,
    ) -> Result<GeneratedEmail, ApiError> {
        let response = self
            .request(
                Method::POST,
                &format!("/applications/{}/generate_email", application_id),
            )
            .json(input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Ask the backend which GitHub projects fit an application best.
    pub async fn suggest_projects(
        &self,
        application_id: &str,
    ) -> Result<ProjectSuggestion, ApiError> {
        let response = self
            .request(
                Method::GET,
                &format!("/applications/{}/suggest_projects", application_id),
            )
            .send()
            .await?;
        self.handle_response(response).await
    }

    // ============================================================
    // GitHub Operations
    // ============================================================

    /// Import the repositories of `input.username` and return them.
    pub async fn fetch_github_projects(
        &self,
        input: &FetchProjectsInput,
    ) -> Result<Vec<GitHubProject>, ApiError> {
        let response = self
            .request(Method::POST, "/github/fetch")
            .json(input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// List previously imported repositories.
    pub async fn list_github_projects(&self) -> Result<Vec<GitHubProject>, ApiError> {
        let response = self.request(Method::GET, "/github/").send().await?;
        self.handle_response(response).await
    }

    pub async fn get_github_rate_limit(&self, token: Option<&str>) -> Result<RateLimit, ApiError> {
        let mut req = self.request(Method::GET, "/github/rate-limit");
        if let Some(token) = token {
            req = req.query(&[("token", token)]);
        }
        let response = req.send().await?;
        self.handle_response(response).await
    }
}
