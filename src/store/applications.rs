use std::collections::BTreeMap;
use std::future::Future;

use super::{Reducer, StateCell};
use crate::api::{ApiClient, ApiError};
use crate::models::{
    Application, ApplicationUpdate, GenerateEmailInput, NewApplication, DEFAULT_EMAIL_LANGUAGE,
};

const FETCH_ALL_FAILED: &str = "Failed to fetch applications";
const FETCH_ONE_FAILED: &str = "Failed to fetch application";
const CREATE_FAILED: &str = "Failed to create application";
const UPDATE_FAILED: &str = "Failed to update application";
const DELETE_FAILED: &str = "Failed to delete application";
const GENERATE_EMAIL_FAILED: &str = "Failed to generate email";
const SUGGEST_PROJECTS_FAILED: &str = "Failed to suggest projects";

/// Applications grouped by status, each group in list order.
pub type ApplicationsByStatus = BTreeMap<String, Vec<Application>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationsState {
    /// Every application of the user; ids are unique.
    pub applications: Vec<Application>,
    /// The application opened for viewing or editing.
    pub current: Option<Application>,
    pub loading: bool,
    pub error: Option<String>,

    pub generated_email: Option<String>,
    pub email_loading: bool,
    pub email_error: Option<String>,

    pub suggested_projects: Vec<String>,
    pub suggestion_loading: bool,
    pub suggestion_error: Option<String>,
}

impl ApplicationsState {
    /// Group applications by status. Recomputed on every call.
    pub fn by_status(&self) -> ApplicationsByStatus {
        let mut grouped = ApplicationsByStatus::new();
        for app in &self.applications {
            grouped
                .entry(app.status.clone())
                .or_default()
                .push(app.clone());
        }
        grouped
    }

    pub fn find(&self, id: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.id == id)
    }
}

#[derive(Debug, Clone)]
pub enum ApplicationsMutation {
    SetApplications(Vec<Application>),
    SetCurrent(Option<Application>),
    Add(Application),
    Update(Application),
    Remove(String),
    SetLoading(bool),
    SetError(Option<String>),
    SetGeneratedEmail(Option<String>),
    SetEmailLoading(bool),
    SetEmailError(Option<String>),
    SetSuggestedProjects(Vec<String>),
    SetSuggestionLoading(bool),
    SetSuggestionError(Option<String>),
}

impl Reducer for ApplicationsState {
    type Mutation = ApplicationsMutation;

    fn reduce(mut self, mutation: ApplicationsMutation) -> Self {
        use ApplicationsMutation::*;

        match mutation {
            SetApplications(applications) => {
                let mut unique = Vec::with_capacity(applications.len());
                for app in applications {
                    upsert(&mut unique, app);
                }
                self.applications = unique;
            }
            SetCurrent(current) => self.current = current,
            Add(app) => upsert(&mut self.applications, app),
            Update(app) => {
                if let Some(slot) = self.applications.iter_mut().find(|a| a.id == app.id) {
                    *slot = app;
                }
            }
            Remove(id) => self.applications.retain(|a| a.id != id),
            SetLoading(loading) => self.loading = loading,
            SetError(error) => self.error = error,
            SetGeneratedEmail(email) => self.generated_email = email,
            SetEmailLoading(loading) => self.email_loading = loading,
            SetEmailError(error) => self.email_error = error,
            SetSuggestedProjects(ids) => self.suggested_projects = ids,
            SetSuggestionLoading(loading) => self.suggestion_loading = loading,
            SetSuggestionError(error) => self.suggestion_error = error,
        }
        self
    }
}

/// Replace the element with the same id, or append.
fn upsert(applications: &mut Vec<Application>, app: Application) {
    match applications.iter_mut().find(|a| a.id == app.id) {
        Some(slot) => *slot = app,
        None => applications.push(app),
    }
}

/// Job applications plus the email generation and project suggestion helpers.
#[derive(Debug, Clone)]
pub struct ApplicationsStore {
    api: ApiClient,
    state: StateCell<ApplicationsState>,
}

impl ApplicationsStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: StateCell::new(ApplicationsState::default()),
        }
    }

    pub fn snapshot(&self) -> ApplicationsState {
        self.state.snapshot()
    }

    pub fn applications(&self) -> Vec<Application> {
        self.state.read(|s| s.applications.clone())
    }

    pub fn current(&self) -> Option<Application> {
        self.state.read(|s| s.current.clone())
    }

    pub fn applications_by_status(&self) -> ApplicationsByStatus {
        self.state.read(ApplicationsState::by_status)
    }

    /// Run a CRUD call under the shared loading flag, recording failures.
    async fn tracked<T, F>(&self, fallback: &str, call: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        self.state.commit(ApplicationsMutation::SetLoading(true));

        let result = call.await;
        if let Err(ref e) = result {
            tracing::warn!("{}: {}", fallback, e);
            self.state
                .commit(ApplicationsMutation::SetError(Some(e.message_or(fallback))));
        }

        self.state.commit(ApplicationsMutation::SetLoading(false));
        result
    }

    pub async fn fetch_all(&self) -> Result<Vec<Application>, ApiError> {
        let applications = self
            .tracked(FETCH_ALL_FAILED, self.api.list_applications())
            .await?;
        self.state
            .commit(ApplicationsMutation::SetApplications(applications.clone()));
        Ok(applications)
    }

    pub async fn fetch_one(&self, id: &str) -> Result<Application, ApiError> {
        let application = self
            .tracked(FETCH_ONE_FAILED, self.api.get_application(id))
            .await?;
        self.state
            .commit(ApplicationsMutation::SetCurrent(Some(application.clone())));
        Ok(application)
    }

    pub async fn create(&self, input: &NewApplication) -> Result<Application, ApiError> {
        let application = self
            .tracked(CREATE_FAILED, self.api.create_application(input))
            .await?;
        self.state
            .commit(ApplicationsMutation::Add(application.clone()));
        Ok(application)
    }

    /// Update an application. The local list only changes if it holds that id.
    pub async fn update(
        &self,
        id: &str,
        input: &ApplicationUpdate,
    ) -> Result<Application, ApiError> {
        let application = self
            .tracked(UPDATE_FAILED, self.api.update_application(id, input))
            .await?;
        self.state
            .commit(ApplicationsMutation::Update(application.clone()));
        Ok(application)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.tracked(DELETE_FAILED, self.api.delete_application(id))
            .await?;
        self.state
            .commit(ApplicationsMutation::Remove(id.to_string()));
        Ok(())
    }

    /// Generate an outreach email for an application, citing the given projects.
    ///
    /// The previous email and error are cleared before the request is sent.
    pub async fn generate_email(
        &self,
        application_id: &str,
        project_ids: Vec<String>,
        language: Option<&str>,
    ) -> Result<String, ApiError> {
        self.state.commit(ApplicationsMutation::SetEmailLoading(true));
        self.state.commit(ApplicationsMutation::SetEmailError(None));
        self.state
            .commit(ApplicationsMutation::SetGeneratedEmail(None));

        let input = GenerateEmailInput {
            project_ids,
            language: language.unwrap_or(DEFAULT_EMAIL_LANGUAGE).to_string(),
        };
        let result = self
            .api
            .generate_email(application_id, &input)
            .await
            .map(|r| r.email_text);

        match result {
            Ok(ref text) => self
                .state
                .commit(ApplicationsMutation::SetGeneratedEmail(Some(text.clone()))),
            Err(ref e) => {
                tracing::warn!("Failed to generate email: {}", e);
                self.state.commit(ApplicationsMutation::SetEmailError(Some(
                    e.message_or(GENERATE_EMAIL_FAILED),
                )));
            }
        }

        self.state
            .commit(ApplicationsMutation::SetEmailLoading(false));
        result
    }

    /// Ask which projects best fit an application.
    ///
    /// The previous suggestion and error are cleared before the request is sent.
    pub async fn suggest_projects(&self, application_id: &str) -> Result<Vec<String>, ApiError> {
        self.state
            .commit(ApplicationsMutation::SetSuggestionLoading(true));
        self.state
            .commit(ApplicationsMutation::SetSuggestionError(None));
        self.state
            .commit(ApplicationsMutation::SetSuggestedProjects(Vec::new()));

        let result = self
            .api
            .suggest_projects(application_id)
            .await
            .map(|r| r.suggested_project_ids);

        match result {
            Ok(ref ids) => self
                .state
                .commit(ApplicationsMutation::SetSuggestedProjects(ids.clone())),
            Err(ref e) => {
                tracing::warn!("Failed to suggest projects: {}", e);
                self.state.commit(ApplicationsMutation::SetSuggestionError(Some(
                    e.message_or(SUGGEST_PROJECTS_FAILED),
                )));
            }
        }

        self.state
            .commit(ApplicationsMutation::SetSuggestionLoading(false));
        result
    }
}
