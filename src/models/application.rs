use serde::{Deserialize, Serialize};

/// Status assigned by the backend when none is given on creation.
pub const DEFAULT_STATUS: &str = "Wishlist";

/// Language used for generated emails when the caller does not pick one.
pub const DEFAULT_EMAIL_LANGUAGE: &str = "english";

/// A tracked job application.
///
/// Only `id` and `status` carry meaning on the client. The remaining fields
/// mirror the backend model and are all optional so partial payloads still
/// decode; fields this client does not know about are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_posted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_job_id: Option<String>,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Application {
    /// Label used when listing applications: "Title @ Company", falling back to the id.
    pub fn label(&self) -> String {
        match (self.title.as_deref(), self.company.as_deref()) {
            (Some(title), Some(company)) => format!("{} @ {}", title, company),
            (Some(title), None) => title.to_string(),
            (None, Some(company)) => company.to_string(),
            (None, None) => self.id.clone(),
        }
    }
}

/// One entry of an application's status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: String,
    #[serde(default)]
    pub changed_at: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A document (resume, cover letter) attached to an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A contact person for an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Input for creating a new application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApplication {
    pub linkedin_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_posted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewApplication {
    pub fn new(linkedin_url: impl Into<String>) -> Self {
        Self {
            linkedin_url: linkedin_url.into(),
            title: None,
            company: None,
            location: None,
            job_description: None,
            date_posted: None,
            applied_date: None,
            status: default_status(),
            notes: None,
        }
    }
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

/// Input for updating an application. Absent fields are left untouched by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_posted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of `POST /applications/{id}/generate_email`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateEmailInput {
    pub project_ids: Vec<String>,
    pub language: String,
}

/// Response of `POST /applications/{id}/generate_email`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedEmail {
    pub email_text: String,
}

/// Response of `GET /applications/{id}/suggest_projects`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSuggestion {
    pub suggested_project_ids: Vec<String>,
}
