use serde::{Deserialize, Serialize};

/// A GitHub repository imported for the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubProject {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub github_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stars: i64,
    #[serde(default)]
    pub forks: i64,
    #[serde(default)]
    pub readme_content: Option<String>,
    #[serde(default)]
    pub last_commit_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Body of `POST /github/fetch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchProjectsInput {
    pub username: String,
    /// Personal access token, raises the GitHub quota when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// GitHub API quota as reported by `GET /github/rate-limit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: i64,
    pub remaining: i64,
    pub reset: String,
    pub used: i64,
    #[serde(default)]
    pub error: Option<String>,
}
