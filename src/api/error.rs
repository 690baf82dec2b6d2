use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Failure of a backend call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a usable response (connection, decoding).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
}

impl ApiError {
    /// HTTP status of the response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http(e) => e.status(),
            Self::Status { status, .. } => Some(*status),
        }
    }

    /// Backend-provided detail message, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Http(_) => None,
            Self::Status { detail, .. } => detail.as_deref(),
        }
    }

    /// The detail message, or `fallback` when the backend gave none.
    pub fn message_or(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }

    pub fn is_status(&self, status: StatusCode) -> bool {
        self.status() == Some(status)
    }

    /// Build from a non-success response body.
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.detail)
            .map(ErrorDetail::into_message);
        Self::Status { status, detail }
    }
}

/// Error envelope returned by the backend: `{"detail": ...}`.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    /// Request validation failures, one entry per offending field.
    Validation(Vec<ValidationIssue>),
    /// Structured detail, e.g. a GitHub rate limit with its quota attached.
    Object { message: String },
}

impl ErrorDetail {
    pub fn into_message(self) -> String {
        match self {
            Self::Message(msg) => msg,
            Self::Validation(issues) => issues
                .into_iter()
                .map(|i| i.msg)
                .collect::<Vec<_>>()
                .join("; "),
            Self::Object { message } => message,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidationIssue {
    pub msg: String,
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
}
