use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {}", .0.as_deref().unwrap_or("token may be expired"))]
    Unauthorized(Option<String>),

    #[error("Access denied: {}", .0.as_deref().unwrap_or("forbidden"))]
    AccessDenied(Option<String>),

    #[error("Resource not found: {}", .0.as_deref().unwrap_or("not found"))]
    NotFound(Option<String>),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error ({status}): {body}")]
    ServerError {
        status: u16,
        detail: Option<String>,
        body: String,
    },

    #[error("Request rejected ({status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    Rejected { status: u16, detail: Option<String> },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies kept in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shape produced by the backend: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
            format!("{}... (truncated, {} total bytes)", cut, body.len())
        }
    }

    /// Extract the human-readable `detail` string from an error body.
    /// Validation errors carry a list instead of a string; those are ignored.
    fn parse_detail(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        match parsed.detail? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = Self::parse_detail(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(detail),
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError {
                status: status.as_u16(),
                detail,
                body: Self::truncate_body(body),
            },
            code => ApiError::Rejected {
                status: code,
                detail,
            },
        }
    }

    /// The server-provided detail message, if the server sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized(d)
            | ApiError::AccessDenied(d)
            | ApiError::NotFound(d)
            | ApiError::ServerError { detail: d, .. }
            | ApiError::Rejected { detail: d, .. } => d.as_deref(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}
