//! Error types for search backend operations

use serde::Serialize;

/// Result type for backend operations
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Failures reported by (or while talking to) the search backend.
///
/// The backend's own error code and message are preserved verbatim so callers
/// can act on them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// The backend answered with an error body
    #[error("{message} (code: {code})")]
    Api {
        /// HTTP status, absent for errors reported by an asynchronous task
        status: Option<u16>,
        code: String,
        error_type: Option<String>,
        message: String,
        link: Option<String>,
    },

    /// The request or the task wait exceeded its deadline
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The backend cancelled the operation
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Connection or transport failure
    #[error("Communication error: {0}")]
    Communication(String),

    /// The backend answered with something we could not decode
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Build an API error from its code and message only
    pub fn api(status: Option<u16>, code: impl Into<String>, message: impl Into<String>) -> Self {
        BackendError::Api {
            status,
            code: code.into(),
            error_type: None,
            message: message.into(),
            link: None,
        }
    }

    /// Error code as reported by the backend, or a synthetic one for transport failures
    pub fn code(&self) -> &str {
        match self {
            BackendError::Api { code, .. } => code,
            BackendError::Timeout(_) => "timeout",
            BackendError::Cancelled(_) => "cancelled",
            BackendError::Communication(_) => "communication_error",
            BackendError::InvalidResponse(_) => "invalid_response",
        }
    }

    /// HTTP status of the failed call, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Api { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Timeout(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BackendError::Cancelled(_))
    }

    /// Whether the backend reported the target index as absent
    pub fn is_index_not_found(&self) -> bool {
        matches!(self, BackendError::Api { code, .. } if code == "index_not_found")
    }

    /// Structured view used in tool and HTTP error payloads
    pub fn details(&self) -> BackendErrorDetails<'_> {
        let (error_type, link) = match self {
            BackendError::Api {
                error_type, link, ..
            } => (error_type.as_deref(), link.as_deref()),
            _ => (None, None),
        };
        BackendErrorDetails {
            code: self.code(),
            status: self.status(),
            error_type,
            link,
            message: self.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendErrorDetails<'a> {
    pub code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<&'a str>,
    pub message: String,
}
