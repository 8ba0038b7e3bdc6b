use crate::backend::BackendError;
use crate::search::SettingsCategory;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed filter description
    #[error("Invalid filter on field '{field}': {message}")]
    InvalidFilter { field: String, message: String },

    /// Malformed or disallowed sort token
    #[error("Invalid sort token '{token}': {message}")]
    InvalidSort { token: String, message: String },

    /// Other malformed tool input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown tool name
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// Backend failure while searching or listing
    #[error("Search backend error: {0}")]
    SearchBackend(#[source] BackendError),

    /// Backend rejected an index settings update
    #[error(
        "Index configuration error on '{index}' ({}): {source}",
        category_label(.category)
    )]
    IndexConfiguration {
        index: String,
        category: Option<SettingsCategory>,
        #[source]
        source: BackendError,
    },

    /// Backend reported the index as absent
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

fn category_label(category: &Option<SettingsCategory>) -> String {
    category
        .map(|c| c.to_string())
        .unwrap_or_else(|| "settings".to_string())
}

/// Who has to act on an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The request was malformed; fix the call
    Validation,
    /// The backend could not satisfy a well-formed request; retry or alert
    Backend,
    /// Failure inside the gateway itself
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidFilter { .. }
            | AppError::InvalidSort { .. }
            | AppError::Validation(_)
            | AppError::ToolNotFound(_) => ErrorKind::Validation,
            AppError::SearchBackend(_)
            | AppError::IndexConfiguration { .. }
            | AppError::IndexNotFound(_) => ErrorKind::Backend,
            AppError::Configuration(_) | AppError::Serialization(_) | AppError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidFilter { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidSort { .. } => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ToolNotFound(_) => StatusCode::NOT_FOUND,
            AppError::SearchBackend(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            AppError::SearchBackend(_) => StatusCode::BAD_GATEWAY,
            AppError::IndexConfiguration { source, .. } if source.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            AppError::IndexConfiguration { .. } => StatusCode::BAD_GATEWAY,
            AppError::IndexNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::InvalidFilter { .. } => "INVALID_FILTER",
            AppError::InvalidSort { .. } => "INVALID_SORT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::ToolNotFound(_) => "TOOL_NOT_FOUND",
            AppError::SearchBackend(e) if e.is_timeout() => "SEARCH_BACKEND_TIMEOUT",
            AppError::SearchBackend(e) if e.is_cancelled() => "SEARCH_BACKEND_CANCELLED",
            AppError::SearchBackend(_) => "SEARCH_BACKEND_ERROR",
            AppError::IndexConfiguration { source, .. } if source.is_timeout() => "INDEX_CONFIGURATION_TIMEOUT",
            AppError::IndexConfiguration { source, .. } if source.is_cancelled() => {
                "INDEX_CONFIGURATION_CANCELLED"
            }
            AppError::IndexConfiguration { .. } => "INDEX_CONFIGURATION_ERROR",
            AppError::IndexNotFound(_) => "INDEX_NOT_FOUND",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Machine-readable context identifying the offending input or backend cause
    pub fn details(&self) -> Value {
        match self {
            AppError::InvalidFilter { field, .. } => json!({ "field": field }),
            AppError::InvalidSort { token, .. } => json!({ "token": token }),
            AppError::ToolNotFound(name) => json!({ "tool": name }),
            AppError::SearchBackend(e) => json!({ "backend": e.details() }),
            AppError::IndexConfiguration {
                index,
                category,
                source,
            } => json!({
                "index": index,
                "category": category.map(|c| c.to_string()),
                "backend": source.details(),
            }),
            AppError::IndexNotFound(index) => json!({ "index": index }),
            _ => Value::Null,
        }
    }

    /// Structured error body shared by the HTTP and tool surfaces
    pub fn to_payload(&self) -> Value {
        json!({
            "code": self.error_code(),
            "kind": self.kind().as_ref(),
            "message": self.to_string(),
            "details": self.details(),
        })
    }
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        tracing::error!(
            error_code = error_code,
            status_code = status.as_u16(),
            message = %message,
            "Request error"
        );

        let mut payload = self.to_payload();
        payload["status"] = json!(status.as_u16());

        (status, Json(json!({ "error": payload }))).into_response()
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Backend failures outside of settings and stats surface as search backend errors
impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::SearchBackend(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::InvalidFilter {
                field: "price".to_string(),
                message: "bad".to_string()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::IndexNotFound("test".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::SearchBackend(BackendError::Timeout("10s".to_string())).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::SearchBackend(BackendError::Communication("refused".to_string()))
                .status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::InvalidSort {
                token: "price:up".to_string(),
                message: "bad".to_string()
            }
            .error_code(),
            "INVALID_SORT"
        );
        assert_eq!(
            AppError::SearchBackend(BackendError::Timeout("10s".to_string())).error_code(),
            "SEARCH_BACKEND_TIMEOUT"
        );
        assert_eq!(
            AppError::SearchBackend(BackendError::Cancelled("task 7".to_string())).error_code(),
            "SEARCH_BACKEND_CANCELLED"
        );
        assert_eq!(AppError::IndexNotFound("x".to_string()).error_code(), "INDEX_NOT_FOUND");
    }

    #[test]
    fn test_error_kinds_split_caller_and_backend_faults() {
        assert_eq!(
            AppError::Validation("limit".to_string()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            AppError::IndexNotFound("x".to_string()).kind(),
            ErrorKind::Backend
        );
        assert_eq!(AppError::Internal("x".to_string()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_index_configuration_payload_names_category() {
        let err = AppError::IndexConfiguration {
            index: "products".to_string(),
            category: Some(SettingsCategory::FilterableAttributes),
            source: BackendError::api(
                None,
                "invalid_settings_filterable_attributes",
                "bad attribute",
            ),
        };

        let payload = err.to_payload();
        assert_eq!(payload["code"], "INDEX_CONFIGURATION_ERROR");
        assert_eq!(payload["kind"], "backend");
        assert_eq!(payload["details"]["category"], "filterableAttributes");
        assert_eq!(
            payload["details"]["backend"]["code"],
            "invalid_settings_filterable_attributes"
        );
        assert!(err.to_string().contains("filterableAttributes"));
    }

    #[test]
    fn test_index_configuration_timeout_and_cancellation_codes() {
        let failed = |source: BackendError| AppError::IndexConfiguration {
            index: "products".to_string(),
            category: None,
            source,
        };

        let timeout = failed(BackendError::Timeout("task 7".to_string()));
        assert_eq!(timeout.error_code(), "INDEX_CONFIGURATION_TIMEOUT");
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let cancelled = failed(BackendError::Cancelled("task 8".to_string()));
        assert_eq!(cancelled.error_code(), "INDEX_CONFIGURATION_CANCELLED");
        assert_eq!(cancelled.status_code(), StatusCode::BAD_GATEWAY);

        let rejected = failed(BackendError::api(Some(400), "invalid_settings_synonyms", "bad"));
        assert_eq!(rejected.error_code(), "INDEX_CONFIGURATION_ERROR");
    }
}
