//! API error handling for drive.
//!
//! Errors render as
//! `{"type": "...", "errors": [{"attr": ..., "code": "...", "detail": "..."}]}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Error family, tied to the HTTP status class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// 401, 403, 404.
    ClientError,
    /// 400.
    ValidationError,
    /// 500.
    ServerError,
}

/// A single error entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorItem {
    /// Offending field, when the error is about one.
    pub attr: Option<String>,
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub detail: String,
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub errors: Vec<ErrorItem>,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error_type: ErrorType,
    errors: Vec<ErrorItem>,
}

impl ApiError {
    /// Create a new API error with a single entry.
    pub fn new(
        status: StatusCode,
        attr: Option<&str>,
        code: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        let error_type = if status.is_server_error() {
            ErrorType::ServerError
        } else if status == StatusCode::BAD_REQUEST {
            ErrorType::ValidationError
        } else {
            ErrorType::ClientError
        };

        Self {
            status,
            error_type,
            errors: vec![ErrorItem {
                attr: attr.map(str::to_string),
                code: code.into(),
                detail: detail.into(),
            }],
        }
    }

    /// No credentials were sent.
    pub fn not_authenticated() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            None,
            "not_authenticated",
            "Authentication credentials were not provided.",
        )
    }

    /// Credentials were sent but rejected.
    pub fn authentication_failed(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, None, "authentication_failed", detail)
    }

    /// The caller lacks the required ability.
    pub fn permission_denied() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            None,
            "permission_denied",
            "You do not have permission to perform this action.",
        )
    }

    /// The item does not exist or is hidden from the caller.
    pub fn not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            None,
            "not_found",
            "No Item matches the given query.",
        )
    }

    /// Not found, for resources other than items.
    pub fn not_found_resource(resource: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            None,
            "not_found",
            format!("No {resource} matches the given query."),
        )
    }

    /// Field-level validation error.
    pub fn invalid_field(attr: &str, code: &str, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, Some(attr), code, detail)
    }

    /// Request-level validation error.
    pub fn bad_request(code: &str, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, None, code, detail)
    }

    /// Storing content failed. The cause is logged, never returned.
    pub fn storage_upload_error() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            Some("detail"),
            "storage_upload_error",
            "Error uploading file to storage.",
        )
    }

    /// Create an internal server error.
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            None,
            "error",
            "A server error occurred.",
        )
    }

    /// Create a validation error from validator::ValidationErrors.
    ///
    /// Entries are ordered by field name.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let mut items = Vec::new();
        for (field, field_errors) in fields {
            for e in field_errors {
                items.push(ErrorItem {
                    attr: Some(field.to_string()),
                    code: e.code.to_string(),
                    detail: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Invalid value.".to_string()),
                });
            }
        }

        Self {
            status: StatusCode::BAD_REQUEST,
            error_type: ErrorType::ValidationError,
            errors: items,
        }
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Error entries.
    pub fn errors(&self) -> &[ErrorItem] {
        &self.errors
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_type: self.error_type,
            errors: self.errors,
        };
        (self.status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let codes: Vec<&str> = self.errors.iter().map(|e| e.code.as_str()).collect();
        write!(f, "{}: {}", self.status, codes.join(", "))
    }
}

impl std::error::Error for ApiError {}

impl From<crate::DriveError> for ApiError {
    fn from(err: crate::DriveError) -> Self {
        match &err {
            crate::DriveError::NotFound(_) => ApiError::not_found(),
            crate::DriveError::Validation(msg) => ApiError::bad_request("invalid", msg.clone()),
            crate::DriveError::Storage(_) => {
                tracing::error!("Storage error: {}", err);
                ApiError::storage_upload_error()
            }
            _ => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal()
            }
        }
    }
}
