//! HTTP error handling
//!
//! Every failed request answers with a JSON body `{message, code, details?}`.
//! The `code` names the error kind so clients can tell a rejected mutation
//! apart from a store fault without parsing the message.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use divtree_core::services::{ErrorKind, TreeServiceError};

/// JSON error response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    /// Optional detailed error information for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip)]
    status: Option<StatusCode>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
            status: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::new(message, code)
        }
    }

    /// Override the status derived from `code`
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Path segment that is not a node id
    pub fn invalid_id(raw: &str) -> Self {
        Self::with_details("Invalid node id", "INVALID_ID", format!("received: '{}'", raw))
    }

    pub fn from_json_rejection(rejection: JsonRejection) -> Self {
        Self::with_details("Invalid request body", "INVALID_BODY", rejection.body_text())
    }

    pub fn from_query_rejection(rejection: QueryRejection) -> Self {
        Self::with_details("Invalid query string", "INVALID_ID", rejection.body_text())
    }

    /// Status used when no override was set
    pub fn status(&self) -> StatusCode {
        if let Some(status) = self.status {
            return status;
        }
        match self.code.as_str() {
            "INVALID_ID" | "INVALID_BODY" | "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{} ({}): {}", status, self.code, self.message);
        }
        (status, Json(self)).into_response()
    }
}

/// Error code for each service error kind
pub fn error_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound => "NODE_NOT_FOUND",
        ErrorKind::DuplicateCode => "DUPLICATE_CODE",
        ErrorKind::DepthExceeded => "DEPTH_EXCEEDED",
        ErrorKind::IntegrityViolation => "INTEGRITY_VIOLATION",
        ErrorKind::Validation => "VALIDATION_ERROR",
        ErrorKind::Store => "DATABASE_ERROR",
    }
}

/// Service failures are 500 unless they are payload validation errors;
/// read endpoints that answer 404 override the status themselves.
impl From<TreeServiceError> for HttpError {
    fn from(err: TreeServiceError) -> Self {
        let code = error_code(err.kind());
        match err {
            TreeServiceError::DatabaseError(ref db_err) => {
                HttpError::with_details("Database operation failed", code, db_err.to_string())
            }
            other => HttpError::new(other.to_string(), code),
        }
    }
}
