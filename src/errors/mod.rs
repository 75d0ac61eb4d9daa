//! Error handling module for the admin sync client.
//!
//! Every failure is caught at the operation boundary and mapped onto one of the
//! variants below, each of which knows the text shown to the user.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::notify::Severity;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const SERVER_ERROR: &str = "SERVER_ERROR";
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const CANCELLED: &str = "CANCELLED";
}

/// Fallback text when the server gives no message.
pub const GENERIC_FAILURE: &str = "Operation failed. Please try again.";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized. Please log in as admin.";
pub const NOT_FOUND_MESSAGE: &str = "API not found. Check that the backend is running.";
pub const TRANSPORT_MESSAGE: &str = "Cannot connect to server.";
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Try downloading the file instead.";

/// A single failed form rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Client error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Client-side form validation failed; nothing was sent
    Validation(Vec<FieldError>),
    /// Backend answered 401 or 403
    Unauthorized(String),
    /// Backend answered 404 for the route or record
    NotFound(String),
    /// Backend reported a failure, with its message when it gave one
    Server {
        status: Option<u16>,
        message: Option<String>,
    },
    /// The request never reached the server
    Transport(String),
    /// The request exceeded its explicit deadline
    Timeout(String),
    /// The owning view was torn down while the request was in flight
    Cancelled,
}

impl SyncError {
    /// Build the error for a non-success HTTP status.
    pub fn from_status(status: StatusCode, message: Option<String>) -> Self {
        let message = message.filter(|m| !m.trim().is_empty());
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                SyncError::Unauthorized(message.unwrap_or_else(|| status.to_string()))
            }
            StatusCode::NOT_FOUND => {
                SyncError::NotFound(message.unwrap_or_else(|| status.to_string()))
            }
            _ => SyncError::Server {
                status: Some(status.as_u16()),
                message,
            },
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::Validation(_) => codes::VALIDATION_ERROR,
            SyncError::Unauthorized(_) => codes::UNAUTHORIZED,
            SyncError::NotFound(_) => codes::NOT_FOUND,
            SyncError::Server { .. } => codes::SERVER_ERROR,
            SyncError::Transport(_) => codes::TRANSPORT_ERROR,
            SyncError::Timeout(_) => codes::TIMEOUT,
            SyncError::Cancelled => codes::CANCELLED,
        }
    }

    /// Get the diagnostic message.
    pub fn message(&self) -> String {
        match self {
            SyncError::Validation(errors) => errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; "),
            SyncError::Unauthorized(msg) => msg.clone(),
            SyncError::NotFound(msg) => msg.clone(),
            SyncError::Server { status, message } => match (status, message) {
                (_, Some(msg)) => msg.clone(),
                (Some(status), None) => format!("HTTP {}", status),
                (None, None) => "unsuccessful response".to_string(),
            },
            SyncError::Transport(msg) => msg.clone(),
            SyncError::Timeout(msg) => msg.clone(),
            SyncError::Cancelled => "request cancelled".to_string(),
        }
    }

    /// Text shown to the user in a notification.
    ///
    /// Server messages are passed through verbatim; the other categories use a
    /// fixed text so that auth and routing problems are recognizable.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Validation(errors) => errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            SyncError::Unauthorized(_) => UNAUTHORIZED_MESSAGE.to_string(),
            SyncError::NotFound(_) => NOT_FOUND_MESSAGE.to_string(),
            SyncError::Server {
                message: Some(msg), ..
            } => msg.clone(),
            SyncError::Server { message: None, .. } => GENERIC_FAILURE.to_string(),
            SyncError::Transport(_) => TRANSPORT_MESSAGE.to_string(),
            SyncError::Timeout(_) => TIMEOUT_MESSAGE.to_string(),
            SyncError::Cancelled => String::new(),
        }
    }

    /// Notification severity for this error.
    pub fn severity(&self) -> Severity {
        match self {
            SyncError::Validation(_) => Severity::Warning,
            SyncError::Timeout(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Field errors when this is a validation failure.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            SyncError::Validation(errors) => errors,
            _ => &[],
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for SyncError {}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // Only binary fetches report `Timeout`; see `ApiClient::fetch_binary`
            SyncError::Transport(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::from_status(status, None)
        } else if err.is_decode() {
            SyncError::Server {
                status: None,
                message: None,
            }
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("Response decode error: {:?}", err);
        SyncError::Server {
            status: None,
            message: None,
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Transport(format!("I/O error: {}", err))
    }
}

/// Nested error details, as some endpoints report them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error response envelope.
///
/// Accepts both `{ success: false, message }` and
/// `{ success: false, error: { code, message } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<ErrorDetails>,
}

impl ErrorEnvelope {
    /// The best user-facing message in this envelope.
    pub fn into_message(self) -> Option<String> {
        self.message
            .or_else(|| self.error.and_then(|details| details.message))
    }
}

/// Result type used across the crate.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_is_verbatim() {
        let err = SyncError::from_status(
            StatusCode::BAD_REQUEST,
            Some("Title is required".to_string()),
        );
        assert_eq!(err.user_message(), "Title is required");
        assert_eq!(err.error_code(), codes::SERVER_ERROR);
    }

    #[test]
    fn test_server_without_message_uses_fallback() {
        let err = SyncError::from_status(StatusCode::INTERNAL_SERVER_ERROR, Some("  ".into()));
        assert_eq!(err.user_message(), GENERIC_FAILURE);
        assert_eq!(err.message(), "HTTP 500");
    }

    #[test]
    fn test_auth_and_not_found_are_specific() {
        let unauthorized = SyncError::from_status(StatusCode::FORBIDDEN, None);
        assert_eq!(unauthorized.user_message(), UNAUTHORIZED_MESSAGE);

        let missing = SyncError::from_status(StatusCode::NOT_FOUND, Some("no route".into()));
        assert_eq!(missing.user_message(), NOT_FOUND_MESSAGE);
        assert_eq!(missing.message(), "no route");
    }

    #[test]
    fn test_validation_surfaces_first_field() {
        let err = SyncError::Validation(vec![
            FieldError::new("title", "Title is required"),
            FieldError::new("images", "At least one image is required"),
        ]);
        assert_eq!(err.user_message(), "Title is required");
        assert_eq!(err.severity(), Severity::Warning);
        assert_eq!(err.field_errors().len(), 2);
    }

    #[test]
    fn test_timeout_never_suggests_download_by_default() {
        let transport = SyncError::Transport("operation timed out".into());
        assert_eq!(transport.user_message(), TRANSPORT_MESSAGE);
        assert!(!transport.user_message().contains("download"));
        assert!(SyncError::Timeout("slow".into()).user_message().contains("download"));
    }

    #[test]
    fn test_error_envelope_shapes() {
        let flat: ErrorEnvelope =
            serde_json::from_str(r#"{"success":false,"message":"Job not found"}"#).unwrap();
        assert_eq!(flat.into_message().as_deref(), Some("Job not found"));

        let nested: ErrorEnvelope = serde_json::from_str(
            r#"{"success":false,"error":{"code":"VALIDATION_ERROR","message":"Bad year"}}"#,
        )
        .unwrap();
        assert_eq!(nested.into_message().as_deref(), Some("Bad year"));
    }
}
