//! API Error Types
//!
//! Errors surfaced by the detection API client, and the extraction of
//! human-readable messages from error response bodies.

use serde_json::Value;
use thiserror::Error;

/// Client error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Input rejected before any request was sent
    #[error("{0}")]
    Validation(String),

    /// No token in the session for a call that requires one
    #[error("Authentication token is required. Please log in again.")]
    MissingToken,

    /// Server rejected the token
    #[error("Session expired. Please log in again.")]
    SessionExpired,

    /// Non-2xx response
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Transport failure (connection refused, timeout, TLS)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// Coarse error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Network,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::MissingToken | ApiError::SessionExpired => ErrorKind::Authentication,
            ApiError::Api { status: 401, .. } => ErrorKind::Authentication,
            ApiError::Api { .. } | ApiError::Network(_) | ApiError::Decode(_) => {
                ErrorKind::Network
            }
        }
    }

    /// Whether signing in again is the way out
    pub fn needs_login(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }
}

/// Pull the `detail` message out of an error body.
///
/// A string detail is used as-is. A list of validation objects is reduced to
/// their `msg` fields. Anything else yields `None`.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.join("; "))
            }
        }
        _ => None,
    }
}

/// Result type for client operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_string_detail() {
        assert_eq!(
            extract_detail(r#"{"detail":"Incorrect email or password"}"#).as_deref(),
            Some("Incorrect email or password")
        );
    }

    #[test]
    fn test_extract_validation_list() {
        let body = r#"{"detail":[{"loc":["query","n"],"msg":"ensure this value is less than or equal to 100"},
                                  {"loc":["query","balanced"],"msg":"value could not be parsed"}]}"#;
        assert_eq!(
            extract_detail(body).as_deref(),
            Some("ensure this value is less than or equal to 100; value could not be parsed")
        );
    }

    #[test]
    fn test_extract_missing_detail() {
        assert!(extract_detail("").is_none());
        assert!(extract_detail("<html>502</html>").is_none());
        assert!(extract_detail(r#"{"error":"x"}"#).is_none());
        assert!(extract_detail(r#"{"detail":""}"#).is_none());
        assert!(extract_detail(r#"{"detail":42}"#).is_none());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ApiError::SessionExpired.to_string(),
            "Session expired. Please log in again."
        );
        let err = ApiError::Api {
            status: 404,
            message: "No samples available from dataset".to_string(),
        };
        assert_eq!(err.to_string(), "No samples available from dataset");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            ApiError::Validation("bad".into()).kind(),
            ErrorKind::Validation
        );
        assert!(ApiError::MissingToken.needs_login());
        assert!(ApiError::Api { status: 401, message: "x".into() }.needs_login());
        assert_eq!(
            ApiError::Api { status: 500, message: "x".into() }.kind(),
            ErrorKind::Network
        );
    }
}
