use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use super::TransportError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not logged in - call login first")]
    NotAuthenticated,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Authentication,
    NotFound,
    Server,
    Unknown,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Prefix the file-browser service puts on messages for missing files,
/// which it reports with a 500 status.
const MISSING_FILE_PREFIX: &str = "ENOENT";

/// JSON error body shape used by the service: `{error, message}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl ClientError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Pull the human-readable part out of an error body, falling back to the raw text.
    fn detail(body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                message: Some(message),
                ..
            }) => Self::truncate_body(&message),
            Ok(ErrorBody {
                error: Some(error), ..
            }) => Self::truncate_body(&error),
            _ => Self::truncate_body(body),
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = Self::detail(body);
        match status.as_u16() {
            400 => ClientError::InvalidInput(detail),
            401 => ClientError::Unauthorized(detail),
            403 => ClientError::AccessDenied(detail),
            404 => ClientError::NotFound(detail),
            500..=599 if detail.starts_with(MISSING_FILE_PREFIX) => ClientError::NotFound(detail),
            500..=599 => ClientError::Server(detail),
            _ => ClientError::InvalidResponse(format!("Status {}: {}", status, detail)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Network(_) => ErrorKind::Network,
            ClientError::NotAuthenticated
            | ClientError::Unauthorized(_)
            | ClientError::AccessDenied(_) => ErrorKind::Authentication,
            ClientError::NotFound(_) => ErrorKind::NotFound,
            ClientError::Server(_) => ErrorKind::Server,
            ClientError::InvalidInput(_)
            | ClientError::InvalidResponse(_)
            | ClientError::Cancelled
            | ClientError::Io(_) => ErrorKind::Unknown,
        }
    }

    /// True when the error means the caller has to log in (again).
    pub fn is_auth_error(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_codes() {
        assert!(matches!(
            ClientError::from_status(StatusCode::BAD_REQUEST, ""),
            ClientError::InvalidInput(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::UNAUTHORIZED, ""),
            ClientError::Unauthorized(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::FORBIDDEN, ""),
            ClientError::AccessDenied(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::NOT_FOUND, ""),
            ClientError::NotFound(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::BAD_GATEWAY, "upstream"),
            ClientError::Server(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::IM_A_TEAPOT, ""),
            ClientError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_from_status_uses_json_message() {
        let body = r#"{"success": false, "message": "Invalid username or password"}"#;
        match ClientError::from_status(StatusCode::UNAUTHORIZED, body) {
            ClientError::Unauthorized(detail) => {
                assert_eq!(detail, "Invalid username or password")
            }
            other => panic!("Expected Unauthorized, got {:?}", other),
        }

        // Falls back to `error` when there is no message
        let body = r#"{"error": "Unauthorized", "redirect": "/login"}"#;
        match ClientError::from_status(StatusCode::UNAUTHORIZED, body) {
            ClientError::Unauthorized(detail) => assert_eq!(detail, "Unauthorized"),
            other => panic!("Expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_500_is_not_found() {
        let body = r#"{"error": "Error downloading file", "message": "ENOENT: no such file or directory, stat '/srv/files/missing.txt'"}"#;
        let err = ClientError::from_status(StatusCode::INTERNAL_SERVER_ERROR, body);
        assert!(matches!(err, ClientError::NotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let body = r#"{"error": "Error reading directory", "message": "EACCES: permission denied"}"#;
        let err = ClientError::from_status(StatusCode::INTERNAL_SERVER_ERROR, body);
        assert_eq!(err.kind(), ErrorKind::Server);
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ClientError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("520 total bytes"));

        // Never splits a multi-byte character
        let wide = "é".repeat(MAX_ERROR_BODY_LENGTH);
        let truncated = ClientError::truncate_body(&wide);
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_kind() {
        assert_eq!(ClientError::NotAuthenticated.kind(), ErrorKind::Authentication);
        assert_eq!(
            ClientError::AccessDenied("outside root".into()).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            ClientError::Network(TransportError::Timeout("30s".into())).kind(),
            ErrorKind::Network
        );
        assert_eq!(ClientError::Cancelled.kind(), ErrorKind::Unknown);
        assert!(ClientError::Unauthorized(String::new()).is_auth_error());
        assert!(!ClientError::Server(String::new()).is_auth_error());
    }
}
