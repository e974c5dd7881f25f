//! Azure provider error types

use serde::Deserialize;
use storeflow_cloud::{ErrorKind, RemoteError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("Token request failed ({status}): {message}")]
    TokenRequest { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AzureError>;

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn describe(&self) -> Option<String> {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
            (Some(code), None) => Some(code.clone()),
            (None, Some(message)) => Some(message.clone()),
            (None, None) => None,
        }
    }
}

/// Map an HTTP status and ARM error code to an error kind
pub fn classify(status: u16, code: Option<&str>) -> ErrorKind {
    match code {
        Some("StorageAccountAlreadyTaken" | "StorageAccountAlreadyExists") => {
            return ErrorKind::Conflict;
        }
        Some("ResourceGroupNotFound" | "ResourceNotFound") => return ErrorKind::NotFound,
        Some("AuthorizationFailed" | "InvalidAuthenticationToken") => return ErrorKind::Denied,
        _ => {}
    }

    match status {
        401 | 403 => ErrorKind::Denied,
        404 => ErrorKind::NotFound,
        408 => ErrorKind::Timeout,
        409 | 412 => ErrorKind::Conflict,
        429 | 500 | 502 | 503 | 504 => ErrorKind::Transient,
        _ => ErrorKind::Unknown,
    }
}

/// Build a remote error from a non-success response body
pub(crate) fn from_response(status: u16, body: &str) -> RemoteError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error)
        .unwrap_or_default();
    let kind = classify(status, parsed.code.as_deref());
    let message = parsed.describe().unwrap_or_else(|| {
        if body.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, body.trim())
        }
    });
    RemoteError::new(kind, message)
}

/// Build a remote error from a transport failure
pub(crate) fn from_transport(err: reqwest::Error) -> RemoteError {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_connect() {
        ErrorKind::Transient
    } else {
        ErrorKind::Unknown
    };
    RemoteError::new(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_status() {
        assert_eq!(classify(404, None), ErrorKind::NotFound);
        assert_eq!(classify(409, None), ErrorKind::Conflict);
        assert_eq!(classify(429, None), ErrorKind::Transient);
        assert_eq!(classify(503, None), ErrorKind::Transient);
        assert_eq!(classify(403, None), ErrorKind::Denied);
        assert_eq!(classify(400, None), ErrorKind::Unknown);
    }

    #[test]
    fn test_code_takes_precedence_over_status() {
        assert_eq!(
            classify(400, Some("StorageAccountAlreadyTaken")),
            ErrorKind::Conflict
        );
        assert_eq!(classify(400, Some("ResourceGroupNotFound")), ErrorKind::NotFound);
    }

    #[test]
    fn test_from_response_keeps_remote_message() {
        let body = r#"{"error":{"code":"AccountNameInvalid","message":"Bad_Name is not valid"}}"#;
        let err = from_response(400, body);
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.message, "AccountNameInvalid: Bad_Name is not valid");
    }

    #[test]
    fn test_from_response_without_envelope() {
        let err = from_response(502, "");
        assert_eq!(err.kind, ErrorKind::Transient);
        assert_eq!(err.message, "HTTP 502");
    }
}
