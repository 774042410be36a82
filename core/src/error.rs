//! Error types for the Talk API client.
//!
//! # Design
//! The HTTP-mapped variants carry the server's own explanation, already
//! formatted as `"[{statuscode}] {status}: {message}"`, so `Display` on them
//! is exactly what the OCS envelope said. Everything that goes wrong before or
//! around the HTTP exchange (missing capability, invalid rich object, broken
//! XML, transport failure) has its own variant.

use thiserror::Error;

use crate::status::ErrorKind;

/// Errors returned by the Talk client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// OCS status 400.
    #[error("{0}")]
    BadRequest(String),

    /// OCS status 401.
    #[error("{0}")]
    Unauthorized(String),

    /// OCS status 403.
    #[error("{0}")]
    Forbidden(String),

    /// OCS status 404.
    #[error("{0}")]
    NotFound(String),

    /// OCS status 409.
    #[error("{0}")]
    Conflict(String),

    /// OCS status 412.
    #[error("{0}")]
    PreconditionFailed(String),

    /// Any other failure status, or an envelope missing its `data`/`meta`.
    #[error("{0}")]
    Protocol(String),

    /// The host client does not advertise a capability the endpoint needs.
    #[error("not capable: {0}")]
    NotCapable(String),

    /// A rich object was constructed without its required fields.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The response body is not well-formed XML.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// The session could not complete the HTTP exchange.
    #[error("transport error: {0}")]
    Transport(String),

    /// A request parameter could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Client configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// The mapped status kind, if this error came from an OCS failure envelope.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ApiError::BadRequest(_) => Some(ErrorKind::BadRequest),
            ApiError::Unauthorized(_) => Some(ErrorKind::Unauthorized),
            ApiError::Forbidden(_) => Some(ErrorKind::Forbidden),
            ApiError::NotFound(_) => Some(ErrorKind::NotFound),
            ApiError::Conflict(_) => Some(ErrorKind::Conflict),
            ApiError::PreconditionFailed(_) => Some(ErrorKind::PreconditionFailed),
            ApiError::Protocol(_) => Some(ErrorKind::Protocol),
            _ => None,
        }
    }

    /// The OCS status code this error was mapped from, when it has a fixed one.
    pub fn status(&self) -> Option<u16> {
        self.kind().and_then(ErrorKind::status_code)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_errors_display_the_server_message_verbatim() {
        let err = ApiError::NotFound("[404] failure: Room not found".to_string());
        assert_eq!(err.to_string(), "[404] failure: Room not found");
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
    }

    #[test]
    fn local_errors_have_no_status() {
        let err = ApiError::NotCapable("chat-v2".to_string());
        assert_eq!(err.status(), None);
        assert_eq!(err.kind(), None);
        assert_eq!(err.to_string(), "not capable: chat-v2");
    }

    #[test]
    fn generic_protocol_error_has_kind_but_no_code() {
        let err = ApiError::Protocol("[500] failure: boom".to_string());
        assert_eq!(err.kind(), Some(ErrorKind::Protocol));
        assert_eq!(err.status(), None);
    }
}
