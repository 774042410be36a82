//! OCS status code to error kind mapping.

use crate::error::ApiError;

/// The closed set of failure kinds an OCS status code can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    PreconditionFailed,
    /// Every code without a dedicated kind.
    Protocol,
}

impl ErrorKind {
    pub fn from_status(code: u16) -> Self {
        match code {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            412 => ErrorKind::PreconditionFailed,
            _ => ErrorKind::Protocol,
        }
    }

    /// Map the textual `statuscode` of an OCS meta block. Anything that is not
    /// a number falls through to [`ErrorKind::Protocol`].
    pub fn from_status_str(code: &str) -> Self {
        code.trim()
            .parse::<u16>()
            .map(Self::from_status)
            .unwrap_or(ErrorKind::Protocol)
    }

    pub fn status_code(self) -> Option<u16> {
        match self {
            ErrorKind::BadRequest => Some(400),
            ErrorKind::Unauthorized => Some(401),
            ErrorKind::Forbidden => Some(403),
            ErrorKind::NotFound => Some(404),
            ErrorKind::Conflict => Some(409),
            ErrorKind::PreconditionFailed => Some(412),
            ErrorKind::Protocol => None,
        }
    }

    pub fn into_error(self, message: String) -> ApiError {
        match self {
            ErrorKind::BadRequest => ApiError::BadRequest(message),
            ErrorKind::Unauthorized => ApiError::Unauthorized(message),
            ErrorKind::Forbidden => ApiError::Forbidden(message),
            ErrorKind::NotFound => ApiError::NotFound(message),
            ErrorKind::Conflict => ApiError::Conflict(message),
            ErrorKind::PreconditionFailed => ApiError::PreconditionFailed(message),
            ErrorKind::Protocol => ApiError::Protocol(message),
        }
    }
}
