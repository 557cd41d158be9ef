//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum that maps to HTTP status codes.
//! The authentication core never speaks HTTP itself; the route layer uses
//! this classification to render responses.

use serde::Serialize;

/// Error classification
///
/// Each variant maps to an RFC 7231/9110 status code. The set covers the
/// authentication error taxonomy: credential failures (401), lockout (423),
/// two-factor preconditions (412/428), and fail-closed store outages (503).
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::Locked;
/// assert_eq!(kind.status_code(), 423);
/// assert_eq!(kind.as_str(), "Locked");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// 400 - Bad Request: malformed input
    BadRequest,
    /// 401 - Unauthorized: authentication failed or required
    Unauthorized,
    /// 403 - Forbidden: authenticated but not allowed
    Forbidden,
    /// 404 - Not Found: resource does not exist
    NotFound,
    /// 409 - Conflict: request conflicts with current state
    Conflict,
    /// 410 - Gone: resource expired or was deleted
    Gone,
    /// 412 - Precondition Failed: required state not present
    PreconditionFailed,
    /// 422 - Unprocessable Entity: well-formed but unprocessable
    UnprocessableEntity,
    /// 423 - Locked: resource is temporarily locked
    Locked,
    /// 428 - Precondition Required: additional step required first
    PreconditionRequired,
    /// 429 - Too Many Requests: rate limit exceeded
    TooManyRequests,
    /// 500 - Internal Server Error
    InternalServerError,
    /// 503 - Service Unavailable: dependency outage, fail closed
    ServiceUnavailable,
}

impl ErrorKind {
    /// HTTP status code for this kind
    #[inline]
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Gone => 410,
            ErrorKind::PreconditionFailed => 412,
            ErrorKind::UnprocessableEntity => 422,
            ErrorKind::Locked => 423,
            ErrorKind::PreconditionRequired => 428,
            ErrorKind::TooManyRequests => 429,
            ErrorKind::InternalServerError => 500,
            ErrorKind::ServiceUnavailable => 503,
        }
    }

    /// Standard reason phrase for this kind
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Gone => "Gone",
            ErrorKind::PreconditionFailed => "Precondition Failed",
            ErrorKind::UnprocessableEntity => "Unprocessable Entity",
            ErrorKind::Locked => "Locked",
            ErrorKind::PreconditionRequired => "Precondition Required",
            ErrorKind::TooManyRequests => "Too Many Requests",
            ErrorKind::InternalServerError => "Internal Server Error",
            ErrorKind::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// Whether this is a server-side (5xx) error; these should be logged
    #[inline]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Whether this is a client-side (4xx) error
    #[inline]
    pub const fn is_client_error(&self) -> bool {
        let code = self.status_code();
        code >= 400 && code < 500
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
