//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::store::StoreError;
use thiserror::Error;

use crate::domain::value_object::account_status::AccountStatus;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
///
/// User-facing messages deliberately avoid distinguishing "unknown identity"
/// from "wrong password" and "locked" from anything more specific than the
/// remaining time, to prevent identity enumeration.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed identity/secret/code; reported to the caller, never counted
    /// toward lockout
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Wrong password or unknown identity; counted toward lockout
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Account is temporarily locked after repeated failures
    #[error("Account is temporarily locked")]
    AccountLocked {
        /// Seconds until the lock expires
        remaining_secs: u64,
    },

    /// Account status forbids login; not counted toward lockout
    #[error("Account is not active")]
    AccountNotActive,

    /// Invalid two-factor code; counted toward lockout
    #[error("Invalid two-factor authentication code")]
    InvalidTwoFactorCode,

    /// Operation requires an enrolled second factor
    #[error("Two-factor authentication not set up")]
    TwoFactorNotEnrolled,

    /// Enrollment attempted while a second factor is already active
    #[error("Two-factor authentication already enabled")]
    TwoFactorAlreadyEnabled,

    /// A superseded refresh token was presented; the session has been revoked
    #[error("Refresh token reuse detected")]
    ReplayDetected,

    /// Refresh token is unknown, revoked or expired
    #[error("Refresh token is invalid or expired")]
    RefreshTokenInvalid,

    /// Access token failed signature or expiry validation
    #[error("Access token is invalid or expired")]
    InvalidAccessToken,

    /// Email verification / password reset token rejected
    #[error("Verification token is invalid or expired")]
    InvalidVerificationToken,

    /// Identity lookup miss on an authenticated management operation
    #[error("Identity not found")]
    IdentityNotFound,

    /// Disallowed account status transition
    #[error("Cannot transition account from {from} to {to}")]
    InvalidStatusTransition {
        from: AccountStatus,
        to: AccountStatus,
    },

    /// Shared store failure; fail closed
    #[error("Service temporarily unavailable")]
    StoreUnavailable(#[from] StoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidInput(_) => ErrorKind::BadRequest,
            AuthError::InvalidCredentials
            | AuthError::InvalidTwoFactorCode
            | AuthError::ReplayDetected
            | AuthError::RefreshTokenInvalid
            | AuthError::InvalidAccessToken
            | AuthError::InvalidVerificationToken => ErrorKind::Unauthorized,
            AuthError::AccountLocked { .. } => ErrorKind::Locked,
            AuthError::AccountNotActive => ErrorKind::Forbidden,
            AuthError::TwoFactorNotEnrolled => ErrorKind::PreconditionRequired,
            AuthError::TwoFactorAlreadyEnabled => ErrorKind::PreconditionFailed,
            AuthError::IdentityNotFound => ErrorKind::NotFound,
            AuthError::InvalidStatusTransition { .. } => ErrorKind::Conflict,
            AuthError::StoreUnavailable(_) => ErrorKind::ServiceUnavailable,
            AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Convert to AppError for the route layer, logging at the level the
    /// variant warrants
    pub fn to_app_error(&self) -> AppError {
        self.log();
        let err = AppError::new(self.kind(), self.to_string());
        match self {
            AuthError::AccountLocked { remaining_secs } => {
                err.with_action(format!("Try again in {} seconds", remaining_secs))
            }
            AuthError::ReplayDetected | AuthError::RefreshTokenInvalid => {
                err.with_action("Please sign in again")
            }
            _ => err,
        }
    }

    /// Log the error with appropriate level; runs once per conversion at
    /// the route boundary
    fn log(&self) {
        match self {
            AuthError::StoreUnavailable(e) => {
                tracing::error!(error = %e, "Shared store error, failing closed");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::ReplayDetected => {
                tracing::warn!("Refresh token replay detected");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::AccountLocked { remaining_secs } => {
                tracing::warn!(remaining_secs, "Login attempt on locked account");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
