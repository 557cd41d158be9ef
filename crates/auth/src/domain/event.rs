//! Security events emitted by the authentication flows
//!
//! Events are advisory: they feed notification and audit pipelines and must
//! never change the outcome of the operation that raised them.

use serde::Serialize;

/// Security-relevant occurrence worth telling the account holder about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEvent {
    /// Account locked after repeated failed logins
    AccountLocked,
    /// A rotated-out refresh token was presented again
    ReplayDetected,
    /// Two-factor authentication was disabled
    TwoFactorDisabled,
    /// Password was changed or reset
    PasswordChanged,
    /// Email verification was requested
    EmailVerificationRequested,
    /// Password reset was requested
    PasswordResetRequested,
}

impl SecurityEvent {
    /// Stable topic name for notification routing
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AccountLocked => "security.account_locked",
            Self::ReplayDetected => "security.replay_detected",
            Self::TwoFactorDisabled => "security.two_factor_disabled",
            Self::PasswordChanged => "security.password_changed",
            Self::EmailVerificationRequested => "security.email_verification_requested",
            Self::PasswordResetRequested => "security.password_reset_requested",
        }
    }
}

impl std::fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
