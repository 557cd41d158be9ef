//! Identity Entity
//!
//! The credential record behind a login handle: password hash, role,
//! lifecycle status and two-factor enrollment state. Failure counters and
//! lockout flags are deliberately not here; they live in the shared TTL
//! store so that every instance sees the same numbers.

use crate::domain::value_object::{AccountStatus, Email, Role, TotpSecret, UserId};
use crate::error::{AuthError, AuthResult};
use chrono::{DateTime, Utc};
use platform::password::HashedPassword;

/// Identity entity holding credential and enrollment state
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Email,
    pub password_hash: HashedPassword,
    pub role: Role,
    pub status: AccountStatus,
    /// Present once enrollment has begun; authoritative only when
    /// `totp_enabled` is also set
    pub totp_secret: Option<TotpSecret>,
    /// True only after the holder has proven possession with a valid code
    pub totp_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Create a new identity awaiting email verification
    pub fn new(email: Email, password_hash: HashedPassword, role: Role) -> Self {
        let now = Utc::now();
        Self {
            user_id: UserId::new(),
            email,
            password_hash,
            role,
            status: AccountStatus::PendingVerification,
            totp_secret: None,
            totp_enabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if this identity may complete a login
    pub fn can_login(&self) -> bool {
        self.status.can_login()
    }

    /// Whether a second factor is required to complete login
    pub fn two_factor_required(&self) -> bool {
        self.totp_enabled || self.role.requires_two_factor()
    }

    /// Start two-factor enrollment by generating a pending secret.
    ///
    /// The secret is stored but not trusted until [`enable_two_factor`]
    /// confirms the holder can produce codes from it. Re-running enrollment
    /// before confirmation replaces the pending secret.
    ///
    /// [`enable_two_factor`]: Identity::enable_two_factor
    pub fn begin_two_factor_enrollment(&mut self) -> AuthResult<TotpSecret> {
        if self.totp_enabled {
            return Err(AuthError::TwoFactorAlreadyEnabled);
        }
        let secret = TotpSecret::generate();
        self.totp_secret = Some(secret.clone());
        self.touch();
        Ok(secret)
    }

    /// Confirm enrollment after a valid code has been presented
    pub fn enable_two_factor(&mut self) -> AuthResult<()> {
        if self.totp_enabled {
            return Err(AuthError::TwoFactorAlreadyEnabled);
        }
        if self.totp_secret.is_none() {
            return Err(AuthError::TwoFactorNotEnrolled);
        }
        self.totp_enabled = true;
        self.touch();
        Ok(())
    }

    /// Remove the second factor entirely (verified code or admin override)
    pub fn disable_two_factor(&mut self) -> AuthResult<()> {
        if !self.totp_enabled {
            return Err(AuthError::TwoFactorNotEnrolled);
        }
        self.totp_enabled = false;
        self.totp_secret = None;
        self.touch();
        Ok(())
    }

    /// Replace the password hash (reset or change flows)
    pub fn set_password(&mut self, hash: HashedPassword) {
        self.password_hash = hash;
        self.touch();
    }

    /// Mark the email as verified, activating the account
    pub fn activate(&mut self) -> AuthResult<()> {
        self.transition_to(AccountStatus::Active)
    }

    /// Suspend the account (privileged operation)
    pub fn suspend(&mut self) -> AuthResult<()> {
        self.transition_to(AccountStatus::Suspended)
    }

    /// Lift a suspension (privileged operation)
    pub fn reactivate(&mut self) -> AuthResult<()> {
        self.transition_to(AccountStatus::Active)
    }

    /// Close the account
    pub fn deactivate(&mut self) -> AuthResult<()> {
        self.transition_to(AccountStatus::Inactive)
    }

    fn transition_to(&mut self, next: AccountStatus) -> AuthResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AuthError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
