//! Account Status Value Object
//!
//! Lifecycle of an identity:
//!
//! ```text
//! PendingVerification --(email verified / admin create)--> Active
//! Active <--(reactivate, privileged)--  Suspended
//! Active  --(suspend, privileged)---->  Suspended
//! Active  --(close)-->  Inactive  --(reopen, privileged)--> Active
//! ```
//!
//! Temporary lockout after failed logins is *not* a status: it lives in the
//! shared TTL store and expires on its own.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum AccountStatus {
    /// Registered but email not yet verified - cannot login
    #[default]
    PendingVerification = 0,

    /// Normal account - can login
    Active = 1,

    /// Suspended by a privileged operator - cannot login
    Suspended = 2,

    /// Closed account - cannot login, may be reopened by an operator
    Inactive = 3,
}

impl AccountStatus {
    /// Get numeric ID for storage
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    /// Get string code for serialization/API
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PendingVerification => "pending_verification",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Inactive => "inactive",
        }
    }

    /// Check if login is allowed
    #[inline]
    pub const fn can_login(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Check whether a direct transition to `next` is allowed
    #[inline]
    pub const fn can_transition_to(&self, next: AccountStatus) -> bool {
        matches!(
            (self, next),
            (Self::PendingVerification, Self::Active)
                | (Self::Active, Self::Suspended)
                | (Self::Suspended, Self::Active)
                | (Self::Active, Self::Inactive)
                | (Self::Inactive, Self::Active)
        )
    }

    /// Create from numeric ID
    #[inline]
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(Self::PendingVerification),
            1 => Some(Self::Active),
            2 => Some(Self::Suspended),
            3 => Some(Self::Inactive),
            _ => None,
        }
    }

    /// Create from string code
    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "pending_verification" => Some(Self::PendingVerification),
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
