//! Role Value Object
//!
//! Coarse role carried in access-token claims. Privilege checks beyond the
//! two-factor requirement live in the (out-of-scope) authorization layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum Role {
    /// Regular learner account
    #[default]
    Learner = 0,

    /// Course instructor
    Instructor = 1,

    /// Platform administrator
    Admin = 2,
}

impl Role {
    /// Get numeric ID for storage
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    /// Get string code for claims and serialization
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Learner => "learner",
            Self::Instructor => "instructor",
            Self::Admin => "admin",
        }
    }

    /// Elevated roles must have an enrolled second factor before login
    #[inline]
    pub const fn requires_two_factor(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Create from numeric ID
    #[inline]
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(Self::Learner),
            1 => Some(Self::Instructor),
            2 => Some(Self::Admin),
            _ => None,
        }
    }

    /// Create from string code
    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "learner" => Some(Self::Learner),
            "instructor" => Some(Self::Instructor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        for role in [Role::Learner, Role::Instructor, Role::Admin] {
            assert_eq!(Role::from_code(role.code()), Some(role));
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_code("root"), None);
        assert_eq!(Role::from_id(42), None);
    }

    #[test]
    fn test_requires_two_factor() {
        assert!(!Role::Learner.requires_two_factor());
        assert!(!Role::Instructor.requires_two_factor());
        assert!(Role::Admin.requires_two_factor());
    }
}
