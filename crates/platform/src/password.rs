//! Password Hashing and Verification
//!
//! NIST SP 800-63B compliant password handling with:
//! - Argon2id hashing (memory-hard, recommended by OWASP)
//! - Tunable cost parameters
//! - Zeroization of sensitive data
//! - Constant-time comparison
//!
//! Each verification is deliberately expensive; callers should treat it as
//! the dominant CPU cost of a login attempt.

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Constants (NIST SP 800-63B compliant)
// ============================================================================

/// Minimum password length (NIST: SHALL be at least 8)
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length (NIST: SHOULD permit at least 64)
pub const MAX_PASSWORD_LENGTH: usize = 128;

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    /// Password is too short
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    /// Password is too long
    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    /// Password contains only whitespace
    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    /// Password contains invalid characters (control characters)
    #[error("Password contains invalid control characters")]
    InvalidCharacter,
}

/// Password hashing/verification errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    /// Hashing operation failed
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    /// Invalid hash format
    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Hashing cost
// ============================================================================

/// Tunable Argon2id cost parameters
///
/// Defaults follow the OWASP recommendation: m=19456 (19 MiB), t=2, p=1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingCost {
    /// Memory cost in KiB
    pub m_cost_kib: u32,
    /// Number of iterations
    pub t_cost: u32,
    /// Degree of parallelism
    pub p_cost: u32,
}

impl Default for HashingCost {
    fn default() -> Self {
        Self {
            m_cost_kib: 19_456,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

impl HashingCost {
    /// Reduced cost for tests, where throughput matters more than hardness
    pub fn fast_insecure() -> Self {
        Self {
            m_cost_kib: 1024,
            t_cost: 1,
            p_cost: 1,
        }
    }

    fn to_argon2(self) -> Result<Argon2<'static>, PasswordHashError> {
        let params = Params::new(self.m_cost_kib, self.t_cost, self.p_cost, None)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// Ensures password data is securely erased from memory when dropped.
/// Does not implement `Clone`; debug output is redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Create a new clear text password with validation
    ///
    /// Validates against NIST SP 800-63B requirements (length bounds, no
    /// control characters, not whitespace-only). Unicode is normalized using
    /// NFKC before validation.
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let normalized: String = raw.nfkc().collect();

        let trimmed = normalized.trim();
        if trimmed.is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        // NIST: count Unicode code points, not bytes
        let char_count = normalized.chars().count();

        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        for ch in normalized.chars() {
            if ch.is_control() && ch != ' ' && ch != '\t' && ch != '\n' {
                return Err(PasswordPolicyError::InvalidCharacter);
            }
        }

        Ok(Self(normalized))
    }

    /// Get the password as bytes for hashing
    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Hash the password using Argon2id
    ///
    /// ## Arguments
    /// * `pepper` - optional application-wide secret appended before hashing
    /// * `cost` - Argon2id cost parameters
    ///
    /// ## Returns
    /// PHC-formatted hash string wrapped in [`HashedPassword`]
    pub fn hash(
        &self,
        pepper: Option<&[u8]>,
        cost: HashingCost,
    ) -> Result<HashedPassword, PasswordHashError> {
        let password_bytes = match pepper {
            Some(p) => {
                let mut combined = self.as_bytes().to_vec();
                combined.extend_from_slice(p);
                combined
            }
            None => self.as_bytes().to_vec(),
        };

        // Random 128-bit salt
        let salt = SaltString::generate(OsRng);

        let argon2 = cost.to_argon2()?;

        let hash = argon2
            .hash_password(&password_bytes, &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Hashed password in PHC string format
///
/// The PHC string carries the algorithm identifier, version, cost parameters,
/// salt and hash, so verification needs no out-of-band parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Create from PHC string (e.g., from the credential repository)
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();

        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;

        Ok(Self { hash })
    }

    /// Get the PHC string for storage
    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// Verify a password against this hash
    ///
    /// Uses constant-time comparison internally. The pepper must match the
    /// one used during hashing. Has no side effects beyond CPU time.
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let password_bytes = match pepper {
            Some(p) => {
                let mut combined = password.as_bytes().to_vec();
                combined.extend_from_slice(p);
                combined
            }
            None => password.as_bytes().to_vec(),
        };

        let parsed_hash = match PasswordHash::new(&self.hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        // Cost parameters come from the PHC string itself
        Argon2::default()
            .verify_password(&password_bytes, &parsed_hash)
            .is_ok()
    }

    /// Check if the hash should be recomputed under the current cost policy
    pub fn needs_rehash(&self, cost: HashingCost) -> bool {
        let parsed_hash = match PasswordHash::new(&self.hash) {
            Ok(h) => h,
            Err(_) => return true,
        };

        if parsed_hash.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }

        let params = match Params::try_from(&parsed_hash) {
            Ok(p) => p,
            Err(_) => return true,
        };

        params.m_cost() < cost.m_cost_kib
            || params.t_cost() < cost.t_cost
            || params.p_cost() < cost.p_cost
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cost() -> HashingCost {
        HashingCost::fast_insecure()
    }

    #[test]
    fn test_password_policy_length() {
        assert!(matches!(
            ClearTextPassword::new("short".to_string()),
            Err(PasswordPolicyError::TooShort { .. })
        ));
        assert!(matches!(
            ClearTextPassword::new("x".repeat(129)),
            Err(PasswordPolicyError::TooLong { .. })
        ));
        assert!(ClearTextPassword::new("long enough password".to_string()).is_ok());
    }

    #[test]
    fn test_password_policy_whitespace_and_control() {
        assert!(matches!(
            ClearTextPassword::new("        ".to_string()),
            Err(PasswordPolicyError::EmptyOrWhitespace)
        ));
        assert!(matches!(
            ClearTextPassword::new("pass\u{0007}word!".to_string()),
            Err(PasswordPolicyError::InvalidCharacter)
        ));
    }

    #[test]
    fn test_hash_and_verify() {
        let password = ClearTextPassword::new("correct horse battery".to_string()).unwrap();
        let hashed = password.hash(None, cost()).unwrap();

        assert!(hashed.verify(&password, None));

        let wrong = ClearTextPassword::new("incorrect horse".to_string()).unwrap();
        assert!(!hashed.verify(&wrong, None));
    }

    #[test]
    fn test_pepper_must_match() {
        let password = ClearTextPassword::new("correct horse battery".to_string()).unwrap();
        let hashed = password.hash(Some(b"pepper"), cost()).unwrap();

        let password = ClearTextPassword::new("correct horse battery".to_string()).unwrap();
        assert!(hashed.verify(&password, Some(b"pepper")));
        assert!(!hashed.verify(&password, None));
        assert!(!hashed.verify(&password, Some(b"other")));
    }

    #[test]
    fn test_phc_roundtrip() {
        let password = ClearTextPassword::new("correct horse battery".to_string()).unwrap();
        let hashed = password.hash(None, cost()).unwrap();

        let restored = HashedPassword::from_phc_string(hashed.as_phc_string()).unwrap();
        assert!(restored.verify(&password, None));

        assert!(HashedPassword::from_phc_string("not-a-phc-string").is_err());
    }

    #[test]
    fn test_needs_rehash() {
        let password = ClearTextPassword::new("correct horse battery".to_string()).unwrap();
        let hashed = password.hash(None, cost()).unwrap();

        assert!(!hashed.needs_rehash(cost()));
        // Raising the cost policy marks the old hash stale
        assert!(hashed.needs_rehash(HashingCost::default()));
    }

    #[test]
    fn test_nfkc_normalization() {
        // Full-width characters normalize to ASCII, so both spellings verify
        let wide = ClearTextPassword::new("ｐａｓｓｗｏｒｄ１２３".to_string()).unwrap();
        let narrow = ClearTextPassword::new("password123".to_string()).unwrap();
        let hashed = wide.hash(None, cost()).unwrap();
        assert!(hashed.verify(&narrow, None));
    }

    #[test]
    fn test_debug_redacted() {
        let password = ClearTextPassword::new("correct horse battery".to_string()).unwrap();
        let debug = format!("{:?}", password);
        assert!(!debug.contains("horse"));
        assert!(debug.contains("REDACTED"));
    }
}
