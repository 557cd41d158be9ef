//! Authentication configuration
//!
//! All tunable security policy in one place. Defaults are the production
//! values; `development()` relaxes the expensive knobs for local work.

use crate::domain::value_object::TotpParams;
use platform::password::HashingCost;
use rand::RngCore;
use std::time::Duration;

/// Failed-login throttling policy
#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    /// Consecutive failures that trigger a lock
    pub max_failures: i64,
    /// Counter lifetime; failures further apart than this do not accumulate
    pub counter_window: Duration,
    /// How long a triggered lock holds
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            counter_window: Duration::from_secs(15 * 60),
            lock_duration: Duration::from_secs(30 * 60),
        }
    }
}

/// Bearer token issuance policy
#[derive(Clone)]
pub struct TokenPolicy {
    /// HMAC key for access-token signatures
    pub signing_secret: [u8; 32],
    /// `iss` claim on access tokens
    pub issuer: String,
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime for a standard session
    pub refresh_ttl: Duration,
    /// Refresh token lifetime for a remember-me session
    pub refresh_ttl_remember: Duration,
}

impl std::fmt::Debug for TokenPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPolicy")
            .field("signing_secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("refresh_ttl_remember", &self.refresh_ttl_remember)
            .finish()
    }
}

impl Default for TokenPolicy {
    /// Production lifetimes with a freshly generated signing secret.
    ///
    /// Every call mints its own secret, so tokens never validate against a
    /// knowable default key. Multi-instance deployments must supply one
    /// shared secret explicitly or access tokens fail verification across
    /// instances.
    fn default() -> Self {
        Self {
            signing_secret: random_secret(),
            issuer: "lumilearn".to_string(),
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(24 * 60 * 60),
            refresh_ttl_remember: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

/// Single-use verification token policy (email proof, password reset)
#[derive(Debug, Clone)]
pub struct VerificationPolicy {
    /// Email-verification token lifetime
    pub email_ttl: Duration,
    /// Password-reset token lifetime
    pub reset_ttl: Duration,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            email_ttl: Duration::from_secs(24 * 60 * 60),
            reset_ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// Password hashing policy
#[derive(Clone, Default)]
pub struct PasswordPolicy {
    /// Optional server-side secret mixed into every hash
    pub pepper: Option<Vec<u8>>,
    /// Argon2id cost parameters
    pub cost: HashingCost,
}

impl std::fmt::Debug for PasswordPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordPolicy")
            .field("pepper", &self.pepper.as_ref().map(|_| "[REDACTED]"))
            .field("cost", &self.cost)
            .finish()
    }
}

/// Top-level authentication configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub lockout: LockoutPolicy,
    pub tokens: TokenPolicy,
    pub two_factor: TotpParams,
    pub verification: VerificationPolicy,
    pub password: PasswordPolicy,
}

impl AuthConfig {
    /// Development configuration: cheap hashing, short lock
    pub fn development() -> Self {
        Self {
            lockout: LockoutPolicy {
                lock_duration: Duration::from_secs(60),
                ..LockoutPolicy::default()
            },
            password: PasswordPolicy {
                pepper: None,
                cost: HashingCost::fast_insecure(),
            },
            ..Self::default()
        }
    }
}

fn random_secret() -> [u8; 32] {
    let mut secret = [0u8; 32];
    rand::rng().fill_bytes(&mut secret);
    secret
}
