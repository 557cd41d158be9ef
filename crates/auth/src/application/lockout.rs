//! Failed-login throttling
//!
//! Counters and lock flags live in the shared TTL store keyed by the
//! normalized login handle, so every instance sees the same state and
//! expiry needs no background sweeper.
//!
//! The lock fires exactly once per overflow even under concurrent failures:
//! the counter increment is atomic, and whichever caller observes the
//! threshold claims the lock flag with a set-if-absent.

use crate::application::config::LockoutPolicy;
use crate::error::{AuthError, AuthResult};
use platform::store::TtlStore;
use std::sync::Arc;

fn failure_key(handle: &str) -> String {
    format!("auth:fails:{}", handle)
}

fn lock_key(handle: &str) -> String {
    format!("auth:lock:{}", handle)
}

/// Outcome of recording one failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureRecord {
    /// Failure count after this attempt
    pub attempts: i64,
    /// True for the single attempt that triggered the lock
    pub locked_now: bool,
}

/// Guards login attempts against brute force
#[derive(Debug, Clone)]
pub struct LockoutGuard<S> {
    store: Arc<S>,
    policy: LockoutPolicy,
}

impl<S: TtlStore> LockoutGuard<S> {
    pub fn new(store: Arc<S>, policy: LockoutPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Seconds until an active lock expires, or `None` when not locked
    pub async fn status(&self, handle: &str) -> AuthResult<Option<u64>> {
        let Some(value) = self.store.get(&lock_key(handle)).await? else {
            return Ok(None);
        };
        // Value is the unlock time as a Unix timestamp; the key's TTL keeps
        // it from outliving the lock
        let unlock_at: i64 = value
            .parse()
            .map_err(|_| AuthError::Internal(format!("Corrupt lock value: {}", value)))?;
        let remaining = unlock_at - chrono::Utc::now().timestamp();
        if remaining <= 0 {
            return Ok(None);
        }
        Ok(Some(remaining as u64))
    }

    /// Fail fast when the handle is locked
    pub async fn check(&self, handle: &str) -> AuthResult<()> {
        match self.status(handle).await? {
            Some(remaining_secs) => Err(AuthError::AccountLocked { remaining_secs }),
            None => Ok(()),
        }
    }

    /// Record one failed attempt, locking the handle when the threshold is
    /// reached
    pub async fn record_failure(&self, handle: &str) -> AuthResult<FailureRecord> {
        let attempts = self
            .store
            .incr_with_ttl(&failure_key(handle), self.policy.counter_window)
            .await?;

        if attempts < self.policy.max_failures {
            return Ok(FailureRecord {
                attempts,
                locked_now: false,
            });
        }

        let unlock_at =
            chrono::Utc::now().timestamp() + self.policy.lock_duration.as_secs() as i64;
        let locked_now = self
            .store
            .set_if_absent(
                &lock_key(handle),
                &unlock_at.to_string(),
                self.policy.lock_duration,
            )
            .await?;

        if locked_now {
            // Winner resets the counter so the next window starts clean
            // after the lock expires
            self.store.delete(&failure_key(handle)).await?;
            tracing::warn!(attempts, "Account locked after repeated login failures");
        }

        Ok(FailureRecord {
            attempts,
            locked_now,
        })
    }

    /// Reset the failure counter after a successful login
    pub async fn record_success(&self, handle: &str) -> AuthResult<()> {
        self.store.delete(&failure_key(handle)).await?;
        Ok(())
    }

    /// Clear both the counter and any active lock (password reset proves
    /// control of the account)
    pub async fn clear(&self, handle: &str) -> AuthResult<()> {
        self.store.delete(&failure_key(handle)).await?;
        self.store.delete(&lock_key(handle)).await?;
        Ok(())
    }
}
