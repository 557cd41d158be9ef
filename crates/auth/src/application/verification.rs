//! Email verification and password reset
//!
//! Both flows hand out a single-use opaque token over email. Only a SHA-256
//! digest of the token is stored, keyed by purpose, with the user ID as the
//! value; consumption is an atomic compare-and-delete so a token survives at
//! most one redemption even across instances.

use crate::application::config::AuthConfig;
use crate::application::lockout::LockoutGuard;
use crate::application::token::TokenService;
use crate::domain::entity::Identity;
use crate::domain::event::SecurityEvent;
use crate::domain::notifier::Notifier;
use crate::domain::repository::CredentialRepository;
use crate::domain::value_object::{AccountStatus, Email, UserId};
use crate::error::{AuthError, AuthResult};
use platform::crypto::{random_bytes, sha256_hex, to_base64url};
use platform::password::ClearTextPassword;
use platform::store::TtlStore;
use std::str::FromStr;
use std::sync::Arc;

const VERIFICATION_TOKEN_LEN: usize = 32;

fn email_token_key(token: &str) -> String {
    format!("auth:verify:email:{}", sha256_hex(token.as_bytes()))
}

fn reset_token_key(token: &str) -> String {
    format!("auth:verify:reset:{}", sha256_hex(token.as_bytes()))
}

/// Use case for email-ownership proof and password recovery
#[derive(Clone)]
pub struct VerificationUseCase<R, S, N> {
    repository: Arc<R>,
    store: Arc<S>,
    notifier: Arc<N>,
    lockout: LockoutGuard<S>,
    tokens: TokenService<S>,
    config: AuthConfig,
}

impl<R, S, N> VerificationUseCase<R, S, N>
where
    R: CredentialRepository,
    S: TtlStore,
    N: Notifier,
{
    pub fn new(repository: Arc<R>, store: Arc<S>, notifier: Arc<N>, config: &AuthConfig) -> Self {
        Self {
            repository,
            lockout: LockoutGuard::new(Arc::clone(&store), config.lockout.clone()),
            tokens: TokenService::new(Arc::clone(&store), config.tokens.clone()),
            store,
            notifier,
            config: config.clone(),
        }
    }

    /// Issue an email-verification token for a pending account.
    ///
    /// Re-requesting issues a fresh token without invalidating earlier ones;
    /// they all expire on their own clock.
    pub async fn request_email_verification(&self, user_id: &UserId) -> AuthResult<String> {
        let identity = self.find(user_id).await?;
        if identity.status != AccountStatus::PendingVerification {
            return Err(AuthError::InvalidStatusTransition {
                from: identity.status,
                to: AccountStatus::Active,
            });
        }

        let token = mint_token();
        self.store
            .set_with_ttl(
                &email_token_key(&token),
                &identity.user_id.to_string(),
                self.config.verification.email_ttl,
            )
            .await?;

        self.notifier
            .notify(
                SecurityEvent::EmailVerificationRequested,
                &identity.email,
                serde_json::json!({
                    "token": token,
                    "expires_in_secs": self.config.verification.email_ttl.as_secs(),
                }),
            )
            .await;
        Ok(token)
    }

    /// Redeem an email-verification token, activating the account
    pub async fn confirm_email(&self, token: &str) -> AuthResult<()> {
        let user_id = self
            .consume_token(&email_token_key(token))
            .await?
            .ok_or(AuthError::InvalidVerificationToken)?;

        let mut identity = self.find(&user_id).await?;
        identity.activate()?;
        self.repository.update(&identity).await?;
        tracing::info!(user_id = %user_id, "Email verified, account activated");
        Ok(())
    }

    /// Issue a password-reset token.
    ///
    /// Returns `None` for unknown handles so callers can answer uniformly
    /// and reveal nothing about account existence.
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<Option<String>> {
        let Ok(email) = Email::new(email) else {
            return Ok(None);
        };
        let Some(identity) = self.repository.find_by_email(&email).await? else {
            return Ok(None);
        };

        let token = mint_token();
        self.store
            .set_with_ttl(
                &reset_token_key(&token),
                &identity.user_id.to_string(),
                self.config.verification.reset_ttl,
            )
            .await?;

        self.notifier
            .notify(
                SecurityEvent::PasswordResetRequested,
                &identity.email,
                serde_json::json!({
                    "token": token,
                    "expires_in_secs": self.config.verification.reset_ttl.as_secs(),
                }),
            )
            .await;
        Ok(Some(token))
    }

    /// Redeem a reset token and install a new password.
    ///
    /// Proving email control clears any lockout and revokes the user's
    /// refresh session, so stolen credentials die with the old password.
    pub async fn reset_password(&self, token: &str, new_password: String) -> AuthResult<()> {
        // Validate the password before burning the single-use token, so a
        // typo does not force the user back through email
        let password = ClearTextPassword::new(new_password)
            .map_err(|e| AuthError::InvalidInput(e.to_string()))?;

        let user_id = self
            .consume_token(&reset_token_key(token))
            .await?
            .ok_or(AuthError::InvalidVerificationToken)?;
        let mut identity = self.find(&user_id).await?;

        let hash = password
            .hash(
                self.config.password.pepper.as_deref(),
                self.config.password.cost,
            )
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        identity.set_password(hash);
        self.repository.update(&identity).await?;

        self.tokens.revoke(&user_id).await?;
        self.lockout.clear(identity.email.as_str()).await?;

        self.notifier
            .notify(
                SecurityEvent::PasswordChanged,
                &identity.email,
                serde_json::json!({ "user_id": user_id.to_string() }),
            )
            .await;
        tracing::info!(user_id = %user_id, "Password reset completed");
        Ok(())
    }

    /// Atomically redeem a stored token, returning the user it was minted
    /// for. At most one concurrent caller gets `Some`.
    async fn consume_token(&self, key: &str) -> AuthResult<Option<UserId>> {
        let Some(value) = self.store.get(key).await? else {
            return Ok(None);
        };
        if !self.store.compare_and_delete(key, &value).await? {
            return Ok(None);
        }
        let user_id = UserId::from_str(&value)
            .map_err(|_| AuthError::Internal(format!("Corrupt verification record at {}", key)))?;
        Ok(Some(user_id))
    }

    async fn find(&self, user_id: &UserId) -> AuthResult<Identity> {
        self.repository
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::IdentityNotFound)
    }
}

fn mint_token() -> String {
    to_base64url(&random_bytes(VERIFICATION_TOKEN_LEN))
}
