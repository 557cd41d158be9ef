//! Login Use Case
//!
//! Orchestrates a login attempt end to end: lockout gate, password
//! verification, account status, second factor, token issuance. Check order
//! is fixed so that response shape never reveals whether the identity
//! exists.

use crate::application::config::{AuthConfig, PasswordPolicy};
use crate::application::lockout::LockoutGuard;
use crate::application::token::{TokenPair, TokenService};
use crate::application::two_factor::TwoFactorManager;
use crate::domain::entity::Identity;
use crate::domain::event::SecurityEvent;
use crate::domain::notifier::Notifier;
use crate::domain::repository::CredentialRepository;
use crate::domain::value_object::{Email, Role, UserId};
use crate::error::{AuthError, AuthResult};
use platform::password::ClearTextPassword;
use platform::store::TtlStore;
use std::sync::Arc;

/// Login request
#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    /// Second-factor code, when the client already has one
    pub totp_code: Option<String>,
    /// Request a long-lived refresh session
    pub remember: bool,
}

/// Login result
///
/// When `requires_two_factor` is true the password was accepted but no
/// session exists yet; the client must retry with a code.
#[derive(Debug)]
pub struct LoginOutput {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    pub requires_two_factor: bool,
    pub tokens: Option<TokenPair>,
}

/// Use case for authenticating a user and opening a session
#[derive(Clone)]
pub struct LoginUseCase<R, S, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    lockout: LockoutGuard<S>,
    two_factor: TwoFactorManager<R, S, N>,
    tokens: TokenService<S>,
    password: PasswordPolicy,
}

impl<R, S, N> LoginUseCase<R, S, N>
where
    R: CredentialRepository,
    S: TtlStore,
    N: Notifier,
{
    pub fn new(repository: Arc<R>, store: Arc<S>, notifier: Arc<N>, config: &AuthConfig) -> Self {
        Self {
            lockout: LockoutGuard::new(Arc::clone(&store), config.lockout.clone()),
            two_factor: TwoFactorManager::new(
                Arc::clone(&repository),
                Arc::clone(&store),
                Arc::clone(&notifier),
                config.two_factor.clone(),
            ),
            tokens: TokenService::new(store, config.tokens.clone()),
            password: config.password.clone(),
            repository,
            notifier,
        }
    }

    /// Execute a login attempt
    pub async fn execute(&self, input: LoginInput) -> AuthResult<LoginOutput> {
        // Syntactically invalid handles are a client error: no store round
        // trip, no lockout side effect
        let email =
            Email::new(input.email.as_str()).map_err(|e| AuthError::InvalidInput(e.to_string()))?;

        self.lockout.check(email.as_str()).await?;

        let Some(mut identity) = self.repository.find_by_email(&email).await? else {
            // Unknown handles accumulate failures too, keeping timing and
            // outcomes uniform with known ones
            self.note_failure(email.as_str(), None).await?;
            return Err(AuthError::InvalidCredentials);
        };

        let password = ClearTextPassword::new(input.password)
            .map_err(|e| AuthError::InvalidInput(e.to_string()))?;

        if !identity
            .password_hash
            .verify(&password, self.password.pepper.as_deref())
        {
            self.note_failure(email.as_str(), Some(&identity.email))
                .await?;
            return Err(AuthError::InvalidCredentials);
        }

        // Status is checked only after the password: a wrong guess against a
        // suspended account must look like any other wrong guess
        if !identity.can_login() {
            return Err(AuthError::AccountNotActive);
        }

        if identity.totp_enabled {
            let Some(code) = input.totp_code.as_deref() else {
                // Password accepted, second factor outstanding. Not a
                // failure: the counter is untouched
                return Ok(LoginOutput {
                    user_id: identity.user_id,
                    email: identity.email.into_string(),
                    role: identity.role,
                    requires_two_factor: true,
                    tokens: None,
                });
            };
            if let Err(err) = self.two_factor.verify_login(&identity, code).await {
                if matches!(err, AuthError::InvalidTwoFactorCode) {
                    self.note_failure(email.as_str(), Some(&identity.email))
                        .await?;
                }
                return Err(err);
            }
        } else if identity.role.requires_two_factor() {
            return Err(AuthError::TwoFactorNotEnrolled);
        }

        self.lockout.record_success(email.as_str()).await?;
        self.rehash_if_stale(&mut identity, &password).await;

        let pair = self
            .tokens
            .issue_pair(&identity.user_id, identity.role, input.remember)
            .await?;

        tracing::info!(user_id = %identity.user_id, "Login succeeded");
        Ok(LoginOutput {
            user_id: identity.user_id,
            email: identity.email.into_string(),
            role: identity.role,
            requires_two_factor: false,
            tokens: Some(pair),
        })
    }

    /// Count one failure, notifying the holder if this attempt locked the
    /// account
    async fn note_failure(&self, handle: &str, recipient: Option<&Email>) -> AuthResult<()> {
        let record = self.lockout.record_failure(handle).await?;
        if record.locked_now {
            if let Some(email) = recipient {
                self.notifier
                    .notify(
                        SecurityEvent::AccountLocked,
                        email,
                        serde_json::json!({
                            "retry_after_secs": self.lockout.policy().lock_duration.as_secs(),
                        }),
                    )
                    .await;
            }
        }
        Ok(())
    }

    /// Upgrade the stored hash when cost policy has moved on; login still
    /// succeeds if the write fails
    async fn rehash_if_stale(&self, identity: &mut Identity, password: &ClearTextPassword) {
        if !identity.password_hash.needs_rehash(self.password.cost) {
            return;
        }
        match password.hash(self.password.pepper.as_deref(), self.password.cost) {
            Ok(hash) => {
                identity.set_password(hash);
                if let Err(err) = self.repository.update(identity).await {
                    tracing::debug!(error = %err, "Deferred password rehash failed");
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "Deferred password rehash failed");
            }
        }
    }
}
