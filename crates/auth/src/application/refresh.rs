//! Refresh Use Case
//!
//! Exchanges a live refresh token for a fresh pair, re-checking account
//! status so that a suspension takes effect at the next rotation at the
//! latest.

use crate::application::config::AuthConfig;
use crate::application::token::{TokenPair, TokenService};
use crate::domain::event::SecurityEvent;
use crate::domain::notifier::Notifier;
use crate::domain::repository::CredentialRepository;
use crate::error::{AuthError, AuthResult};
use platform::store::TtlStore;
use std::sync::Arc;

/// Use case for rotating a refresh token
#[derive(Clone)]
pub struct RefreshUseCase<R, S, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    tokens: TokenService<S>,
}

impl<R, S, N> RefreshUseCase<R, S, N>
where
    R: CredentialRepository,
    S: TtlStore,
    N: Notifier,
{
    pub fn new(repository: Arc<R>, store: Arc<S>, notifier: Arc<N>, config: &AuthConfig) -> Self {
        Self {
            repository,
            notifier,
            tokens: TokenService::new(store, config.tokens.clone()),
        }
    }

    /// Rotate `refresh_token`, returning the replacement pair
    pub async fn execute(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let user_id = self.tokens.parse_refresh(refresh_token)?;

        let Some(identity) = self.repository.find_by_id(&user_id).await? else {
            // Identity deleted since issuance; drop the dangling session
            self.tokens.revoke(&user_id).await?;
            return Err(AuthError::RefreshTokenInvalid);
        };
        if !identity.can_login() {
            self.tokens.revoke(&user_id).await?;
            return Err(AuthError::AccountNotActive);
        }

        match self.tokens.rotate(refresh_token, identity.role).await {
            Ok(pair) => Ok(pair),
            Err(AuthError::ReplayDetected) => {
                self.notifier
                    .notify(
                        SecurityEvent::ReplayDetected,
                        &identity.email,
                        serde_json::json!({ "user_id": user_id.to_string() }),
                    )
                    .await;
                Err(AuthError::ReplayDetected)
            }
            Err(err) => Err(err),
        }
    }
}
