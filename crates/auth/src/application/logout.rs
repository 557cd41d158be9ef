//! Logout Use Case
//!
//! Drops the server-side refresh record. Outstanding access tokens stay
//! valid until their short expiry; nothing here can recall them.

use crate::application::config::AuthConfig;
use crate::application::token::TokenService;
use crate::domain::value_object::UserId;
use crate::error::AuthResult;
use platform::store::TtlStore;
use std::sync::Arc;

/// Use case for ending a session
#[derive(Clone)]
pub struct LogoutUseCase<S> {
    tokens: TokenService<S>,
}

impl<S: TtlStore> LogoutUseCase<S> {
    pub fn new(store: Arc<S>, config: &AuthConfig) -> Self {
        Self {
            tokens: TokenService::new(store, config.tokens.clone()),
        }
    }

    /// Log out the session behind `refresh_token`.
    ///
    /// Idempotent, and deliberately lenient: a malformed or already-dead
    /// token still logs out successfully.
    pub async fn execute(&self, refresh_token: &str) -> AuthResult<()> {
        let Ok(user_id) = self.tokens.parse_refresh(refresh_token) else {
            return Ok(());
        };
        self.tokens.revoke(&user_id).await?;
        tracing::info!(user_id = %user_id, "Session revoked");
        Ok(())
    }

    /// Revoke a user's session directly (administrative)
    pub async fn revoke_user(&self, user_id: &UserId) -> AuthResult<()> {
        self.tokens.revoke(user_id).await
    }
}
