//! Two-factor enrollment and verification
//!
//! Enrollment is two-phase: a pending secret is generated and handed out
//! (base32, otpauth URI, QR), and only a valid code flips it to enabled.
//!
//! Every accepted code claims its time step in the shared store for the
//! width of the drift window, so a captured code cannot be replayed on
//! another instance.

use crate::domain::entity::Identity;
use crate::domain::event::SecurityEvent;
use crate::domain::notifier::Notifier;
use crate::domain::repository::CredentialRepository;
use crate::domain::value_object::{TotpParams, TotpSecret, UserId};
use crate::error::{AuthError, AuthResult};
use platform::store::TtlStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

fn used_step_key(user_id: &UserId, step: u64) -> String {
    format!("auth:totp:used:{}:{}", user_id, step)
}

/// Material handed to the user to set up their authenticator app
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentStart {
    /// Base32 secret for manual entry
    pub secret: String,
    /// otpauth:// provisioning URI
    pub otpauth_url: String,
    /// QR code PNG, base64-encoded
    pub qr_code: String,
}

/// Manages two-factor enrollment and code verification
#[derive(Clone)]
pub struct TwoFactorManager<R, S, N> {
    repository: Arc<R>,
    store: Arc<S>,
    notifier: Arc<N>,
    params: TotpParams,
}

impl<R, S, N> TwoFactorManager<R, S, N>
where
    R: CredentialRepository,
    S: TtlStore,
    N: Notifier,
{
    pub fn new(repository: Arc<R>, store: Arc<S>, notifier: Arc<N>, params: TotpParams) -> Self {
        Self {
            repository,
            store,
            notifier,
            params,
        }
    }

    /// Start enrollment, generating a pending secret
    pub async fn begin_enrollment(&self, user_id: &UserId) -> AuthResult<EnrollmentStart> {
        let mut identity = self.find(user_id).await?;
        let secret = identity.begin_two_factor_enrollment()?;
        self.repository.update(&identity).await?;

        let account = identity.email.as_str();
        Ok(EnrollmentStart {
            secret: secret.as_base32().to_string(),
            otpauth_url: secret.provisioning_uri(&self.params, account)?,
            qr_code: secret.generate_qr_code(&self.params, account)?,
        })
    }

    /// Confirm enrollment with a code from the authenticator app
    pub async fn confirm_enrollment(&self, user_id: &UserId, code: &str) -> AuthResult<()> {
        let mut identity = self.find(user_id).await?;
        if identity.totp_enabled {
            return Err(AuthError::TwoFactorAlreadyEnabled);
        }
        let secret = identity
            .totp_secret
            .clone()
            .ok_or(AuthError::TwoFactorNotEnrolled)?;

        self.consume_code(user_id, &secret, identity.email.as_str(), code)
            .await?;

        identity.enable_two_factor()?;
        self.repository.update(&identity).await?;
        tracing::info!(user_id = %user_id, "Two-factor authentication enabled");
        Ok(())
    }

    /// Verify a login code for an identity with two-factor enabled
    pub async fn verify_login(&self, identity: &Identity, code: &str) -> AuthResult<()> {
        if !identity.totp_enabled {
            return Err(AuthError::TwoFactorNotEnrolled);
        }
        let secret = identity
            .totp_secret
            .clone()
            .ok_or(AuthError::TwoFactorNotEnrolled)?;
        self.consume_code(&identity.user_id, &secret, identity.email.as_str(), code)
            .await
    }

    /// Disable two-factor authentication.
    ///
    /// A regular caller proves possession with a current code; `None` is the
    /// administrative override for lost authenticators.
    pub async fn disable(&self, user_id: &UserId, code: Option<&str>) -> AuthResult<()> {
        let mut identity = self.find(user_id).await?;
        if !identity.totp_enabled {
            return Err(AuthError::TwoFactorNotEnrolled);
        }

        if let Some(code) = code {
            let secret = identity
                .totp_secret
                .clone()
                .ok_or(AuthError::TwoFactorNotEnrolled)?;
            self.consume_code(user_id, &secret, identity.email.as_str(), code)
                .await?;
        } else {
            tracing::warn!(user_id = %user_id, "Two-factor disabled by administrative override");
        }

        identity.disable_two_factor()?;
        self.repository.update(&identity).await?;

        self.notifier
            .notify(
                SecurityEvent::TwoFactorDisabled,
                &identity.email,
                serde_json::json!({ "user_id": user_id.to_string() }),
            )
            .await;
        Ok(())
    }

    /// Verify `code` and claim its time step; each code instance is accepted
    /// at most once
    async fn consume_code(
        &self,
        user_id: &UserId,
        secret: &TotpSecret,
        account: &str,
        code: &str,
    ) -> AuthResult<()> {
        let now = chrono::Utc::now().timestamp() as u64;
        let step = secret
            .verify_at(code, &self.params, account, now)?
            .ok_or(AuthError::InvalidTwoFactorCode)?;

        let claimed = self
            .store
            .set_if_absent(
                &used_step_key(user_id, step),
                "1",
                Duration::from_secs(self.params.window_secs()),
            )
            .await?;
        if !claimed {
            tracing::warn!(user_id = %user_id, "Replayed TOTP code rejected");
            return Err(AuthError::InvalidTwoFactorCode);
        }
        Ok(())
    }

    async fn find(&self, user_id: &UserId) -> AuthResult<Identity> {
        self.repository
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::IdentityNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notifier::NullNotifier;
    use crate::domain::value_object::{Email, Role};
    use crate::infra::memory::MemoryCredentialRepository;
    use platform::password::{ClearTextPassword, HashingCost};
    use platform::store::MemoryTtlStore;

    fn test_identity() -> Identity {
        let password = ClearTextPassword::new("correct horse battery".to_string()).unwrap();
        let hash = password.hash(None, HashingCost::fast_insecure()).unwrap();
        let mut identity = Identity::new(
            Email::new("user@example.com").unwrap(),
            hash,
            Role::Learner,
        );
        identity.activate().unwrap();
        identity
    }

    fn manager(
        repository: Arc<MemoryCredentialRepository>,
    ) -> TwoFactorManager<MemoryCredentialRepository, MemoryTtlStore, NullNotifier> {
        TwoFactorManager::new(
            repository,
            Arc::new(MemoryTtlStore::new()),
            Arc::new(NullNotifier),
            TotpParams::default(),
        )
    }

    fn current_code(secret: &TotpSecret, account: &str) -> String {
        let now = chrono::Utc::now().timestamp() as u64;
        secret
            .code_at(&TotpParams::default(), account, now)
            .unwrap()
    }

    #[tokio::test]
    async fn test_full_enrollment_flow() {
        let identity = test_identity();
        let user_id = identity.user_id;
        let repository = Arc::new(MemoryCredentialRepository::with(vec![identity]));
        let manager = manager(Arc::clone(&repository));

        let start = manager.begin_enrollment(&user_id).await.unwrap();
        assert!(start.otpauth_url.starts_with("otpauth://totp/"));
        assert!(!start.qr_code.is_empty());

        let secret = TotpSecret::from_base32(start.secret).unwrap();
        let code = current_code(&secret, "user@example.com");
        manager.confirm_enrollment(&user_id, &code).await.unwrap();

        let stored = repository.find_by_id(&user_id).await.unwrap().unwrap();
        assert!(stored.totp_enabled);

        // A second enrollment while enabled is refused
        assert!(matches!(
            manager.begin_enrollment(&user_id).await,
            Err(AuthError::TwoFactorAlreadyEnabled)
        ));
    }

    #[tokio::test]
    async fn test_confirm_rejects_wrong_code() {
        let identity = test_identity();
        let user_id = identity.user_id;
        let repository = Arc::new(MemoryCredentialRepository::with(vec![identity]));
        let manager = manager(Arc::clone(&repository));

        manager.begin_enrollment(&user_id).await.unwrap();
        assert!(matches!(
            manager.confirm_enrollment(&user_id, "000000").await,
            Err(AuthError::InvalidTwoFactorCode)
        ));

        // Still pending, not enabled
        let stored = repository.find_by_id(&user_id).await.unwrap().unwrap();
        assert!(!stored.totp_enabled);
    }

    #[tokio::test]
    async fn test_login_code_is_single_use() {
        let identity = test_identity();
        let user_id = identity.user_id;
        let repository = Arc::new(MemoryCredentialRepository::with(vec![identity]));
        let manager = manager(Arc::clone(&repository));

        let start = manager.begin_enrollment(&user_id).await.unwrap();
        let secret = TotpSecret::from_base32(start.secret).unwrap();
        let code = current_code(&secret, "user@example.com");
        manager.confirm_enrollment(&user_id, &code).await.unwrap();

        let enrolled = repository.find_by_id(&user_id).await.unwrap().unwrap();

        // The confirmation consumed this step; replaying the same code at
        // login is rejected even though the code itself is still current
        assert!(matches!(
            manager.verify_login(&enrolled, &code).await,
            Err(AuthError::InvalidTwoFactorCode)
        ));
    }

    #[tokio::test]
    async fn test_verify_login_requires_enrollment() {
        let identity = test_identity();
        let repository = Arc::new(MemoryCredentialRepository::with(vec![identity.clone()]));
        let manager = manager(repository);

        assert!(matches!(
            manager.verify_login(&identity, "123456").await,
            Err(AuthError::TwoFactorNotEnrolled)
        ));
    }

    #[tokio::test]
    async fn test_disable_with_admin_override() {
        let identity = test_identity();
        let user_id = identity.user_id;
        let repository = Arc::new(MemoryCredentialRepository::with(vec![identity]));
        let manager = manager(Arc::clone(&repository));

        let start = manager.begin_enrollment(&user_id).await.unwrap();
        let secret = TotpSecret::from_base32(start.secret).unwrap();
        let code = current_code(&secret, "user@example.com");
        manager.confirm_enrollment(&user_id, &code).await.unwrap();

        manager.disable(&user_id, None).await.unwrap();

        let stored = repository.find_by_id(&user_id).await.unwrap().unwrap();
        assert!(!stored.totp_enabled);
        assert!(stored.totp_secret.is_none());
    }

    #[tokio::test]
    async fn test_disable_requires_valid_code_for_regular_callers() {
        let identity = test_identity();
        let user_id = identity.user_id;
        let repository = Arc::new(MemoryCredentialRepository::with(vec![identity]));
        let manager = manager(Arc::clone(&repository));

        let start = manager.begin_enrollment(&user_id).await.unwrap();
        let secret = TotpSecret::from_base32(start.secret).unwrap();
        let code = current_code(&secret, "user@example.com");
        manager.confirm_enrollment(&user_id, &code).await.unwrap();

        assert!(matches!(
            manager.disable(&user_id, Some("000000")).await,
            Err(AuthError::InvalidTwoFactorCode)
        ));
        let stored = repository.find_by_id(&user_id).await.unwrap().unwrap();
        assert!(stored.totp_enabled);
    }

    #[tokio::test]
    async fn test_unknown_identity() {
        let repository = Arc::new(MemoryCredentialRepository::new());
        let manager = manager(repository);

        assert!(matches!(
            manager.begin_enrollment(&UserId::new()).await,
            Err(AuthError::IdentityNotFound)
        ));
    }
}
