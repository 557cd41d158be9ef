//! End-to-end scenarios across use cases sharing one store

use crate::application::config::AuthConfig;
use crate::application::login::{LoginInput, LoginUseCase};
use crate::application::logout::LogoutUseCase;
use crate::application::refresh::RefreshUseCase;
use crate::application::token::TokenService;
use crate::application::two_factor::TwoFactorManager;
use crate::application::verification::VerificationUseCase;
use crate::domain::entity::Identity;
use crate::domain::event::SecurityEvent;
use crate::domain::notifier::Notifier;
use crate::domain::repository::CredentialRepository;
use crate::domain::value_object::{Email, Role, TotpParams, TotpSecret, UserId};
use crate::error::AuthError;
use crate::infra::memory::MemoryCredentialRepository;
use platform::password::{ClearTextPassword, HashingCost};
use platform::store::{MemoryTtlStore, StoreError, StoreResult, TtlStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PASSWORD: &str = "correct horse battery";

/// Store double where the backend is down: every call fails
#[derive(Debug, Default)]
struct FailingTtlStore;

impl FailingTtlStore {
    fn offline<T>() -> StoreResult<T> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

impl TtlStore for FailingTtlStore {
    async fn incr_with_ttl(&self, _key: &str, _ttl: Duration) -> StoreResult<i64> {
        Self::offline()
    }

    async fn set_with_ttl(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<()> {
        Self::offline()
    }

    async fn set_if_absent(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<bool> {
        Self::offline()
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Self::offline()
    }

    async fn delete(&self, _key: &str) -> StoreResult<()> {
        Self::offline()
    }

    async fn compare_and_delete(&self, _key: &str, _expected: &str) -> StoreResult<bool> {
        Self::offline()
    }

    async fn compare_and_swap(
        &self,
        _key: &str,
        _expected: &str,
        _new: &str,
        _ttl: Duration,
    ) -> StoreResult<bool> {
        Self::offline()
    }
}

/// Notifier that records every delivery for assertions
#[derive(Debug, Default)]
struct RecordingNotifier {
    deliveries: Mutex<Vec<(SecurityEvent, String)>>,
}

impl RecordingNotifier {
    fn deliveries(&self) -> Vec<(SecurityEvent, String)> {
        self.deliveries.lock().unwrap().clone()
    }

    fn count_of(&self, event: SecurityEvent) -> usize {
        self.deliveries()
            .iter()
            .filter(|(e, _)| *e == event)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, event: SecurityEvent, recipient: &Email, _payload: serde_json::Value) {
        self.deliveries
            .lock()
            .unwrap()
            .push((event, recipient.as_str().to_string()));
    }
}

struct Harness {
    login: LoginUseCase<MemoryCredentialRepository, MemoryTtlStore, RecordingNotifier>,
    refresh: RefreshUseCase<MemoryCredentialRepository, MemoryTtlStore, RecordingNotifier>,
    logout: LogoutUseCase<MemoryTtlStore>,
    verification: VerificationUseCase<MemoryCredentialRepository, MemoryTtlStore, RecordingNotifier>,
    two_factor: TwoFactorManager<MemoryCredentialRepository, MemoryTtlStore, RecordingNotifier>,
    repository: Arc<MemoryCredentialRepository>,
    notifier: Arc<RecordingNotifier>,
}

fn harness(identities: Vec<Identity>) -> Harness {
    let mut config = AuthConfig::default();
    config.password.cost = HashingCost::fast_insecure();

    let store = Arc::new(MemoryTtlStore::new());
    let repository = Arc::new(MemoryCredentialRepository::with(identities));
    let notifier = Arc::new(RecordingNotifier::default());

    Harness {
        login: LoginUseCase::new(
            Arc::clone(&repository),
            Arc::clone(&store),
            Arc::clone(&notifier),
            &config,
        ),
        refresh: RefreshUseCase::new(
            Arc::clone(&repository),
            Arc::clone(&store),
            Arc::clone(&notifier),
            &config,
        ),
        logout: LogoutUseCase::new(Arc::clone(&store), &config),
        verification: VerificationUseCase::new(
            Arc::clone(&repository),
            Arc::clone(&store),
            Arc::clone(&notifier),
            &config,
        ),
        two_factor: TwoFactorManager::new(
            Arc::clone(&repository),
            Arc::clone(&store),
            Arc::clone(&notifier),
            config.two_factor.clone(),
        ),
        repository,
        notifier,
    }
}

fn pending_identity(email: &str) -> Identity {
    let clear = ClearTextPassword::new(PASSWORD.to_string()).unwrap();
    let hash = clear.hash(None, HashingCost::fast_insecure()).unwrap();
    Identity::new(Email::new(email).unwrap(), hash, Role::Learner)
}

fn active_identity(email: &str) -> Identity {
    let mut identity = pending_identity(email);
    identity.activate().unwrap();
    identity
}

fn login_input(email: &str, password: &str) -> LoginInput {
    LoginInput {
        email: email.to_string(),
        password: password.to_string(),
        totp_code: None,
        remember: false,
    }
}

fn current_code(secret: &TotpSecret, account: &str) -> String {
    let now = chrono::Utc::now().timestamp() as u64;
    secret
        .code_at(&TotpParams::default(), account, now)
        .unwrap()
}

#[tokio::test]
async fn account_lifecycle_from_signup_to_login() {
    let identity = pending_identity("new@example.com");
    let user_id = identity.user_id;
    let h = harness(vec![identity]);

    // Cannot log in before verifying
    assert!(matches!(
        h.login.execute(login_input("new@example.com", PASSWORD)).await,
        Err(AuthError::AccountNotActive)
    ));

    let token = h
        .verification
        .request_email_verification(&user_id)
        .await
        .unwrap();
    assert_eq!(
        h.notifier.count_of(SecurityEvent::EmailVerificationRequested),
        1
    );
    h.verification.confirm_email(&token).await.unwrap();

    let output = h
        .login
        .execute(login_input("new@example.com", PASSWORD))
        .await
        .unwrap();
    assert!(output.tokens.is_some());
}

#[tokio::test]
async fn lockout_notifies_holder_exactly_once() {
    let h = harness(vec![active_identity("user@example.com")]);

    for _ in 0..5 {
        let _ = h
            .login
            .execute(login_input("user@example.com", "wrong password"))
            .await;
    }
    assert_eq!(h.notifier.count_of(SecurityEvent::AccountLocked), 1);

    // Further attempts bounce off the lock without another notification
    assert!(matches!(
        h.login.execute(login_input("user@example.com", PASSWORD)).await,
        Err(AuthError::AccountLocked { .. })
    ));
    assert_eq!(h.notifier.count_of(SecurityEvent::AccountLocked), 1);
}

#[tokio::test]
async fn refresh_rotation_detects_replay_and_notifies() {
    let h = harness(vec![active_identity("user@example.com")]);

    let first = h
        .login
        .execute(login_input("user@example.com", PASSWORD))
        .await
        .unwrap()
        .tokens
        .unwrap();
    let second = h.refresh.execute(&first.refresh_token).await.unwrap();

    assert!(matches!(
        h.refresh.execute(&first.refresh_token).await,
        Err(AuthError::ReplayDetected)
    ));
    assert_eq!(h.notifier.count_of(SecurityEvent::ReplayDetected), 1);

    // The whole chain died with the replay
    assert!(matches!(
        h.refresh.execute(&second.refresh_token).await,
        Err(AuthError::RefreshTokenInvalid)
    ));
}

#[tokio::test]
async fn logout_then_refresh_is_invalid_not_replay() {
    let h = harness(vec![active_identity("user@example.com")]);

    let tokens = h
        .login
        .execute(login_input("user@example.com", PASSWORD))
        .await
        .unwrap()
        .tokens
        .unwrap();

    h.logout.execute(&tokens.refresh_token).await.unwrap();

    assert!(matches!(
        h.refresh.execute(&tokens.refresh_token).await,
        Err(AuthError::RefreshTokenInvalid)
    ));
    assert_eq!(h.notifier.count_of(SecurityEvent::ReplayDetected), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rotations_keep_at_most_one_session() {
    let h = harness(vec![active_identity("user@example.com")]);

    let first = h
        .login
        .execute(login_input("user@example.com", PASSWORD))
        .await
        .unwrap()
        .tokens
        .unwrap();

    let refresh = Arc::new(h.refresh);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let refresh = Arc::clone(&refresh);
        let token = first.refresh_token.clone();
        handles.push(tokio::spawn(
            async move { refresh.execute(&token).await },
        ));
    }

    let mut winners = Vec::new();
    for handle in handles {
        if let Ok(pair) = handle.await.unwrap() {
            winners.push(pair);
        }
    }
    assert!(winners.len() <= 1);

    // Whatever was won is dead too: a contested token never leaves a
    // usable session behind
    for pair in winners {
        assert!(refresh.execute(&pair.refresh_token).await.is_err());
    }
}

#[tokio::test]
async fn two_factor_code_cannot_complete_two_logins() {
    let identity = active_identity("user@example.com");
    let user_id = identity.user_id;
    let h = harness(vec![identity]);

    let start = h.two_factor.begin_enrollment(&user_id).await.unwrap();
    let secret = TotpSecret::from_base32(start.secret).unwrap();

    let code = current_code(&secret, "user@example.com");
    h.two_factor
        .confirm_enrollment(&user_id, &code)
        .await
        .unwrap();

    // First factor alone no longer opens a session
    let partial = h
        .login
        .execute(login_input("user@example.com", PASSWORD))
        .await
        .unwrap();
    assert!(partial.requires_two_factor);
    assert!(partial.tokens.is_none());

    // Next step's code completes the login once, and only once
    let later = chrono::Utc::now().timestamp() as u64 + 30;
    let next_code = secret
        .code_at(&TotpParams::default(), "user@example.com", later)
        .unwrap();

    let full = h
        .login
        .execute(LoginInput {
            totp_code: Some(next_code.clone()),
            ..login_input("user@example.com", PASSWORD)
        })
        .await
        .unwrap();
    assert!(full.tokens.is_some());

    assert!(matches!(
        h.login
            .execute(LoginInput {
                totp_code: Some(next_code),
                ..login_input("user@example.com", PASSWORD)
            })
            .await,
        Err(AuthError::InvalidTwoFactorCode)
    ));
}

#[tokio::test]
async fn password_reset_recovers_a_locked_account() {
    let h = harness(vec![active_identity("user@example.com")]);

    for _ in 0..5 {
        let _ = h
            .login
            .execute(login_input("user@example.com", "wrong password"))
            .await;
    }
    assert!(matches!(
        h.login.execute(login_input("user@example.com", PASSWORD)).await,
        Err(AuthError::AccountLocked { .. })
    ));

    let token = h
        .verification
        .request_password_reset("user@example.com")
        .await
        .unwrap()
        .unwrap();
    h.verification
        .reset_password(&token, "a fresh passphrase".to_string())
        .await
        .unwrap();
    assert_eq!(h.notifier.count_of(SecurityEvent::PasswordChanged), 1);

    // Old password is gone, new one works immediately
    assert!(matches!(
        h.login.execute(login_input("user@example.com", PASSWORD)).await,
        Err(AuthError::InvalidCredentials)
    ));
    let output = h
        .login
        .execute(login_input("user@example.com", "a fresh passphrase"))
        .await
        .unwrap();
    assert!(output.tokens.is_some());
}

#[tokio::test]
async fn disabling_two_factor_notifies_the_holder() {
    let identity = active_identity("user@example.com");
    let user_id = identity.user_id;
    let h = harness(vec![identity]);

    let start = h.two_factor.begin_enrollment(&user_id).await.unwrap();
    let secret = TotpSecret::from_base32(start.secret).unwrap();
    let code = current_code(&secret, "user@example.com");
    h.two_factor
        .confirm_enrollment(&user_id, &code)
        .await
        .unwrap();

    h.two_factor.disable(&user_id, None).await.unwrap();
    assert_eq!(h.notifier.count_of(SecurityEvent::TwoFactorDisabled), 1);

    // Login is back to a single factor
    let stored = h.repository.find_by_id(&user_id).await.unwrap().unwrap();
    assert!(!stored.totp_enabled);
    let output = h
        .login
        .execute(login_input("user@example.com", PASSWORD))
        .await
        .unwrap();
    assert!(output.tokens.is_some());
}

#[tokio::test]
async fn store_outage_denies_login_with_correct_credentials() {
    let mut config = AuthConfig::default();
    config.password.cost = HashingCost::fast_insecure();

    let login = LoginUseCase::new(
        Arc::new(MemoryCredentialRepository::with(vec![active_identity(
            "user@example.com",
        )])),
        Arc::new(FailingTtlStore),
        Arc::new(RecordingNotifier::default()),
        &config,
    );

    // Even the right password fails closed while the store is down
    assert!(matches!(
        login.execute(login_input("user@example.com", PASSWORD)).await,
        Err(AuthError::StoreUnavailable(_))
    ));
}

#[tokio::test]
async fn store_outage_denies_refresh_rotation() {
    let config = AuthConfig::default();
    let tokens = TokenService::new(Arc::new(FailingTtlStore), config.tokens.clone());

    let well_formed = format!(
        "{}.{}",
        UserId::new(),
        platform::crypto::to_base64url(&[0u8; 32])
    );
    assert!(matches!(
        tokens.rotate(&well_formed, Role::Learner).await,
        Err(AuthError::StoreUnavailable(_))
    ));
}
