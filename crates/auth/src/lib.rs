//! Authentication and session security core
//!
//! Credential verification, failed-login throttling, TOTP two-factor
//! authentication and bearer-token session management, structured in three
//! layers:
//!
//! - `domain`: entities, value objects and the repository/notifier seams
//! - `application`: use cases and the services they compose
//! - `infra`: Redis and in-memory implementations of those seams
//!
//! All cross-instance state (failure counters, lock flags, refresh-token
//! digests, consumed TOTP steps, verification tokens) lives behind the
//! `platform` TTL-store trait, so any number of instances sharing one store
//! enforce the same limits. Store failures always fail closed.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

pub use application::{
    AccessClaims, AuthConfig, LoginInput, LoginOutput, LoginUseCase, LogoutUseCase,
    RefreshUseCase, TokenPair, TokenService, TwoFactorManager, VerificationUseCase,
};
pub use domain::entity::Identity;
pub use domain::event::SecurityEvent;
pub use domain::notifier::{Notifier, NullNotifier};
pub use domain::repository::CredentialRepository;
pub use domain::value_object::{AccountStatus, Email, Role, TotpParams, TotpSecret, UserId};
pub use error::{AuthError, AuthResult};

#[cfg(test)]
mod tests;
