//! Repository trait for credential records
//!
//! Implementations live in the infra layer. `trait_variant` generates the
//! `Send`-bounded `CredentialRepository` used across await points.

use crate::domain::entity::Identity;
use crate::domain::value_object::{Email, UserId};
use crate::error::AuthResult;

/// Credential record persistence
#[trait_variant::make(CredentialRepository: Send)]
pub trait LocalCredentialRepository {
    /// Look up an identity by its login handle
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Identity>>;

    /// Look up an identity by ID
    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<Identity>>;

    /// Persist changes to an existing identity
    async fn update(&self, identity: &Identity) -> AuthResult<()>;
}
