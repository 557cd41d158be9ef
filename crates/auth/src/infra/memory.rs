//! In-memory credential repository
//!
//! Backing store for tests and single-process deployments. Shared-state
//! semantics (lockout, tokens, code claims) do not live here; they are in
//! the TTL store regardless of which repository is plugged in.

use crate::domain::entity::Identity;
use crate::domain::repository::CredentialRepository;
use crate::domain::value_object::{Email, UserId};
use crate::error::AuthResult;
use std::collections::HashMap;
use std::sync::Mutex;

/// Credential repository backed by a process-local map
#[derive(Debug, Default)]
pub struct MemoryCredentialRepository {
    identities: Mutex<HashMap<UserId, Identity>>,
}

impl MemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create pre-populated with the given identities
    pub fn with(identities: Vec<Identity>) -> Self {
        let map = identities
            .into_iter()
            .map(|identity| (identity.user_id, identity))
            .collect();
        Self {
            identities: Mutex::new(map),
        }
    }

    /// Add or replace an identity
    pub fn insert(&self, identity: Identity) {
        self.identities
            .lock()
            .expect("identity map lock poisoned")
            .insert(identity.user_id, identity);
    }
}

impl CredentialRepository for MemoryCredentialRepository {
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Identity>> {
        let map = self.identities.lock().expect("identity map lock poisoned");
        Ok(map.values().find(|i| &i.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<Identity>> {
        let map = self.identities.lock().expect("identity map lock poisoned");
        Ok(map.get(user_id).cloned())
    }

    async fn update(&self, identity: &Identity) -> AuthResult<()> {
        let mut map = self.identities.lock().expect("identity map lock poisoned");
        map.insert(identity.user_id, identity.clone());
        Ok(())
    }
}
