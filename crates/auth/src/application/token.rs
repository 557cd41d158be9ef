//! Bearer token issuance, rotation and revocation
//!
//! Access tokens are short-lived HS256 JWTs verified statelessly. Refresh
//! tokens are opaque `{user_id}.{random}` strings; only a SHA-256 digest is
//! stored server-side, one live token per user, keyed `auth:refresh:{id}`.
//!
//! Rotation is single-use: a compare-and-swap guarded on the stored digest
//! replaces it, and any mismatch (superseded token, or a lost race on the
//! same token) revokes the whole chain as a replay.

use crate::application::config::TokenPolicy;
use crate::domain::value_object::{Role, UserId};
use crate::error::{AuthError, AuthResult};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use platform::crypto::{random_bytes, sha256_hex, to_base64url};
use platform::store::TtlStore;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const REFRESH_SECRET_LEN: usize = 32;
const RECORD_VERSION: &str = "v1";

fn refresh_key(user_id: &UserId) -> String {
    format!("auth:refresh:{}", user_id)
}

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User ID
    pub sub: String,
    /// Role code at issuance
    pub role: String,
    /// Issuer
    pub iss: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiry (Unix seconds)
    pub exp: i64,
    /// Token ID
    pub jti: String,
}

impl AccessClaims {
    pub fn user_id(&self) -> AuthResult<UserId> {
        UserId::from_str(&self.sub).map_err(|_| AuthError::InvalidAccessToken)
    }
}

/// Freshly issued token pair
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub access_expires_in: u64,
}

/// Session class, chosen at login and preserved across rotations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionClass {
    Short,
    Long,
}

impl SessionClass {
    fn code(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "short" => Some(Self::Short),
            "long" => Some(Self::Long),
            _ => None,
        }
    }
}

/// Issues, rotates and revokes bearer tokens
#[derive(Clone)]
pub struct TokenService<S> {
    store: Arc<S>,
    policy: TokenPolicy,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl<S: TtlStore> TokenService<S> {
    pub fn new(store: Arc<S>, policy: TokenPolicy) -> Self {
        let encoding_key = EncodingKey::from_secret(&policy.signing_secret);
        let decoding_key = DecodingKey::from_secret(&policy.signing_secret);
        Self {
            store,
            policy,
            encoding_key,
            decoding_key,
        }
    }

    /// Issue a fresh access/refresh pair, replacing any previous refresh
    /// token for the user
    pub async fn issue_pair(
        &self,
        user_id: &UserId,
        role: Role,
        remember: bool,
    ) -> AuthResult<TokenPair> {
        let class = if remember {
            SessionClass::Long
        } else {
            SessionClass::Short
        };
        self.issue_with_class(user_id, role, class).await
    }

    async fn issue_with_class(
        &self,
        user_id: &UserId,
        role: Role,
        class: SessionClass,
    ) -> AuthResult<TokenPair> {
        let access_token = self.mint_access(user_id, role)?;
        let refresh_token = mint_refresh(user_id);

        self.store
            .set_with_ttl(
                &refresh_key(user_id),
                &record_for(&refresh_token, class),
                self.refresh_ttl(class),
            )
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_in: self.policy.access_ttl.as_secs(),
        })
    }

    fn mint_access(&self, user_id: &UserId, role: Role) -> AuthResult<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            role: role.code().to_string(),
            iss: self.policy.issuer.clone(),
            iat: now,
            exp: now + self.policy.access_ttl.as_secs() as i64,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign access token: {}", e)))
    }

    fn refresh_ttl(&self, class: SessionClass) -> Duration {
        match class {
            SessionClass::Short => self.policy.refresh_ttl,
            SessionClass::Long => self.policy.refresh_ttl_remember,
        }
    }

    /// Extract the user ID from a refresh token without touching the store
    pub fn parse_refresh(&self, token: &str) -> AuthResult<UserId> {
        let (id_part, secret_part) = token
            .split_once('.')
            .ok_or(AuthError::RefreshTokenInvalid)?;
        let user_id = UserId::from_str(id_part).map_err(|_| AuthError::RefreshTokenInvalid)?;
        match platform::crypto::from_base64url(secret_part) {
            Ok(bytes) if bytes.len() == REFRESH_SECRET_LEN => Ok(user_id),
            _ => Err(AuthError::RefreshTokenInvalid),
        }
    }

    /// Rotate a refresh token, returning a fresh pair.
    ///
    /// The presented token must match the stored digest and the swap must
    /// win; otherwise the chain is revoked and the call fails with
    /// [`AuthError::ReplayDetected`]. An absent record (expired, logged out,
    /// or already revoked) is [`AuthError::RefreshTokenInvalid`].
    pub async fn rotate(&self, token: &str, role: Role) -> AuthResult<TokenPair> {
        let user_id = self.parse_refresh(token)?;
        let key = refresh_key(&user_id);

        let Some(current) = self.store.get(&key).await? else {
            return Err(AuthError::RefreshTokenInvalid);
        };
        let (stored_digest, class) = parse_record(&current)
            .ok_or_else(|| AuthError::Internal(format!("Corrupt refresh record for {}", user_id)))?;

        if sha256_hex(token.as_bytes()) != stored_digest {
            // A superseded token came back: assume the chain is compromised
            self.store.delete(&key).await?;
            return Err(AuthError::ReplayDetected);
        }

        let access_token = self.mint_access(&user_id, role)?;
        let refresh_token = mint_refresh(&user_id);
        let swapped = self
            .store
            .compare_and_swap(
                &key,
                &current,
                &record_for(&refresh_token, class),
                self.refresh_ttl(class),
            )
            .await?;

        if !swapped {
            // Lost a concurrent rotation on the same token: same replay
            // treatment, neither caller keeps a session
            self.store.delete(&key).await?;
            return Err(AuthError::ReplayDetected);
        }

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_in: self.policy.access_ttl.as_secs(),
        })
    }

    /// Drop the user's refresh token; access tokens ride out their short TTL
    pub async fn revoke(&self, user_id: &UserId) -> AuthResult<()> {
        self.store.delete(&refresh_key(user_id)).await?;
        Ok(())
    }

    /// Verify an access token signature and expiry, returning its claims
    pub fn verify_access(&self, token: &str) -> AuthResult<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.policy.issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        let data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| AuthError::InvalidAccessToken)?;
        Ok(data.claims)
    }
}

fn mint_refresh(user_id: &UserId) -> String {
    let secret = random_bytes(REFRESH_SECRET_LEN);
    format!("{}.{}", user_id, to_base64url(&secret))
}

fn record_for(token: &str, class: SessionClass) -> String {
    format!(
        "{}:{}:{}",
        RECORD_VERSION,
        sha256_hex(token.as_bytes()),
        class.code()
    )
}

fn parse_record(value: &str) -> Option<(String, SessionClass)> {
    let mut parts = value.splitn(3, ':');
    if parts.next()? != RECORD_VERSION {
        return None;
    }
    let digest = parts.next()?.to_string();
    let class = SessionClass::from_code(parts.next()?)?;
    Some((digest, class))
}
