//! TOTP Secret Value Object
//!
//! Wraps the base32 shared secret for two-factor authentication.
//! Google Authenticator compatible (SHA-1, 6 digits, 30s step by default);
//! digits, step and drift tolerance come from [`TotpParams`].
//!
//! Verification resolves *which* time step matched so the caller can claim
//! that step in the shared store and reject replays of a consumed code.

use kernel::error::app_error::{AppError, AppResult};
use platform::crypto::constant_time_eq;
use serde::{Deserialize, Serialize};
use totp_rs::{Algorithm, Secret, TOTP};

/// TOTP verification parameters
///
/// `skew` is the tolerance window in steps on each side of "now": with the
/// common `skew = 1` a code is accepted for roughly ±30 seconds of drift.
#[derive(Debug, Clone)]
pub struct TotpParams {
    /// Issuer shown in authenticator apps
    pub issuer: String,
    /// Code length
    pub digits: usize,
    /// Step duration in seconds
    pub step_secs: u64,
    /// Accepted drift in steps on each side
    pub skew: u8,
}

impl Default for TotpParams {
    fn default() -> Self {
        Self {
            issuer: "lumilearn".to_string(),
            digits: 6,
            step_secs: 30,
            skew: 1,
        }
    }
}

impl TotpParams {
    /// Width of the acceptance window in seconds; a consumed-step claim must
    /// outlive this so a code cannot be replayed anywhere in the window
    pub fn window_secs(&self) -> u64 {
        self.step_secs * (2 * self.skew as u64 + 1)
    }
}

/// TOTP Secret for two-factor authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotpSecret {
    /// Base32-encoded secret
    secret_base32: String,
}

impl TotpSecret {
    /// Generate a new random TOTP secret
    pub fn generate() -> Self {
        let secret = Secret::generate_secret();
        Self {
            secret_base32: secret.to_encoded().to_string(),
        }
    }

    /// Create from a base32-encoded string (from the credential repository)
    pub fn from_base32(secret: impl Into<String>) -> AppResult<Self> {
        let secret_str = secret.into();
        // Validate by trying to decode
        Secret::Encoded(secret_str.clone())
            .to_bytes()
            .map_err(|e| AppError::internal(format!("Invalid TOTP secret: {}", e)))?;

        Ok(Self {
            secret_base32: secret_str,
        })
    }

    /// Get the base32-encoded secret for storage and manual entry
    pub fn as_base32(&self) -> &str {
        &self.secret_base32
    }

    fn to_totp(&self, params: &TotpParams, account_name: &str) -> AppResult<TOTP> {
        let secret = Secret::Encoded(self.secret_base32.clone());

        TOTP::new(
            Algorithm::SHA1,
            params.digits,
            params.skew,
            params.step_secs,
            secret
                .to_bytes()
                .map_err(|e| AppError::internal(format!("Invalid TOTP secret: {}", e)))?,
            Some(params.issuer.clone()),
            account_name.to_string(),
        )
        .map_err(|e| AppError::internal(format!("Failed to create TOTP: {}", e)))
    }

    /// Verify a code at the given Unix time.
    ///
    /// Returns the matched step index when the code is valid within the
    /// drift window, `None` otherwise. The step index identifies the code
    /// instance for single-use tracking.
    pub fn verify_at(
        &self,
        code: &str,
        params: &TotpParams,
        account_name: &str,
        now_unix: u64,
    ) -> AppResult<Option<u64>> {
        if code.len() != params.digits || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(None);
        }

        let totp = self.to_totp(params, account_name)?;
        let step = params.step_secs as i64;

        for offset in -(params.skew as i64)..=(params.skew as i64) {
            let t = now_unix as i64 + offset * step;
            if t < 0 {
                continue;
            }
            let expected = totp.generate(t as u64);
            if constant_time_eq(expected.as_bytes(), code.as_bytes()) {
                return Ok(Some(t as u64 / params.step_secs));
            }
        }

        Ok(None)
    }

    /// Generate the code for a given Unix time (for tests)
    #[cfg(test)]
    pub fn code_at(
        &self,
        params: &TotpParams,
        account_name: &str,
        now_unix: u64,
    ) -> AppResult<String> {
        let totp = self.to_totp(params, account_name)?;
        Ok(totp.generate(now_unix))
    }

    /// Generate QR code as base64-encoded PNG for enrollment
    pub fn generate_qr_code(&self, params: &TotpParams, account_name: &str) -> AppResult<String> {
        let totp = self.to_totp(params, account_name)?;
        totp.get_qr_base64()
            .map_err(|e| AppError::internal(format!("Failed to generate QR code: {}", e)))
    }

    /// Get the otpauth:// provisioning URI for manual entry
    pub fn provisioning_uri(&self, params: &TotpParams, account_name: &str) -> AppResult<String> {
        let totp = self.to_totp(params, account_name)?;
        Ok(totp.get_url())
    }
}
