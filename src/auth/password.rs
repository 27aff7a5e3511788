// Password hashing and validation service

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::debug;

use crate::auth::error::AuthError;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Password service for hashing and verification
///
/// Produces Argon2id PHC strings with a fresh 16-byte salt per call, so two
/// hashes of the same password never compare equal. Hashes can only be
/// checked through [`PasswordService::verify_password`].
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    /// Argon2id with the OWASP baseline parameters (19 MiB, 2 passes, 1 lane)
    pub fn new() -> Self {
        Self::with_params(Params::default())
    }

    /// Argon2id with caller-chosen cost parameters
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hash a password using Argon2id
    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswordHashError(e.to_string()))
    }

    /// Verify a password against a hash
    ///
    /// Cost parameters are read from the stored hash. A hash that cannot be
    /// parsed verifies as `false`; a corrupt record never turns into a 500.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Stored password hash could not be parsed: {}", e);
                return false;
            }
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Hash on the blocking pool so the async runtime keeps serving requests
    pub async fn hash_password_async(&self, password: String) -> Result<String, AuthError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash_password(&password))
            .await
            .map_err(|e| AuthError::PasswordHashError(e.to_string()))?
    }

    /// Verify on the blocking pool. A panicked or cancelled task counts as a mismatch.
    pub async fn verify_password_async(&self, password: String, hash: String) -> bool {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.verify_password(&password, &hash))
            .await
            .unwrap_or(false)
    }

    /// Validate password strength requirements
    pub fn validate_password_strength(password: &str) -> Result<(), AuthError> {
        let length = password.chars().count();
        if length < MIN_PASSWORD_LENGTH {
            return Err(AuthError::ValidationError(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }
        if length > MAX_PASSWORD_LENGTH {
            return Err(AuthError::ValidationError(format!(
                "Password must be at most {} characters long",
                MAX_PASSWORD_LENGTH
            )));
        }
        if password.trim().is_empty() {
            return Err(AuthError::ValidationError(
                "Password must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn fast_password_service() -> PasswordService {
    // Minimum-cost parameters keep hashing tests quick
    PasswordService::with_params(Params::new(1024, 1, 1, None).expect("valid argon2 params"))
}
