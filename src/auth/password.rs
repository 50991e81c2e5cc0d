//! Password hashing and verification using Argon2id

use crate::error::AppError;
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2,
};

/// Shortest accepted password, in bytes
pub const MIN_PASSWORD_BYTES: usize = 8;
/// Longest accepted password, in bytes
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Password hasher
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Create hasher with the crate's default Argon2id parameters
    /// (m=19MiB, t=2, p=1)
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Reject passwords outside the accepted byte window
    pub fn validate_password(password: &str) -> Result<(), AppError> {
        let len = password.len();

        if len < MIN_PASSWORD_BYTES {
            return Err(AppError::validation(format!(
                "Password must be at least {} bytes long",
                MIN_PASSWORD_BYTES
            )));
        }

        if len > MAX_PASSWORD_BYTES {
            return Err(AppError::validation(format!(
                "Password must be at most {} bytes long",
                MAX_PASSWORD_BYTES
            )));
        }

        Ok(())
    }

    /// Hash a password. The length window is checked first.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        Self::validate_password(password)?;

        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!("Failed to hash password: {:?}", e);
                AppError::internal_error(format!("Failed to hash password: {}", e))
            })?
            .to_string();

        Ok(password_hash)
    }

    /// Verify a password against a hash
    pub fn verify(&self, password: &str, hash: &str) -> Result<(), AppError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            tracing::error!("Failed to parse stored password hash: {:?}", e);
            AppError::internal_error(format!("Failed to parse password hash: {}", e))
        })?;

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AppError::Unauthorized)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}
