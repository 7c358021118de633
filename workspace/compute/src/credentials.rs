//! Argon2 password hashing for account credentials.

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use std::sync::OnceLock;
use tracing::{error, warn};

use crate::error::{ComputeError, Result};

/// Hashes a plain password into a PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {}", e);
            ComputeError::Credential(e.to_string())
        })
}

/// Checks a plain password against a stored PHC string.
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Runs a full verification against a throwaway hash so that logins for
/// unknown usernames take as long as logins with a wrong password.
/// Always returns `false`.
pub fn verify_dummy_password(password: &str) -> bool {
    let dummy = DUMMY_HASH.get_or_init(|| hash_password("registrar-dummy-password").ok());
    if let Some(hash) = dummy {
        verify_password(password, hash);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn test_dummy_verification_never_succeeds() {
        assert!(!verify_dummy_password("registrar-dummy-password"));
        assert!(!verify_dummy_password("anything"));
        assert!(DUMMY_HASH.get().is_some_and(|h| h.is_some()));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
