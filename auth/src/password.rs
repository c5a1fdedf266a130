//! Argon2id password hashes in PHC string format.
//!
//! Used by credential stores that keep their own password records.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Argon2;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Hash `password` with a random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Check `password` against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch; errors only when `stored_hash` cannot be parsed.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("pass:word").expect("Failed to hash password");

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("pass:word", &hash).unwrap());
        assert!(!verify_password("pass", &hash).unwrap());
    }

    #[test]
    fn test_verify_malformed_hash() {
        let result = verify_password("password", "plaintext");
        assert!(matches!(result, Err(PasswordError::MalformedHash(_))));
    }
}
