//! Password policy and argon2 hashing.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use stockroom_core::{DomainError, DomainResult};

const MIN_LEN: usize = 6;
const MAX_LEN: usize = 12;

/// Passwords are 6–12 characters with a lowercase letter, an uppercase
/// letter and a character that is neither a letter nor a digit.
pub fn check_password_policy(password: &str) -> DomainResult<()> {
    let len = password.chars().count();
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_special = password.chars().any(|c| !c.is_ascii_alphanumeric());

    if !(MIN_LEN..=MAX_LEN).contains(&len) || !has_lower || !has_upper || !has_special {
        return Err(DomainError::validation(
            "password must be 6-12 chars and include lower, upper and special char",
        ));
    }
    Ok(())
}

/// Hash a password into a PHC string.
pub fn hash_password(password: &str) -> DomainResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::invariant(format!("password hashing failed: {e}")))
}

/// Check a password against a stored PHC string. Malformed hashes never
/// verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_requires_every_character_class() {
        assert!(check_password_policy("Abc#12").is_ok());
        assert!(check_password_policy("abc#12").is_err());
        assert!(check_password_policy("ABC#12").is_err());
        assert!(check_password_policy("Abc123").is_err());
    }

    #[test]
    fn policy_bounds_length() {
        assert!(check_password_policy("Ab#1").is_err());
        assert!(check_password_policy("Abcdefghij#12").is_err());
        assert!(check_password_policy("Abcdefghi#12").is_ok());
    }

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("S3cret!").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("S3cret!", &hash));
        assert!(!verify_password("s3cret!", &hash));
        assert!(!verify_password("S3cret!", "not-a-hash"));
    }
}
