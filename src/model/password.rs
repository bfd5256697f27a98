//! Password hashing shared by citizen accounts and administrators.

use argon2::Config;
use rand::Rng;

use crate::error::{Error, Result};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a plaintext password with a fresh random salt.
///
/// Fails with a validation error if the password is shorter than
/// [`MIN_PASSWORD_LENGTH`] characters.
pub fn hash(password: &str) -> Result<String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }

    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    Ok(argon2::hash_encoded(
        password.as_bytes(),
        &salt,
        &Config::default(),
    )?)
}

/// Check a plaintext password against a stored hash. A malformed hash never
/// verifies.
pub fn verify(hash: &str, password: &str) -> bool {
    argon2::verify_encoded(hash, password.as_bytes()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hashed = hash("nouka-baich").unwrap();
        assert!(hashed.starts_with("$argon2"));
        assert!(verify(&hashed, "nouka-baich"));
        assert!(!verify(&hashed, "nouka-baic"));
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash("nouka-baich").unwrap(), hash("nouka-baich").unwrap());
    }

    #[test]
    fn too_short() {
        assert!(matches!(hash("short"), Err(Error::Validation(_))));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify("not a hash", "anything"));
    }
}
