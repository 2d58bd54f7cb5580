//! Password hashing using bcrypt

use bcrypt::{hash, verify, DEFAULT_COST};

/// Hash a password for storage
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

/// Verify a password against its stored hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, password_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hashed = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hashed).unwrap());
        assert!(!verify_password("wrong password", &hashed).unwrap());
    }
}
