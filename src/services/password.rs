//! Password digest helpers.
//!
//! Passwords are stored as SHA-256 hex digests. Comparison happens on the
//! digests, so plaintext never travels past the accounts service.

use sha2::{Digest, Sha256};

/// Hash a plaintext password into its lowercase hex SHA-256 digest.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a plaintext password against a stored digest.
pub fn verify_password(password: &str, digest: &str) -> bool {
    hash_password(password) == digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_hex_sha256() {
        let digest = hash_password("hunter2");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        // Known vector.
        assert_eq!(
            hash_password(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_verify_round_trip() {
        let digest = hash_password("correct horse");
        assert!(verify_password("correct horse", &digest));
        assert!(!verify_password("wrong horse", &digest));
    }
}
