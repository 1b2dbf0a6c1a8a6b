use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::config;

/// Hash a plain-text password with the configured bcrypt work factor.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, config::config().security.bcrypt_cost)
}

/// Check a candidate password against a stored bcrypt hash. Malformed
/// hashes count as a mismatch rather than an error.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Mint a password-reset token. The plain hex token goes to the user; only
/// its SHA-256 digest is stored, so a leaked database row cannot be replayed.
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let plain: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    let hashed = hash_reset_token(&plain);
    (plain, hashed)
}

/// Digest an incoming reset token for comparison against the stored value.
pub fn hash_reset_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
