use std::fmt::Write;

use anyhow::{Result, bail};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Account seeded into the unconfigured in-memory backend.
pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "password";
pub const DEMO_NAME: &str = "Demo User";

pub const MIN_PASSWORD_LEN: usize = 6;

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    to_hex(&hasher.finalize())
}

/// Hash a password as `salt$sha256(salt || password)`.
pub fn hash_password(password: &str) -> String {
    let salt: [u8; 16] = rand::rng().random();
    let salt = to_hex(&salt);
    let digest = digest(&salt, password);
    format!("{salt}${digest}")
}

/// Applied to every new account, whether created over HTTP or from the command line.
pub fn validate_password(password: &str) -> Result<()> {
    if password.trim().is_empty() {
        bail!("Password is required");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("Password must be at least {MIN_PASSWORD_LEN} characters");
    }
    Ok(())
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    let actual = digest(salt, password);
    // Constant-time over equal-length digests.
    actual.len() == expected.len()
        && actual
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let stored = hash_password("hunter22");
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn test_password_minimum_length() {
        assert!(validate_password("abc").is_err());
        assert!(validate_password("      ").is_err());
        assert!(validate_password("").is_err());
        assert!(validate_password("héllo!").is_ok());
        assert!(validate_password(DEMO_PASSWORD).is_ok());
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("password", "no-separator"));
        assert!(!verify_password("password", ""));
    }
}
