//! Admin configuration.

use argon2::{Argon2, PasswordHash, PasswordVerifier};

/// Credentials guarding the admin endpoints.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// PHC-formatted argon2 hash of the admin secret.
    pub secret_hash: String,
}

impl AdminConfig {
    pub fn new(secret_hash: String) -> Self {
        Self { secret_hash }
    }

    /// `true` if `value` is already an argon2 PHC string rather than a
    /// plaintext secret.
    pub fn is_hashed(value: &str) -> bool {
        PasswordHash::new(value).is_ok_and(|hash| hash.algorithm.as_str().starts_with("argon2"))
    }

    /// Check a plaintext secret presented by a client.
    pub fn verify_secret(&self, plaintext: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.secret_hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
