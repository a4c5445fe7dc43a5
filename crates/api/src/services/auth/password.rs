//! Argon2id password hashing.

use std::sync::OnceLock;

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};

use super::AuthError;

/// One-way, self-salted password hashing.
///
/// Digests are PHC strings (`$argon2id$v=19$...`) carrying their own salt and
/// parameters, so verification needs nothing but the stored string.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Digest of a throwaway password, made on first use.
    pub(super) dummy_digest: OnceLock<String>,
}

impl PasswordHasher {
    /// Create a hasher with the default Argon2id parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if Argon2 rejects the input.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::PasswordHash)
    }

    /// Check a plaintext password against a stored digest.
    ///
    /// A malformed digest never matches.
    #[must_use]
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            tracing::warn!("stored password digest is not a valid PHC string");
            return false;
        };

        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Do the work of [`Self::verify`] when there is no stored digest, so an
    /// unknown account costs as much as a wrong password.
    pub fn verify_dummy(&self, plaintext: &str) {
        let digest = self
            .dummy_digest
            .get_or_init(|| self.hash("conduit-unknown-account").unwrap_or_default());
        let _ = self.verify(plaintext, digest);
    }
}
