//! ---
//! osscat_section: "06-security-access-control"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Credentials, bearer tokens, and role-based access control."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
//! One-way credential hashing with Argon2id.
//!
//! Each digest is a PHC string carrying its own random salt and cost
//! parameters, so two hashes of the same secret differ and verification does
//! not depend on the hasher's current parameters.

use std::fmt;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use osscat_common::config::PasswordHashConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while hashing or verifying credentials.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// Cost parameters rejected by the Argon2 implementation.
    #[error("invalid argon2 parameters: {0}")]
    InvalidParams(String),
    /// Hashing failed (entropy source or library failure).
    #[error("credential hashing failed: {0}")]
    HashingFailed(String),
    /// Stored digest is not a parseable PHC string.
    #[error("stored credential digest is malformed")]
    MalformedDigest,
}

/// Opaque stored digest of a secret. Never reversible.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wrap a digest loaded from storage.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// PHC string form, for persistence.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(<redacted>)")
    }
}

/// Argon2id hasher configured with explicit cost parameters.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        // 19 MiB, t=2, p=1; constant and always accepted by argon2.
        Self {
            params: Params::new(19_456, 2, 1, None).expect("default argon2 parameters are valid"),
        }
    }
}

impl CredentialHasher {
    /// Build a hasher with custom cost parameters.
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, CredentialError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|err| CredentialError::InvalidParams(err.to_string()))?;
        Ok(Self { params })
    }

    /// Build a hasher from the `[password_hash]` configuration section.
    pub fn from_config(config: &PasswordHashConfig) -> Result<Self, CredentialError> {
        Self::with_params(config.memory_kib, config.iterations, config.parallelism)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a secret with a fresh random salt.
    pub fn hash(&self, secret: &str) -> Result<PasswordDigest, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|err| CredentialError::HashingFailed(err.to_string()))?;
        Ok(PasswordDigest(digest.to_string()))
    }

    /// Check a candidate against a stored digest.
    ///
    /// The digest comparison inside argon2 is constant time. Parameters are
    /// taken from the digest itself, so digests created under older cost
    /// settings still verify.
    pub fn verify(
        &self,
        digest: &PasswordDigest,
        candidate: &str,
    ) -> Result<bool, CredentialError> {
        let parsed = PasswordHash::new(&digest.0).map_err(|_| CredentialError::MalformedDigest)?;
        match self.argon2().verify_password(candidate.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(_) => Err(CredentialError::MalformedDigest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> CredentialHasher {
        CredentialHasher::with_params(1024, 1, 1).unwrap()
    }

    #[test]
    fn same_secret_hashes_differently_and_verifies() {
        let hasher = fast();
        let first = hasher.hash("secret").unwrap();
        let second = hasher.hash("secret").unwrap();
        assert_ne!(first, second);
        assert!(hasher.verify(&first, "secret").unwrap());
        assert!(hasher.verify(&second, "secret").unwrap());
        assert!(!hasher.verify(&first, "wrong").unwrap());
        assert!(!hasher.verify(&second, "wrong").unwrap());
    }

    #[test]
    fn digest_is_argon2id_phc() {
        let digest = fast().hash("secret").unwrap();
        assert!(digest.as_str().starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
    }

    #[test]
    fn verifies_digest_made_with_other_params() {
        let digest = fast().hash("secret").unwrap();
        let stronger = CredentialHasher::with_params(2048, 2, 1).unwrap();
        assert!(stronger.verify(&digest, "secret").unwrap());
    }

    #[test]
    fn plaintext_is_not_a_digest() {
        let stored = PasswordDigest::from_stored("secret");
        assert_eq!(
            fast().verify(&stored, "secret"),
            Err(CredentialError::MalformedDigest)
        );
    }

    #[test]
    fn invalid_params_are_rejected() {
        assert!(matches!(
            CredentialHasher::with_params(1, 0, 0),
            Err(CredentialError::InvalidParams(_))
        ));
    }

    #[test]
    fn debug_never_prints_digest() {
        let digest = fast().hash("secret").unwrap();
        assert_eq!(format!("{digest:?}"), "PasswordDigest(<redacted>)");
    }
}
