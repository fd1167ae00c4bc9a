//! Password hashing.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordVerifier, Version};

use crate::error::{Result, TicketingError};

/// One-way password hashing used by the user repository.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password into a self-describing string.
    fn hash(&self, password: &str) -> Result<String>;

    /// Check a plaintext password against a stored hash. A hash that cannot
    /// be parsed never verifies.
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// Argon2id with a random salt per password.
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Minimum-cost parameters. Only for tests.
    pub fn insecure_fast() -> Result<Self> {
        let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
            .map_err(|e| TicketingError::Hashing(e.to_string()))?;
        Ok(Self::new(params))
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        use argon2::PasswordHasher as _;

        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| TicketingError::Hashing(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return Ok(false);
        };
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = Argon2Hasher::insecure_fast().unwrap();
        let hash = hasher.hash("secret1").unwrap();

        assert_ne!(hash, "secret1");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("secret1", &hash).unwrap());
        assert!(!hasher.verify("secret2", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let hasher = Argon2Hasher::insecure_fast().unwrap();
        assert_ne!(hasher.hash("secret1").unwrap(), hasher.hash("secret1").unwrap());
    }

    #[test]
    fn test_unparsable_hash_never_verifies() {
        let hasher = Argon2Hasher::insecure_fast().unwrap();
        assert!(!hasher.verify("secret1", "secret1").unwrap());
    }
}
