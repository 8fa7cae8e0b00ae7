//! Salted one-way password hashing backed by bcrypt.

use std::fmt;

use tracing::{debug, instrument, trace};

use crate::error::AccountError;

pub use bcrypt::DEFAULT_COST;

/// Lowest work factor bcrypt accepts.
pub const MIN_COST: u32 = 4;

/// bcrypt reads at most this many bytes of a password and ignores the rest.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hashes and verifies passwords with a fixed bcrypt work factor.
///
/// Every hash carries its own random salt, so hashing the same password twice
/// yields two different strings that both verify. Verification compares digests
/// in constant time and fails closed on malformed stored hashes.
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    /// Verified against when no stored hash exists, to keep timing uniform.
    dummy_hash: String,
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher").field("cost", &self.cost).finish()
    }
}

impl PasswordHasher {
    /// Build a hasher for `cost` (4..=31). Fails if bcrypt rejects the cost.
    pub fn new(cost: u32) -> Result<Self, AccountError> {
        let dummy_hash = bcrypt::hash("quillblog-timing-equaliser", cost)?;
        Ok(Self { cost, dummy_hash })
    }

    /// Fails for passwords longer than [`MAX_PASSWORD_BYTES`], which bcrypt
    /// would silently truncate.
    #[instrument(skip_all, fields(cost = self.cost))]
    pub fn hash(&self, plaintext: &str) -> Result<String, AccountError> {
        trace!("Hashing password");
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(AccountError::PasswordTooLong(plaintext.len()));
        }
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }

    /// True iff `plaintext` matches `stored`. Malformed hashes and passwords
    /// over [`MAX_PASSWORD_BYTES`] verify as false.
    #[instrument(skip_all)]
    pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            debug!("Password longer than {} bytes never verifies", MAX_PASSWORD_BYTES);
            return false;
        }
        match bcrypt::verify(plaintext, stored) {
            Ok(matches) => matches,
            Err(e) => {
                debug!("Stored password hash could not be parsed: {}", e);
                false
            }
        }
    }

    /// Burn one verification's worth of time. Used when the account is unknown.
    pub fn verify_dummy(&self, plaintext: &str) {
        let _ = self.verify(plaintext, &self.dummy_hash);
    }

    /// [`hash`](Self::hash) on the blocking pool.
    pub async fn hash_async(&self, plaintext: &str) -> Result<String, AccountError> {
        let hasher = self.clone();
        let plaintext = plaintext.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext)).await?
    }

    /// [`verify`](Self::verify) on the blocking pool; `None` stands for "no
    /// stored hash" and checks against the dummy hash instead.
    pub async fn verify_async(&self, plaintext: &str, stored: Option<&str>) -> Result<bool, AccountError> {
        let hasher = self.clone();
        let plaintext = plaintext.to_owned();
        let stored = stored.map(str::to_owned);
        let verified = tokio::task::spawn_blocking(move || match stored {
            Some(stored) => hasher.verify(&plaintext, &stored),
            None => {
                hasher.verify_dummy(&plaintext);
                false
            }
        })
        .await?;
        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(MIN_COST).unwrap()
    }

    #[test]
    fn hash_verifies_against_its_plaintext() {
        let hasher = hasher();
        for plaintext in ["password", "", "correct horse battery staple", "päss wörd"] {
            let hashed = hasher.hash(plaintext).unwrap();
            assert!(hasher.verify(plaintext, &hashed), "failed for {:?}", plaintext);
            assert_ne!(hashed, plaintext);
        }
    }

    #[test]
    fn different_plaintext_does_not_verify() {
        let hasher = hasher();
        let hashed = hasher.hash("first").unwrap();
        assert!(!hasher.verify("second", &hashed));
        assert!(!hasher.verify("First", &hashed));
        assert!(!hasher.verify("first ", &hashed));
    }

    #[test]
    fn same_plaintext_hashes_differently() {
        let hasher = hasher();
        let a = hasher.hash("password").unwrap();
        let b = hasher.hash("password").unwrap();

        assert_ne!(a, b);
        assert_eq!(a.len(), b.len());
        assert!(hasher.verify("password", &a));
        assert!(hasher.verify("password", &b));
    }

    #[test]
    fn malformed_hash_fails_closed() {
        let hasher = hasher();
        assert!(!hasher.verify("password", ""));
        assert!(!hasher.verify("password", "password"));
        assert!(!hasher.verify("password", "$2b$04$tooshort"));
    }

    #[test]
    fn long_passwords_sharing_a_prefix_do_not_verify() {
        let hasher = hasher();
        let prefix = "a".repeat(MAX_PASSWORD_BYTES);
        let hashed = hasher.hash(&prefix).unwrap();

        assert!(hasher.verify(&prefix, &hashed));
        assert!(!hasher.verify(&format!("{}x", prefix), &hashed));
        assert!(hasher.hash(&format!("{}y", prefix)).is_err());
    }

    #[test]
    fn rejects_invalid_cost() {
        assert!(PasswordHasher::new(2).is_err());
        assert!(PasswordHasher::new(40).is_err());
    }

    #[tokio::test]
    async fn blocking_pool_variants_agree() {
        let hasher = hasher();
        let hashed = hasher.hash_async("password").await.unwrap();
        assert!(hasher.verify_async("password", Some(&hashed)).await.unwrap());
        assert!(!hasher.verify_async("nope", Some(&hashed)).await.unwrap());
        assert!(!hasher.verify_async("password", None).await.unwrap());
    }

    #[test]
    fn debug_output_hides_hash_material() {
        let rendered = format!("{:?}", hasher());
        assert!(rendered.contains("cost"));
        assert!(!rendered.contains("$2"));
    }
}
