//! Password hashing via bcrypt

use crate::error::{Error, Result};

/// bcrypt cost factor used unless configured otherwise.
pub const BCRYPT_COST: u32 = 10;

const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// One-way password hashing.
///
/// Implementations are CPU-bound; async callers should run them on a
/// blocking thread.
pub trait PasswordHasher: Send + Sync {
    /// Hash `plaintext` with a fresh random salt.
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// Constant-time check of `plaintext` against `digest`.
    /// A digest that cannot be parsed never matches.
    fn verify(&self, digest: &str, plaintext: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Result<Self> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(Error::Hash(format!(
                "bcrypt cost must be between {} and {}, got {cost}",
                MIN_COST, MAX_COST
            )));
        }
        Ok(Self { cost })
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self { cost: BCRYPT_COST }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| Error::Hash(format!("bcrypt hash: {e}")))
    }

    fn verify(&self, digest: &str, plaintext: &str) -> bool {
        match bcrypt::verify(plaintext, digest) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::warn!(error = %e, "stored password digest could not be parsed");
                false
            }
        }
    }
}

/// Cheap structural check for a bcrypt modular-crypt digest.
pub fn looks_like_bcrypt(digest: &str) -> bool {
    digest.len() == 60
        && ["$2a$", "$2b$", "$2x$", "$2y$"]
            .iter()
            .any(|prefix| digest.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> BcryptHasher {
        BcryptHasher::new(MIN_COST).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let hasher = fast();
        let digest = hasher.hash("pw1").unwrap();
        assert!(looks_like_bcrypt(&digest), "got {digest}");
        assert!(hasher.verify(&digest, "pw1"));
        assert!(!hasher.verify(&digest, "pw2"));
    }

    #[test]
    fn salts_are_random() {
        let hasher = fast();
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify(&a, "same"));
        assert!(hasher.verify(&b, "same"));
    }

    #[test]
    fn digest_embeds_cost() {
        let digest = BcryptHasher::new(5).unwrap().hash("pw").unwrap();
        assert!(digest.starts_with("$2b$05$"), "got {digest}");
    }

    #[test]
    fn verifies_go_style_2a_digests() {
        // "password123" at cost 10, $2a$ prefix as produced by other bcrypt implementations
        let digest = "$2a$10$P9iTmndOegEkd9OZ0DZxNOvWzemcb/bGGguvbWVBqGyCyX36vm77q";
        assert!(looks_like_bcrypt(digest));
        let hasher = fast();
        assert!(hasher.verify(digest, "password123"));
        assert!(!hasher.verify(digest, "not-the-password"));
    }

    #[test]
    fn malformed_digest_never_matches() {
        let hasher = fast();
        assert!(!hasher.verify("not-a-bcrypt-digest", "anything"));
        assert!(!hasher.verify("", ""));
    }

    #[test]
    fn cost_out_of_range_is_rejected() {
        assert!(BcryptHasher::new(3).is_err());
        assert!(BcryptHasher::new(32).is_err());
        let digest = BcryptHasher::default().hash("pw").unwrap();
        assert!(digest.starts_with(&format!("$2b${BCRYPT_COST}$")), "got {digest}");
    }

    #[test]
    fn looks_like_bcrypt_rejects_other_formats() {
        assert!(!looks_like_bcrypt("plaintext"));
        assert!(!looks_like_bcrypt(&format!("$argon2id${}", "x".repeat(51))));
    }
}
