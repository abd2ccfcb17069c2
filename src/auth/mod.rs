use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Shared-secret gate for the admin listing.
pub struct AdminGate {
    key_digest: Option<[u8; 32]>,
}

impl AdminGate {
    pub fn new(admin_key: Option<&str>) -> Self {
        Self {
            key_digest: admin_key.filter(|k| !k.is_empty()).map(digest),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.key_digest.is_some()
    }

    /// Exact match against the configured key.
    ///
    /// Both sides are hashed first so the comparison runs in constant time
    /// regardless of how long the guess is. With no key configured every
    /// guess is refused.
    pub fn validate_key(&self, candidate: Option<&str>) -> bool {
        let (Some(expected), Some(candidate)) = (self.key_digest.as_ref(), candidate) else {
            return false;
        };

        expected.ct_eq(&digest(candidate)).into()
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}
