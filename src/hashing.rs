//! Centralized module for cryptographic hashing algorithms.

use sha2::{Digest, Sha256};

/// Computes the MD5 digest of the given data and returns it as a hex string.
///
/// MD5 is carried for report compatibility with existing tooling, not for
/// integrity guarantees.
pub fn md5_digest(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Computes the SHA-256 digest of the given data and returns it as a hex string.
pub fn sha256_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
