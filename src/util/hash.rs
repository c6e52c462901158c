//! Content hashing for merged output.
//!
//! Uses SHA256 over the exact bytes written, so two hashes are equal exactly
//! when the files would be byte-identical.

use sha2::{Digest, Sha256};

/// Compute the hex SHA256 of a byte slice.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
