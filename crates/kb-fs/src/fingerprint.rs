//! SHA-256 content fingerprints
//!
//! A fingerprint is the lower-case hex SHA-256 digest of a document's UTF-8
//! bytes. It is the only change-detection signal used by the sync engine and
//! is compared for equality, never decoded.

use sha2::{Digest, Sha256};

/// Compute the fingerprint of string content.
///
/// Always returns 64 hex characters.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
