//! Content identity for definition files.
//!
//! A catalog entry's version is keyed by the SHA-256 digest of its raw
//! definition bytes: identical bytes always yield the same identity, which
//! is the basis for deduplicated version snapshots and cache-hit detection.

use sha2::{Digest, Sha256};

/// Length of the short version identifier (hex chars).
pub const SHORT_ID_LEN: usize = 12;

/// Stable identity of a definition's raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentId {
    /// Full 64-char SHA-256 hex digest.
    pub full_hash: String,
    /// First [`SHORT_ID_LEN`] chars of the digest; used as `version_id`.
    pub short_id: String,
}

/// Compute the content identity of a byte string. Total function: any input
/// (including empty) produces a valid identity.
pub fn identity(bytes: &[u8]) -> ContentId {
    let full_hash = format!("{:x}", Sha256::digest(bytes));
    let short_id = full_hash[..SHORT_ID_LEN].to_string();
    ContentId {
        full_hash,
        short_id,
    }
}
