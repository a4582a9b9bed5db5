//! Content digests for stored records.
//!
//! Every file and chunk record carries the sha256 of exactly the bytes stored
//! in that record. The digest authenticates the record against corruption; it
//! is not used for deduplication.

use sha2::{Digest, Sha256};

/// Lowercase hex sha256 of a byte buffer.
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Lowercase hex sha256 of several buffers hashed in order, equal to the
/// digest of their concatenation. Used to verify a chunked file without
/// materializing the reassembled content.
pub fn digest_parts<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}
