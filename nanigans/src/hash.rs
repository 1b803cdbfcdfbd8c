use std::fmt::Write;

use sha2::{Digest, Sha256};

/// Hash an identity field for the destination's hashed-match keys.
///
/// The digest is a pinned wire contract: the destination stores identities
/// keyed by exactly this algorithm, so it must stay SHA-256 lowercase hex
/// with no salt and no input normalization.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    digest
        .iter()
        .fold(String::with_capacity(64), |mut out, byte| {
            let _ = write!(out, "{:02x}", byte);
            out
        })
}
