//! Stable finding fingerprints.
//!
//! A fingerprint is derived from the finding id plus the normalized fields
//! that identify the underlying defect. Run timestamps, worker counts and
//! emission order never feed into it, so the same defect hashes identically
//! across runs and `diff` can match findings by fingerprint alone.

use sha2::{Digest, Sha256};

use crate::findings::catalog::FindingId;

const SEPARATOR: u8 = 0x1f;

/// Hash `id` and `parts` into a `sha256:<hex>` fingerprint.
///
/// Parts are joined with an ASCII unit separator so `("a|b", "c")` and
/// `("a", "b|c")` cannot collide.
pub fn fingerprint<S: AsRef<str>>(id: FindingId, parts: &[S]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_str().as_bytes());
    for part in parts {
        hasher.update([SEPARATOR]);
        hasher.update(part.as_ref().as_bytes());
    }
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
