use std::path::Path;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// `(size, mtime)` half of the cache triple; the path is the third part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size_bytes: u64,
    /// Nanoseconds since the Unix epoch, `-1` when the platform has no mtime.
    pub mtime_ns: i64,
}

pub fn stat_file(path: &Path) -> Result<FileStat> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("failed to stat image: {}", path.display()))?;
    let mtime_ns = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(-1);

    Ok(FileStat {
        size_bytes: meta.len(),
        mtime_ns,
    })
}

/// Read an image's raw bytes.
///
/// Content identity depends only on these bytes; paths and timestamps never
/// enter the hash, so identical files hash identically wherever they live.
pub fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read image: {}", path.display()))
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
