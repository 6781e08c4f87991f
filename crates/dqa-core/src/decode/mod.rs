//! Image decoding capability.
//!
//! Decoding is injected into the indexer through [`ImageDecoder`] so a build
//! without pixel decoding can still probe dimensions and report the
//! near-duplicate check as skipped. "Unavailable" is always a distinct
//! outcome from "failed".

pub mod phash;
pub mod probe;

pub use phash::{average_hash, hamming};
pub use probe::HeaderProbe;

#[cfg(feature = "phash")]
pub use phash::PixelDecoder;

/// Result of reading an image's dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Dimensions { width: u32, height: u32 },
    /// Format not recognised by this decoder; not a defect.
    Unknown,
    Failed(String),
}

/// Result of computing a perceptual hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashOutcome {
    Hashed(u64),
    /// This decoder cannot compute pixel hashes.
    Unavailable,
    Failed(String),
}

pub trait ImageDecoder: Send + Sync {
    fn probe(&self, bytes: &[u8]) -> ProbeOutcome;

    fn perceptual_hash(&self, bytes: &[u8]) -> HashOutcome;

    /// Whether [`ImageDecoder::perceptual_hash`] can ever return `Hashed`.
    fn perceptual_hashing(&self) -> bool;
}

/// Best decoder compiled into this build.
pub fn default_decoder() -> Box<dyn ImageDecoder> {
    #[cfg(feature = "phash")]
    {
        Box::new(PixelDecoder)
    }
    #[cfg(not(feature = "phash"))]
    {
        Box::new(HeaderProbe)
    }
}
