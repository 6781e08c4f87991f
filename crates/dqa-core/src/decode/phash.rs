//! 64-bit average hash.

/// Side of the grayscale grid the hash is computed over.
pub const HASH_GRID: u32 = 8;

/// Average hash of an 8x8 luma grid in row-major order.
///
/// Bit `63 - i` is set when pixel `i` is at or above the grid mean, so the
/// first pixel lands in the most significant bit.
pub fn average_hash(luma: &[u8; 64]) -> u64 {
    let sum: u32 = luma.iter().map(|&p| u32::from(p)).sum();
    let mean = f64::from(sum) / 64.0;
    luma.iter()
        .fold(0u64, |bits, &p| (bits << 1) | u64::from(f64::from(p) >= mean))
}

pub fn hamming(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

#[cfg(feature = "phash")]
pub use pixel::PixelDecoder;

#[cfg(feature = "phash")]
mod pixel {
    use image::imageops::FilterType;

    use super::{HASH_GRID, average_hash};
    use crate::decode::{HashOutcome, ImageDecoder, ProbeOutcome};

    /// Full pixel decoder backed by the `image` crate.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct PixelDecoder;

    impl ImageDecoder for PixelDecoder {
        fn probe(&self, bytes: &[u8]) -> ProbeOutcome {
            match image::load_from_memory(bytes) {
                Ok(img) => ProbeOutcome::Dimensions {
                    width: img.width(),
                    height: img.height(),
                },
                Err(e) => ProbeOutcome::Failed(e.to_string()),
            }
        }

        fn perceptual_hash(&self, bytes: &[u8]) -> HashOutcome {
            let img = match image::load_from_memory(bytes) {
                Ok(img) => img,
                Err(e) => return HashOutcome::Failed(e.to_string()),
            };
            let gray = img
                .resize_exact(HASH_GRID, HASH_GRID, FilterType::Triangle)
                .to_luma8();
            let mut grid = [0u8; 64];
            for (slot, px) in grid.iter_mut().zip(gray.pixels()) {
                *slot = px.0[0];
            }
            HashOutcome::Hashed(average_hash(&grid))
        }

        fn perceptual_hashing(&self) -> bool {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_grid_sets_every_bit() {
        assert_eq!(average_hash(&[7u8; 64]), u64::MAX);
    }

    #[test]
    fn first_pixel_is_most_significant_bit() {
        let mut grid = [0u8; 64];
        grid[0] = 255;
        assert_eq!(average_hash(&grid), 1u64 << 63);
    }

    #[test]
    fn half_bright_grid() {
        let mut grid = [10u8; 64];
        for px in grid.iter_mut().skip(32) {
            *px = 200;
        }
        assert_eq!(average_hash(&grid), 0x0000_0000_FFFF_FFFF);
    }

    #[test]
    fn hamming_counts_differing_bits() {
        assert_eq!(hamming(0, 0), 0);
        assert_eq!(hamming(0b1011, 0b0001), 2);
        assert_eq!(hamming(0, u64::MAX), 64);
    }
}
