//! Header-only dimension probe for PNG and JPEG.

use crate::decode::{HashOutcome, ImageDecoder, ProbeOutcome};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SOI: &[u8] = &[0xFF, 0xD8];

/// SOFn markers that carry frame dimensions.
const JPEG_SOF_MARKERS: [u8; 13] = [
    0xC0, 0xC1, 0xC2, 0xC3, 0xC5, 0xC6, 0xC7, 0xC9, 0xCA, 0xCB, 0xCD, 0xCE, 0xCF,
];

/// Reads dimensions from file headers without decoding pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderProbe;

impl ImageDecoder for HeaderProbe {
    fn probe(&self, bytes: &[u8]) -> ProbeOutcome {
        if bytes.starts_with(PNG_SIGNATURE) {
            return match png_size(bytes) {
                Some((width, height)) => ProbeOutcome::Dimensions { width, height },
                None => ProbeOutcome::Failed("invalid png header".into()),
            };
        }
        if bytes.starts_with(JPEG_SOI) {
            return match jpeg_size(bytes) {
                Some((width, height)) => ProbeOutcome::Dimensions { width, height },
                None => ProbeOutcome::Failed("jpeg size parse failed".into()),
            };
        }
        ProbeOutcome::Unknown
    }

    fn perceptual_hash(&self, _bytes: &[u8]) -> HashOutcome {
        HashOutcome::Unavailable
    }

    fn perceptual_hashing(&self) -> bool {
        false
    }
}

/// Width and height from the IHDR chunk.
pub fn png_size(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 24 || &bytes[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
    Some((width, height))
}

/// Walk JPEG segments until the first SOFn frame header.
pub fn jpeg_size(bytes: &[u8]) -> Option<(u32, u32)> {
    let len = bytes.len();
    let mut idx = 2;

    while idx + 9 < len {
        if bytes[idx] != 0xFF {
            idx += 1;
            continue;
        }
        let marker = bytes[idx + 1];
        idx += 2;
        if marker == 0xD8 || marker == 0xD9 {
            continue;
        }

        let seg_len = u16::from_be_bytes([bytes[idx], bytes[idx + 1]]) as usize;
        if seg_len < 2 || idx + seg_len > len {
            return None;
        }
        if JPEG_SOF_MARKERS.contains(&marker) {
            if idx + 7 > len {
                return None;
            }
            let height = u16::from_be_bytes([bytes[idx + 3], bytes[idx + 4]]);
            let width = u16::from_be_bytes([bytes[idx + 5], bytes[idx + 6]]);
            return Some((u32::from(width), u32::from(height)));
        }
        idx += seg_len;
    }
    None
}
