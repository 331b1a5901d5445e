//! Engine license challenge

use rand::Rng;

/// Constant mixed into every challenge answer
pub const CHALLENGE_KEY: u32 = 0x8594_8B9A;

/// Range of probes drawn during engine initialization
pub const PROBE_RANGE: std::ops::RangeInclusive<u32> = 1..=300;

/// License presented to the engine when its own module init fails
pub static LICENSE: [u8; 196] = [
    0x49, 0x43, 0x5F, 0x4C, 0x03, 0x00, 0x44, 0x00, 0x01, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x30, 0x30, 0x30, 0x30, 0x30, 0x30, 0x30, 0x30, 0x30,
    0x30, 0x30, 0x30, 0x30, 0x31, 0x37, 0x00, 0x00, 0x00, 0x00, 0x5A, 0x4B,
    0x53, 0x4F, 0x46, 0x54, 0x57, 0x41, 0x52, 0x45, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x50, 0xC3, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x47, 0x7F, 0xF7, 0x06,
    0x1E, 0xD3, 0x15, 0x6B, 0x87, 0x49, 0xDC, 0xB9, 0xFA, 0xDB, 0x6C, 0x41,
    0x72, 0xFF, 0x0C, 0xCE, 0xBE, 0x73, 0xEC, 0xA4, 0x23, 0xE2, 0xB5, 0x77,
    0x51, 0x70, 0xA6, 0x07, 0x21, 0xA4, 0xC2, 0x8E, 0x1D, 0xDD, 0xD2, 0x20,
    0xC5, 0xF2, 0x2D, 0x04, 0xCC, 0x0F, 0x01, 0x8E, 0x78, 0x40, 0xDC, 0x67,
    0xF9, 0x17, 0xDE, 0xED, 0xC3, 0x90, 0x14, 0x4D, 0x18, 0x0E, 0x2C, 0xBD,
    0x83, 0x75, 0x76, 0x44, 0xE8, 0xFB, 0xD3, 0xFC, 0x52, 0xC3, 0x5E, 0x3C,
    0x79, 0xDF, 0x33, 0x4E, 0x14, 0x14, 0xE2, 0x47, 0x8D, 0x35, 0xC4, 0x23,
    0x1F, 0xE9, 0x51, 0xA6, 0xE6, 0x0F, 0x48, 0xBB, 0x90, 0xE1, 0x52, 0x55,
    0x4B, 0xFC, 0x33, 0x51, 0x48, 0xC7, 0x36, 0xE0, 0xE6, 0x74, 0xB1, 0x79,
    0x4E, 0x67, 0x6B, 0x75, 0xE5, 0x7E, 0x57, 0x14, 0x9A, 0x87, 0xDB, 0x63,
    0x4C, 0xB9, 0x8B, 0x8F,
];

/// Expected answer for a probe
///
/// ```
/// use zkfp_core::license::challenge_response;
///
/// assert_eq!(challenge_response(0), 0x8594_8B9A);
/// assert_eq!(challenge_response(1), 100 ^ 0x8594_8B9A);
/// ```
pub fn challenge_response(probe: u32) -> u32 {
    probe.wrapping_mul(100) ^ CHALLENGE_KEY
}

/// Draw a fresh probe
pub fn random_probe<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(PROBE_RANGE)
}
