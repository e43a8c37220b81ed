//! djb2 string hash.
//!
//! Used for function entry/exit fingerprints and `djb2` checks. The state
//! is 32 bits wide and wraps, so results always fit in a `u32`.

const DJB2_SEED: u32 = 5381;

/// Hash a string with djb2 (`h = h * 33 + byte`).
#[must_use]
pub fn djb2(s: &str) -> u32 {
    s.bytes()
        .fold(DJB2_SEED, |h, b| h.wrapping_mul(33).wrapping_add(u32::from(b)))
}

/// djb2 widened to a 64-bit fingerprint.
#[must_use]
pub fn djb2_u64(s: &str) -> u64 {
    u64::from(djb2(s))
}
