//! Invariant checks excluded from coverage reports.

#![cfg_attr(coverage_nightly, coverage(off))]

/// Integer types only come in the four machine widths.
#[inline]
pub(crate) fn ensure_int_width(bits: u8) -> u8 {
    if !matches!(bits, 8 | 16 | 32 | 64) {
        panic!("integer width must be 8, 16, 32 or 64 bits, got {bits}");
    }
    bits
}
