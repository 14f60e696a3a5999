//! Bit-level codec used by the compressed value representations.
//!
//! Values are appended LSB-first into a [`BitList`] with no padding between
//! them, so a section holding N values is exactly the sum of their code
//! lengths, rounded up to a whole byte only at the end of the section.
//! A [`BitReader`] replays the section; the caller supplies N.
//!
//! # Code families
//!
//! | Family | Writer | Use |
//! |--------|--------|-----|
//! | Fixed-width binary | [`BitList::write_bits`] | codebook indices |
//! | Elias-gamma | [`BitList::write_gamma`] | small positive ranks |
//! | Elias-delta | [`BitList::write_delta`] | counts and other heavy-tailed integers |
//! | Raw float | [`BitList::write_f32`] | uncompressed probabilities |
//!
//! All families are lossless. Reading past the end of a section is reported
//! as [`crate::Error::Corrupted`].

mod list;
mod reader;

pub use list::BitList;
pub use reader::BitReader;

/// Number of bits needed to store values in `[0, count)` as fixed-width codes.
///
/// Returns 0 for `count <= 1`: a single-entry codebook needs no bits.
#[inline]
#[must_use]
pub fn width_for(count: usize) -> u32 {
    if count <= 1 {
        0
    } else {
        usize::BITS - (count - 1).leading_zeros()
    }
}

/// Reads `width` bits starting at bit `pos`, LSB-first.
///
/// The caller guarantees `pos + width` is within `bytes`.
#[inline]
pub(crate) fn read_bits_at(bytes: &[u8], pos: u64, width: u32) -> u64 {
    debug_assert!(width <= 64);
    let mut result = 0u64;
    let mut read = 0u32;
    let mut pos = pos;

    while read < width {
        let byte = bytes[(pos / 8) as usize];
        let bit_offset = (pos % 8) as u32;
        let take = (8 - bit_offset).min(width - read);
        let mask = ((1u16 << take) - 1) as u8;
        let bits = (byte >> bit_offset) & mask;

        result |= u64::from(bits) << read;
        read += take;
        pos += u64::from(take);
    }

    result
}
