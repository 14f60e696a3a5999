//! Growable LSB-first bit sequence.

use super::{read_bits_at, BitReader};

/// An append-only sequence of bits.
///
/// Serves both as the result of `ValueContainer::get_compressed` (one value's
/// code) and as the backing store of a whole per-order section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitList {
    bytes: Vec<u8>,
    len: u64,
}

impl BitList {
    /// Creates an empty bit list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty bit list with room for `bits` bits.
    #[must_use]
    pub fn with_capacity(bits: u64) -> Self {
        Self {
            bytes: Vec::with_capacity(bits.div_ceil(8) as usize),
            len: 0,
        }
    }

    /// Rebuilds a bit list from bytes written by [`BitList::into_bytes`].
    ///
    /// # Panics
    ///
    /// Panics if `len` needs more bits than `bytes` holds.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>, len: u64) -> Self {
        assert!(
            len <= bytes.len() as u64 * 8,
            "BitList::from_bytes: {len} bits do not fit in {} bytes",
            bytes.len()
        );
        Self { bytes, len }
    }

    /// Number of bits written.
    #[inline]
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if no bits were written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Backing bytes; the last byte is zero-padded.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the list, returning its byte-aligned backing storage.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Size of the backing storage in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Removes all bits.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.len = 0;
    }

    /// Releases unused capacity.
    pub fn shrink_to_fit(&mut self) {
        self.bytes.shrink_to_fit();
    }

    /// Returns a reader positioned at the first bit.
    #[must_use]
    pub fn reader(&self) -> BitReader<'_> {
        BitReader::new(&self.bytes, self.len)
    }

    /// Appends the low `width` bits of `value`.
    ///
    /// # Panics
    ///
    /// Panics if `width > 64`.
    pub fn write_bits(&mut self, value: u64, width: u32) {
        assert!(width <= 64, "write_bits: width {width} exceeds 64");
        debug_assert!(
            width == 64 || value >> width == 0,
            "value {value} does not fit in {width} bits"
        );

        let mut value = value;
        let mut remaining = width;

        while remaining > 0 {
            let bit_offset = (self.len % 8) as u32;
            if bit_offset == 0 {
                self.bytes.push(0);
            }
            let take = (8 - bit_offset).min(remaining);
            let mask = (1u64 << take) - 1;
            let last = self.bytes.len() - 1;
            self.bytes[last] |= ((value & mask) as u8) << bit_offset;

            value >>= take;
            remaining -= take;
            self.len += u64::from(take);
        }
    }

    /// Appends a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.write_bits(u64::from(bit), 1);
    }

    /// Appends `zeros` zero bits followed by a one.
    fn write_unary(&mut self, zeros: u32) {
        let mut left = zeros;
        while left >= 64 {
            self.write_bits(0, 64);
            left -= 64;
        }
        self.write_bits(0, left);
        self.write_bit(true);
    }

    /// Appends the Elias-gamma code of `value`.
    ///
    /// Costs `2 * floor(log2(value)) + 1` bits.
    ///
    /// # Panics
    ///
    /// Panics if `value == 0`; gamma codes start at one.
    pub fn write_gamma(&mut self, value: u64) {
        assert!(value > 0, "Elias-gamma is undefined for 0");
        let n = 63 - value.leading_zeros();
        self.write_unary(n);
        self.write_bits(value & low_mask(n), n);
    }

    /// Appends the Elias-delta code of `value`.
    ///
    /// Shorter than gamma for large values: the length prefix itself is
    /// gamma-coded.
    ///
    /// # Panics
    ///
    /// Panics if `value == 0`.
    pub fn write_delta(&mut self, value: u64) {
        assert!(value > 0, "Elias-delta is undefined for 0");
        let n = 63 - value.leading_zeros();
        self.write_gamma(u64::from(n) + 1);
        self.write_bits(value & low_mask(n), n);
    }

    /// Appends the raw IEEE-754 bit pattern of `value`.
    #[inline]
    pub fn write_f32(&mut self, value: f32) {
        self.write_bits(u64::from(value.to_bits()), 32);
    }

    /// Appends every bit of `other`.
    pub fn append(&mut self, other: &BitList) {
        let mut pos = 0u64;
        while pos < other.len {
            let width = (other.len - pos).min(64) as u32;
            self.write_bits(read_bits_at(&other.bytes, pos, width), width);
            pos += u64::from(width);
        }
    }

    /// Reads `width` bits starting at bit `pos`.
    ///
    /// Used for fixed-width random access (quantized codes).
    ///
    /// # Panics
    ///
    /// Panics if the range extends past the written bits.
    #[inline]
    #[must_use]
    pub fn get_bits(&self, pos: u64, width: u32) -> u64 {
        assert!(
            pos + u64::from(width) <= self.len,
            "get_bits: range {pos}+{width} past end {}",
            self.len
        );
        read_bits_at(&self.bytes, pos, width)
    }

    /// Overwrites `width` already-written bits starting at `pos`.
    ///
    /// # Panics
    ///
    /// Panics if the range extends past the written bits.
    pub fn set_bits(&mut self, pos: u64, value: u64, width: u32) {
        assert!(
            pos + u64::from(width) <= self.len,
            "set_bits: range {pos}+{width} past end {}",
            self.len
        );
        let mut value = value;
        let mut pos = pos;
        let mut remaining = width;

        while remaining > 0 {
            let bit_offset = (pos % 8) as u32;
            let take = (8 - bit_offset).min(remaining);
            let mask = (((1u16 << take) - 1) as u8) << bit_offset;
            let byte = &mut self.bytes[(pos / 8) as usize];
            let chunk = ((value & ((1u64 << take) - 1)) as u8) << bit_offset;
            *byte = (*byte & !mask) | (chunk & mask);

            value >>= take;
            remaining -= take;
            pos += u64::from(take);
        }
    }
}

#[inline]
fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}
