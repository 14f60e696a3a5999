//! Sequential reader over a bit section.

use super::read_bits_at;
use crate::error::{Error, Result};

/// Longest unary run accepted before a stream is declared corrupt.
const MAX_UNARY: u32 = 64;

/// Cursor over an LSB-first bit sequence.
///
/// Every read checks the remaining length, so a writer/reader disagreement
/// surfaces as [`Error::Corrupted`] at the first overrun instead of
/// desynchronizing later values.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    len: u64,
    pos: u64,
}

impl<'a> BitReader<'a> {
    /// Creates a reader over the first `len` bits of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the bits available in `bytes`.
    #[must_use]
    pub fn new(bytes: &'a [u8], len: u64) -> Self {
        assert!(
            len <= bytes.len() as u64 * 8,
            "BitReader::new: {len} bits do not fit in {} bytes",
            bytes.len()
        );
        Self { bytes, len, pos: 0 }
    }

    /// Creates a reader over all bits of `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::new(bytes, bytes.len() as u64 * 8)
    }

    /// Current bit position.
    #[inline]
    #[must_use]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Bits left before the end of the section.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.len - self.pos
    }

    /// Returns true once every bit has been consumed.
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.pos == self.len
    }

    /// Moves the cursor to an absolute bit position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] if `pos` is past the end.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.len {
            return Err(Error::Corrupted(format!(
                "seek to bit {pos} past end of {}-bit section",
                self.len
            )));
        }
        self.pos = pos;
        Ok(())
    }

    fn ensure(&self, width: u64) -> Result<()> {
        if width > self.remaining() {
            return Err(Error::Corrupted(format!(
                "read of {width} bits at position {} overruns {}-bit section",
                self.pos, self.len
            )));
        }
        Ok(())
    }

    /// Reads a fixed-width value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] on overrun.
    ///
    /// # Panics
    ///
    /// Panics if `width > 64`.
    #[inline]
    pub fn read_bits(&mut self, width: u32) -> Result<u64> {
        assert!(width <= 64, "read_bits: width {width} exceeds 64");
        self.ensure(u64::from(width))?;
        let value = read_bits_at(self.bytes, self.pos, width);
        self.pos += u64::from(width);
        Ok(value)
    }

    /// Reads one bit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] on overrun.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Advances past `width` bits without decoding them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] on overrun.
    #[inline]
    pub fn skip(&mut self, width: u64) -> Result<()> {
        self.ensure(width)?;
        self.pos += width;
        Ok(())
    }

    fn read_unary(&mut self) -> Result<u32> {
        let mut zeros = 0u32;
        while !self.read_bit()? {
            zeros += 1;
            if zeros >= MAX_UNARY {
                return Err(Error::Corrupted(format!(
                    "unary run of {zeros} zeros at bit {}",
                    self.pos
                )));
            }
        }
        Ok(zeros)
    }

    /// Reads an Elias-gamma code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] on overrun or an impossible length prefix.
    pub fn read_gamma(&mut self) -> Result<u64> {
        let n = self.read_unary()?;
        let low = self.read_bits(n)?;
        Ok((1u64 << n) | low)
    }

    /// Reads an Elias-delta code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] on overrun or an impossible length prefix.
    pub fn read_delta(&mut self) -> Result<u64> {
        let n_plus_one = self.read_gamma()?;
        if n_plus_one > 64 {
            return Err(Error::Corrupted(format!(
                "delta length prefix {n_plus_one} exceeds 64"
            )));
        }
        let n = (n_plus_one - 1) as u32;
        let low = self.read_bits(n)?;
        Ok((1u64 << n) | low)
    }

    /// Reads a raw IEEE-754 `f32`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] on overrun.
    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_bits(32)? as u32))
    }
}
