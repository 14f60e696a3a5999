//! Direct-indexed `f32` storage.

use super::links::SuffixLinks;
use super::raw::RawProbBackoff;
use super::{check_offset, check_order, check_size, NgramEntry, ProbBackoffPair, ValueContainer};
use crate::bits::{BitList, BitReader};
use crate::error::{Error, Result};
use crate::map::NgramMap;
use crate::types::Offset;

/// Probabilities and backoffs kept as plain floats.
///
/// Random access is a single array index. A repeated `add` for an existing
/// n-gram overwrites the previous payload. The packed form is the raw 32-bit
/// pattern of each float (the backoff is omitted at the highest order), so
/// round-trips are bit-exact. Once an order is trimmed it is read-only.
#[derive(Debug, Clone)]
pub struct UncompressedProbBackoffValues {
    raw: RawProbBackoff,
    links: SuffixLinks,
    trimmed: Vec<bool>,
}

impl UncompressedProbBackoffValues {
    /// Creates an empty container for `num_orders` orders.
    ///
    /// `store_suffix_offsets` must be set for context-encoded lookups.
    #[must_use]
    pub fn new(num_orders: usize, store_suffix_offsets: bool) -> Self {
        Self {
            raw: RawProbBackoff::new(num_orders),
            links: SuffixLinks::new(num_orders, store_suffix_offsets),
            trimmed: vec![false; num_orders],
        }
    }

    fn check_writable(&self, order: usize) -> Result<()> {
        if self.trimmed[order] {
            return Err(Error::AlreadyFinalized(order));
        }
        Ok(())
    }

    /// Heap bytes held by the float arrays.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        (0..self.raw.num_orders())
            .map(|o| (self.raw.probs(o).len() + self.raw.backoffs(o).len()) * 4)
            .sum()
    }
}

impl ValueContainer for UncompressedProbBackoffValues {
    type Value = ProbBackoffPair;

    fn add(&mut self, entry: &NgramEntry<'_>, value: &ProbBackoffPair) -> Result<()> {
        check_order(entry.order, self.raw.num_orders())?;
        self.check_writable(entry.order)?;
        check_offset(entry.offset, entry.order, self.raw.size(entry.order))?;
        self.raw.set(entry.order, entry.offset, value);
        self.links
            .set(entry.order, entry.offset, entry.suffix_offset.get())
    }

    fn swap(&mut self, a: Offset, b: Offset, order: usize) -> Result<()> {
        check_order(order, self.raw.num_orders())?;
        let size = self.raw.size(order);
        check_offset(a, order, size)?;
        check_offset(b, order, size)?;
        self.raw.swap(order, a, b);
        self.links.swap(order, a, b);
        Ok(())
    }

    fn set_size_at_least(&mut self, size: u64, order: usize) -> Result<()> {
        check_order(order, self.raw.num_orders())?;
        self.check_writable(order)?;
        self.raw.ensure_size(order, size)?;
        self.links.ensure_size(order, size)
    }

    fn create_fresh_values(&self) -> Self {
        Self::new(self.raw.num_orders(), self.links.enabled())
    }

    fn get_from_offset(&self, offset: Offset, order: usize, out: &mut ProbBackoffPair) {
        *out = self.raw.get(order, offset);
    }

    fn set_from_other_values(&mut self, other: Self) {
        *self = other;
    }

    fn get_compressed(&self, offset: Offset, order: usize) -> Result<BitList> {
        check_order(order, self.raw.num_orders())?;
        check_offset(offset, order, self.raw.size(order))?;
        let value = self.raw.get(order, offset);
        let mut bits = BitList::with_capacity(64);
        bits.write_f32(value.prob);
        if self.raw.has_backoff(order) {
            bits.write_f32(value.backoff);
        }
        Ok(bits)
    }

    fn decompress(
        &self,
        bits: &mut BitReader<'_>,
        order: usize,
        just_consume: bool,
        out: &mut ProbBackoffPair,
    ) -> Result<()> {
        let width = if self.raw.has_backoff(order) { 64 } else { 32 };
        if just_consume {
            return bits.skip(width);
        }
        out.prob = bits.read_f32()?;
        out.backoff = if width == 64 { bits.read_f32()? } else { 0.0 };
        Ok(())
    }

    /// Raw floats are their own packed form; nothing is released.
    fn clear_storage_after_compression(&mut self, order: usize) -> Result<()> {
        check_order(order, self.raw.num_orders())
    }

    fn trim_after_ngram(&mut self, order: usize, size: u64) -> Result<()> {
        check_order(order, self.raw.num_orders())?;
        check_size(size, order, self.raw.size(order))?;
        self.raw.truncate(order, size);
        self.links.pack(order, size);
        self.trimmed[order] = true;
        Ok(())
    }

    fn trim(&mut self) {
        self.raw.shrink();
        self.links.shrink();
    }

    fn get_context_offset(&self, offset: Offset, order: usize) -> Offset {
        self.links.get(order, offset)
    }

    fn init_for_map(&mut self, map: &dyn NgramMap) {
        self.raw.resize_orders(map.max_order());
        self.links.resize_orders(map.max_order());
        self.trimmed.resize(map.max_order(), false);
    }

    fn num_orders(&self) -> usize {
        self.raw.num_orders()
    }

    fn size(&self, order: usize) -> u64 {
        self.raw.size(order)
    }
}

