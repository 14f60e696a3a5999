//! Raw n-gram counts.

use super::links::SuffixLinks;
use super::{check_offset, check_order, check_size, NgramEntry, ValueContainer};
use crate::bits::{BitList, BitReader};
use crate::error::{Error, Result};
use crate::map::NgramMap;
use crate::types::Offset;

/// Largest storable count; one below `u64::MAX` so that `count + 1` can be
/// Elias-delta coded.
pub const MAX_COUNT: u64 = u64::MAX - 1;

#[derive(Debug, Clone, Default)]
struct CountOrder {
    counts: Vec<u64>,
    size: u64,
    trimmed: bool,
}

/// Per-order `u64` counts.
///
/// A repeated `add` for an existing n-gram accumulates, saturating at
/// [`MAX_COUNT`]. The packed form is the Elias-delta code of `count + 1`,
/// which keeps the many small counts of a real corpus short.
#[derive(Debug, Clone)]
pub struct CountValues {
    orders: Vec<CountOrder>,
    links: SuffixLinks,
}

impl CountValues {
    /// Creates an empty container for `num_orders` orders.
    #[must_use]
    pub fn new(num_orders: usize, store_suffix_offsets: bool) -> Self {
        Self {
            orders: vec![CountOrder::default(); num_orders],
            links: SuffixLinks::new(num_orders, store_suffix_offsets),
        }
    }

    /// Sum of all counts at `order`, saturating.
    #[must_use]
    pub fn total(&self, order: usize) -> u64 {
        self.orders
            .get(order)
            .map_or(0, |o| o.counts.iter().fold(0u64, |acc, &c| acc.saturating_add(c)))
    }
}

impl ValueContainer for CountValues {
    type Value = u64;

    /// Accumulates on repeat.
    fn add(&mut self, entry: &NgramEntry<'_>, value: &u64) -> Result<()> {
        check_order(entry.order, self.orders.len())?;
        let slot = &mut self.orders[entry.order];
        if slot.trimmed {
            return Err(Error::AlreadyFinalized(entry.order));
        }
        check_offset(entry.offset, entry.order, slot.size)?;
        let count = &mut slot.counts[entry.offset.index()];
        *count = if entry.is_new {
            (*value).min(MAX_COUNT)
        } else {
            count.saturating_add(*value).min(MAX_COUNT)
        };
        self.links
            .set(entry.order, entry.offset, entry.suffix_offset.get())
    }

    fn swap(&mut self, a: Offset, b: Offset, order: usize) -> Result<()> {
        check_order(order, self.orders.len())?;
        let slot = &mut self.orders[order];
        check_offset(a, order, slot.size)?;
        check_offset(b, order, slot.size)?;
        slot.counts.swap(a.index(), b.index());
        self.links.swap(order, a, b);
        Ok(())
    }

    fn set_size_at_least(&mut self, size: u64, order: usize) -> Result<()> {
        check_order(order, self.orders.len())?;
        let slot = &mut self.orders[order];
        if slot.trimmed {
            return Err(Error::AlreadyFinalized(order));
        }
        if size > slot.size {
            let exhausted = || Error::ResourceExhausted {
                order,
                requested: size,
            };
            let slots = usize::try_from(size).map_err(|_| exhausted())?;
            slot.counts
                .try_reserve(slots - slot.counts.len())
                .map_err(|_| exhausted())?;
            slot.counts.resize(slots, 0);
            slot.size = size;
        }
        self.links.ensure_size(order, size)
    }

    fn create_fresh_values(&self) -> Self {
        Self::new(self.orders.len(), self.links.enabled())
    }

    fn get_from_offset(&self, offset: Offset, order: usize, out: &mut u64) {
        *out = self.orders[order].counts[offset.index()];
    }

    fn set_from_other_values(&mut self, other: Self) {
        *self = other;
    }

    fn get_compressed(&self, offset: Offset, order: usize) -> Result<BitList> {
        check_order(order, self.orders.len())?;
        check_offset(offset, order, self.orders[order].size)?;
        let mut bits = BitList::new();
        bits.write_delta(self.orders[order].counts[offset.index()] + 1);
        Ok(bits)
    }

    fn decompress(
        &self,
        bits: &mut BitReader<'_>,
        _order: usize,
        just_consume: bool,
        out: &mut u64,
    ) -> Result<()> {
        let code = bits.read_delta()?;
        if !just_consume {
            *out = code - 1;
        }
        Ok(())
    }

    fn clear_storage_after_compression(&mut self, order: usize) -> Result<()> {
        check_order(order, self.orders.len())
    }

    fn trim_after_ngram(&mut self, order: usize, size: u64) -> Result<()> {
        check_order(order, self.orders.len())?;
        let slot = &mut self.orders[order];
        check_size(size, order, slot.size)?;
        slot.counts.truncate(size as usize);
        slot.counts.shrink_to_fit();
        slot.size = size;
        slot.trimmed = true;
        self.links.pack(order, size);
        Ok(())
    }

    fn trim(&mut self) {
        for slot in &mut self.orders {
            slot.counts.shrink_to_fit();
        }
        self.links.shrink();
    }

    fn get_context_offset(&self, offset: Offset, order: usize) -> Offset {
        self.links.get(order, offset)
    }

    fn init_for_map(&mut self, map: &dyn NgramMap) {
        self.orders.resize_with(map.max_order(), CountOrder::default);
        self.links.resize_orders(map.max_order());
    }

    fn num_orders(&self) -> usize {
        self.orders.len()
    }

    fn size(&self, order: usize) -> u64 {
        self.orders.get(order).map_or(0, |o| o.size)
    }
}
