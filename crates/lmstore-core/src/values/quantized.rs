//! Codebook-quantized storage.
//!
//! # Algorithm
//!
//! When an order is trimmed, the distinct probabilities (and, separately, the
//! distinct backoffs) of that order are sorted and binned:
//! - start with one bin spanning every value
//! - repeatedly split the widest bin at its midpoint
//! - stop at `2^bits` bins or when every bin holds a single value
//!
//! Each bin is represented by the midpoint of its smallest and largest
//! member, so a value is reconstructed within half its bin's width. Codes are
//! stored back to back at a fixed width, which keeps random access O(1).

use super::links::SuffixLinks;
use super::raw::RawProbBackoff;
use super::{check_offset, check_order, check_size, NgramEntry, ProbBackoffPair, ValueContainer};
use crate::bits::{width_for, BitList, BitReader};
use crate::config::MAX_QUANTIZATION_BITS;
use crate::error::{Error, Result};
use crate::map::NgramMap;
use crate::types::Offset;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Sorted bins of representative values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Codebook {
    /// Largest training value of each bin, ascending.
    uppers: Vec<f32>,
    /// Reconstruction value of each bin.
    representatives: Vec<f32>,
    max_error: f32,
}

/// Ordering key for a bin width. Non-negative floats (including +inf) order
/// the same way as their bit patterns.
fn width_key(width: f32) -> u32 {
    if width.is_nan() {
        u32::MAX
    } else {
        width.to_bits()
    }
}

impl Codebook {
    /// Builds a codebook with at most `max_bins` bins from `values`.
    ///
    /// NaN values are not representable and are ignored.
    #[must_use]
    pub fn build(values: &[f32], max_bins: usize) -> Self {
        let mut sorted: Vec<f32> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(f32::total_cmp);
        sorted.dedup_by(|a, b| a.to_bits() == b.to_bits());
        if sorted.is_empty() || max_bins == 0 {
            return Self::default();
        }

        // Bins are inclusive index ranges into `sorted`.
        let span = |lo: usize, hi: usize| sorted[hi] - sorted[lo];
        let mut heap = BinaryHeap::new();
        heap.push((width_key(span(0, sorted.len() - 1)), Reverse(0usize), sorted.len() - 1));
        let mut finished: Vec<(usize, usize)> = Vec::new();

        while heap.len() + finished.len() < max_bins {
            let Some((_, Reverse(lo), hi)) = heap.pop() else {
                break;
            };
            if lo == hi {
                finished.push((lo, hi));
                continue;
            }
            let split = Self::split_point(&sorted, lo, hi);
            heap.push((width_key(span(lo, split - 1)), Reverse(lo), split - 1));
            heap.push((width_key(span(split, hi)), Reverse(split), hi));
        }

        let mut bins: Vec<(usize, usize)> = heap
            .into_iter()
            .map(|(_, Reverse(lo), hi)| (lo, hi))
            .chain(finished)
            .collect();
        bins.sort_unstable();

        let mut max_error = 0.0f32;
        let mut uppers = Vec::with_capacity(bins.len());
        let mut representatives = Vec::with_capacity(bins.len());
        for (lo, hi) in bins {
            let (min, max) = (sorted[lo], sorted[hi]);
            let rep = if lo == hi { min } else { min + (max - min) / 2.0 };
            max_error = max_error.max((rep - min).max(max - rep));
            uppers.push(max);
            representatives.push(rep);
        }

        Self {
            uppers,
            representatives,
            max_error,
        }
    }

    /// First index of the upper half when splitting `[lo, hi]` (`lo < hi`).
    fn split_point(sorted: &[f32], lo: usize, hi: usize) -> usize {
        let (min, max) = (sorted[lo], sorted[hi]);
        if min.is_infinite() {
            return lo + 1;
        }
        if max.is_infinite() {
            return hi;
        }
        let mid = min + (max - min) / 2.0;
        let split = lo + sorted[lo..=hi].partition_point(|&v| v <= mid);
        split.clamp(lo + 1, hi)
    }

    /// Number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.representatives.len()
    }

    /// Returns true if the codebook has no bins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.representatives.is_empty()
    }

    /// Bits per code.
    #[must_use]
    pub fn code_width(&self) -> u32 {
        width_for(self.len())
    }

    /// Largest reconstruction error over the training values.
    #[must_use]
    pub fn max_error(&self) -> f32 {
        self.max_error
    }

    /// Code of the bin containing `value` (the nearest bin for unseen values).
    #[must_use]
    pub fn encode(&self, value: f32) -> u32 {
        let idx = self.uppers.partition_point(|&u| u < value);
        idx.min(self.len().saturating_sub(1)) as u32
    }

    /// Representative value of `code`.
    #[must_use]
    pub fn decode(&self, code: u32) -> Option<f32> {
        self.representatives.get(code as usize).copied()
    }
}

#[derive(Debug, Clone)]
struct QuantizedOrder {
    probs: Codebook,
    /// `None` for the highest order.
    backoffs: Option<Codebook>,
    prob_width: u32,
    backoff_width: u32,
    codes: BitList,
}

impl QuantizedOrder {
    fn code_width(&self) -> u32 {
        self.prob_width + self.backoff_width
    }

    fn decode_pair(&self, prob_code: u64, backoff_code: u64) -> Result<ProbBackoffPair> {
        let prob = self.probs.decode(prob_code as u32).ok_or_else(|| {
            Error::Corrupted(format!("prob code {prob_code} outside codebook"))
        })?;
        let backoff = match &self.backoffs {
            Some(book) => book.decode(backoff_code as u32).ok_or_else(|| {
                Error::Corrupted(format!("backoff code {backoff_code} outside codebook"))
            })?,
            None => 0.0,
        };
        Ok(ProbBackoffPair { prob, backoff })
    }
}

/// Probabilities and backoffs stored as codebook indices.
///
/// Values are collected as floats while an order is built and quantized by
/// `trim_after_ngram`, which also releases the floats. A repeated `add` for an
/// existing n-gram overwrites the previous payload. Reconstruction error of
/// each field is at most [`Codebook::max_error`] of its order's codebook.
#[derive(Debug, Clone)]
pub struct QuantizedProbBackoffValues {
    raw: RawProbBackoff,
    quantized: Vec<Option<QuantizedOrder>>,
    links: SuffixLinks,
    bits: u8,
}

impl QuantizedProbBackoffValues {
    /// Creates an empty container whose codebooks hold at most `2^bits` bins.
    ///
    /// `bits` is clamped to `1..=MAX_QUANTIZATION_BITS`.
    #[must_use]
    pub fn new(num_orders: usize, store_suffix_offsets: bool, bits: u8) -> Self {
        Self {
            raw: RawProbBackoff::new(num_orders),
            quantized: vec![None; num_orders],
            links: SuffixLinks::new(num_orders, store_suffix_offsets),
            bits: bits.clamp(1, MAX_QUANTIZATION_BITS),
        }
    }

    /// Probability codebook of a finalized order.
    #[must_use]
    pub fn prob_codebook(&self, order: usize) -> Option<&Codebook> {
        self.quantized.get(order)?.as_ref().map(|q| &q.probs)
    }

    /// Backoff codebook of a finalized order below the highest.
    #[must_use]
    pub fn backoff_codebook(&self, order: usize) -> Option<&Codebook> {
        self.quantized.get(order)?.as_ref()?.backoffs.as_ref()
    }

    /// Worst-case reconstruction error of either field at `order`.
    #[must_use]
    pub fn max_error(&self, order: usize) -> Option<f32> {
        let q = self.quantized.get(order)?.as_ref()?;
        let backoff = q.backoffs.as_ref().map_or(0.0, Codebook::max_error);
        Some(q.probs.max_error().max(backoff))
    }

    fn quantize(&mut self, order: usize) {
        let max_bins = 1usize << self.bits;
        let probs = Codebook::build(self.raw.probs(order), max_bins);
        let backoffs = self
            .raw
            .has_backoff(order)
            .then(|| Codebook::build(self.raw.backoffs(order), max_bins));

        let prob_width = probs.code_width();
        let backoff_width = backoffs.as_ref().map_or(0, Codebook::code_width);
        let size = self.raw.size(order);
        let mut codes = BitList::with_capacity(size * u64::from(prob_width + backoff_width));
        for offset in 0..size {
            let value = self.raw.get(order, Offset(offset));
            codes.write_bits(u64::from(probs.encode(value.prob)), prob_width);
            if let Some(book) = &backoffs {
                codes.write_bits(u64::from(book.encode(value.backoff)), backoff_width);
            }
        }

        tracing::debug!(
            order,
            size,
            prob_bins = probs.len(),
            backoff_bins = backoffs.as_ref().map_or(0, Codebook::len),
            prob_max_error = probs.max_error(),
            "Quantized order"
        );

        self.quantized[order] = Some(QuantizedOrder {
            probs,
            backoffs,
            prob_width,
            backoff_width,
            codes,
        });
        self.raw.release(order);
    }

    fn finalized(&self, order: usize) -> Result<&QuantizedOrder> {
        self.quantized
            .get(order)
            .and_then(Option::as_ref)
            .ok_or(Error::NotFinalized(order))
    }
}

impl ValueContainer for QuantizedProbBackoffValues {
    type Value = ProbBackoffPair;

    /// Overwrites on repeat.
    fn add(&mut self, entry: &NgramEntry<'_>, value: &ProbBackoffPair) -> Result<()> {
        check_order(entry.order, self.raw.num_orders())?;
        if self.raw.is_released(entry.order) {
            return Err(Error::AlreadyFinalized(entry.order));
        }
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
        match &mut self.quantized[order] {
            Some(q) => {
                let width = q.code_width();
                let (pa, pb) = (a.get() * u64::from(width), b.get() * u64::from(width));
                let (ca, cb) = (q.codes.get_bits(pa, width), q.codes.get_bits(pb, width));
                q.codes.set_bits(pa, cb, width);
                q.codes.set_bits(pb, ca, width);
            }
            None => self.raw.swap(order, a, b),
        }
        self.links.swap(order, a, b);
        Ok(())
    }

    fn set_size_at_least(&mut self, size: u64, order: usize) -> Result<()> {
        check_order(order, self.raw.num_orders())?;
        self.raw.ensure_size(order, size)?;
        self.links.ensure_size(order, size)
    }

    fn create_fresh_values(&self) -> Self {
        Self::new(self.raw.num_orders(), self.links.enabled(), self.bits)
    }

    fn get_from_offset(&self, offset: Offset, order: usize, out: &mut ProbBackoffPair) {
        let Some(q) = &self.quantized[order] else {
            *out = self.raw.get(order, offset);
            return;
        };
        assert!(
            offset.get() < self.raw.size(order),
            "offset {offset} out of range for order {order}"
        );
        let pos = offset.get() * u64::from(q.code_width());
        let prob_code = q.codes.get_bits(pos, q.prob_width);
        let backoff_code = q
            .codes
            .get_bits(pos + u64::from(q.prob_width), q.backoff_width);
        match q.decode_pair(prob_code, backoff_code) {
            Ok(pair) => *out = pair,
            Err(e) => panic!("quantized codes of order {order} are inconsistent: {e}"),
        }
    }

    fn set_from_other_values(&mut self, other: Self) {
        *self = other;
    }

    fn get_compressed(&self, offset: Offset, order: usize) -> Result<BitList> {
        check_order(order, self.raw.num_orders())?;
        let q = self.finalized(order)?;
        check_offset(offset, order, self.raw.size(order))?;
        let width = q.code_width();
        let mut bits = BitList::with_capacity(u64::from(width));
        bits.write_bits(q.codes.get_bits(offset.get() * u64::from(width), width), width);
        Ok(bits)
    }

    fn decompress(
        &self,
        bits: &mut BitReader<'_>,
        order: usize,
        just_consume: bool,
        out: &mut ProbBackoffPair,
    ) -> Result<()> {
        let q = self.finalized(order)?;
        if just_consume {
            return bits.skip(u64::from(q.code_width()));
        }
        let prob_code = bits.read_bits(q.prob_width)?;
        let backoff_code = bits.read_bits(q.backoff_width)?;
        *out = q.decode_pair(prob_code, backoff_code)?;
        Ok(())
    }

    /// Floats are already released by `trim_after_ngram`.
    fn clear_storage_after_compression(&mut self, order: usize) -> Result<()> {
        check_order(order, self.raw.num_orders())?;
        self.finalized(order).map(|_| ())
    }

    fn trim_after_ngram(&mut self, order: usize, size: u64) -> Result<()> {
        check_order(order, self.raw.num_orders())?;
        if self.quantized[order].is_some() {
            return Err(Error::AlreadyFinalized(order));
        }
        check_size(size, order, self.raw.size(order))?;
        self.raw.truncate(order, size);
        self.links.pack(order, size);
        self.quantize(order);
        Ok(())
    }

    fn trim(&mut self) {
        self.raw.shrink();
        self.links.shrink();
        for q in self.quantized.iter_mut().flatten() {
            q.codes.shrink_to_fit();
        }
    }

    fn get_context_offset(&self, offset: Offset, order: usize) -> Offset {
        self.links.get(order, offset)
    }

    fn init_for_map(&mut self, map: &dyn NgramMap) {
        self.raw.resize_orders(map.max_order());
        self.quantized.resize(map.max_order(), None);
        self.links.resize_orders(map.max_order());
    }

    fn num_orders(&self) -> usize {
        self.raw.num_orders()
    }

    fn size(&self, order: usize) -> u64 {
        self.raw.size(order)
    }
}
