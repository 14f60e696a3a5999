//! Rank-coded bitstream storage.
//!
//! Language models repeat a small set of (prob, backoff) pairs millions of
//! times. Each order keeps a dictionary of its distinct pairs sorted by
//! descending frequency, and the bitstream stores every value as the
//! Elias-gamma code of `rank + 1`, so the most common pair costs one bit.
//!
//! Gamma codes are variable length, so the stream records a checkpoint (bit
//! position) every `block_size` values. Random access seeks to the nearest
//! checkpoint and skips forward with `just_consume`.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use super::links::SuffixLinks;
use super::persist::{PersistedOrder, PersistedValues};
use super::raw::RawProbBackoff;
use super::{check_offset, check_order, check_size, NgramEntry, ProbBackoffPair, ValueContainer};
use crate::bits::{BitList, BitReader};
use crate::error::{Error, Result};
use crate::map::NgramMap;
use crate::types::Offset;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Exact identity of a pair, including the sign of zero.
type PairKey = (u32, u32);

fn key_of(pair: &ProbBackoffPair) -> PairKey {
    (pair.prob.to_bits(), pair.backoff.to_bits())
}

/// Every link of `order` must name an offset of the order below it.
/// Unigrams back off to the empty context, so their links are all zero.
fn check_links(links: &[u64], order: usize, lower_size: Option<u64>) -> Result<()> {
    let bound = lower_size.unwrap_or(1);
    match links.iter().position(|&link| link >= bound) {
        Some(at) => Err(Error::Corrupted(format!(
            "order {order}: link {} at offset {at} outside {bound} lower-order values",
            links[at]
        ))),
        None => Ok(()),
    }
}

/// Distinct pairs of one order ranked by descending frequency.
#[derive(Debug, Clone, Default)]
struct RankDictionary {
    pairs: Vec<ProbBackoffPair>,
    ranks: FxHashMap<PairKey, u32>,
}

impl RankDictionary {
    fn build(raw: &RawProbBackoff, order: usize) -> Self {
        let mut counts: FxHashMap<PairKey, u64> = FxHashMap::default();
        for offset in 0..raw.size(order) {
            *counts.entry(key_of(&raw.get(order, Offset(offset)))).or_insert(0) += 1;
        }
        let mut ranked: Vec<(PairKey, u64)> = counts.into_iter().collect();
        // Ties broken by key so that the same input always gives the same stream.
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Self::from_pairs(
            ranked
                .into_iter()
                .map(|((p, b), _)| ProbBackoffPair::new(f32::from_bits(p), f32::from_bits(b)))
                .collect(),
        )
    }

    fn from_pairs(pairs: Vec<ProbBackoffPair>) -> Self {
        let ranks = pairs
            .iter()
            .enumerate()
            .map(|(rank, pair)| (key_of(pair), rank as u32))
            .collect();
        Self { pairs, ranks }
    }

    fn rank(&self, pair: &ProbBackoffPair) -> Option<u32> {
        self.ranks.get(&key_of(pair)).copied()
    }

    fn pair(&self, rank: u64) -> Result<ProbBackoffPair> {
        usize::try_from(rank)
            .ok()
            .and_then(|r| self.pairs.get(r))
            .copied()
            .ok_or_else(|| {
                Error::Corrupted(format!(
                    "rank {rank} outside dictionary of {} pairs",
                    self.pairs.len()
                ))
            })
    }
}

/// One order's packed bitstream.
#[derive(Debug, Clone, Default)]
struct CompressedSection {
    bits: BitList,
    count: u64,
    /// Bit position of every `block_size`-th value.
    checkpoints: Vec<u64>,
}

/// Size figures of a compressed container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompressionStats {
    /// Distinct pairs over all dictionaries.
    pub distinct_values: usize,
    /// Values stored in bitstreams.
    pub total_values: u64,
    /// Bytes held by the dictionaries.
    pub dictionary_bytes: usize,
    /// Bytes held by the bitstreams.
    pub encoded_bytes: usize,
    /// Raw float size over compressed size.
    pub compression_ratio: f64,
}

/// Lossless prob/backoff storage with random access into rank-coded streams.
///
/// A repeated `add` for an existing n-gram overwrites the previous payload.
#[derive(Debug, Clone)]
pub struct CompressedProbBackoffValues {
    raw: RawProbBackoff,
    dictionaries: Vec<Option<RankDictionary>>,
    sections: Vec<Option<CompressedSection>>,
    links: SuffixLinks,
    block_size: usize,
}

impl CompressedProbBackoffValues {
    /// Creates an empty container with a checkpoint every `block_size` values.
    #[must_use]
    pub fn new(num_orders: usize, store_suffix_offsets: bool, block_size: usize) -> Self {
        Self {
            raw: RawProbBackoff::new(num_orders),
            dictionaries: vec![None; num_orders],
            sections: vec![None; num_orders],
            links: SuffixLinks::new(num_orders, store_suffix_offsets),
            block_size: block_size.max(1),
        }
    }

    /// Values between checkpoints.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns true once `order` has a bitstream.
    #[must_use]
    pub fn is_compressed(&self, order: usize) -> bool {
        self.sections.get(order).is_some_and(Option::is_some)
    }

    /// Size figures over every compressed order.
    #[must_use]
    pub fn stats(&self) -> CompressionStats {
        let pair_bytes = std::mem::size_of::<ProbBackoffPair>();
        let distinct_values: usize = self
            .dictionaries
            .iter()
            .flatten()
            .map(|d| d.pairs.len())
            .sum();
        let mut total_values = 0u64;
        let mut encoded_bytes = 0usize;
        for section in self.sections.iter().flatten() {
            total_values += section.count;
            encoded_bytes += section.bits.byte_len() + section.checkpoints.len() * 8;
        }
        let dictionary_bytes = distinct_values * (pair_bytes + 4);
        let compressed = dictionary_bytes + encoded_bytes;
        let compression_ratio = if compressed > 0 {
            (total_values as f64 * pair_bytes as f64) / compressed as f64
        } else {
            0.0
        };
        CompressionStats {
            distinct_values,
            total_values,
            dictionary_bytes,
            encoded_bytes,
            compression_ratio,
        }
    }

    fn dictionary(&self, order: usize) -> Result<&RankDictionary> {
        self.dictionaries
            .get(order)
            .and_then(Option::as_ref)
            .ok_or(Error::NotFinalized(order))
    }

    fn section(&self, order: usize) -> Result<&CompressedSection> {
        self.sections
            .get(order)
            .and_then(Option::as_ref)
            .ok_or(Error::NotFinalized(order))
    }

    fn encode_order(&self, order: usize) -> Result<CompressedSection> {
        let dict = self.dictionary(order)?;
        let count = self.raw.size(order);
        let mut bits = BitList::new();
        let mut checkpoints = Vec::with_capacity(count.div_ceil(self.block_size as u64) as usize);
        for offset in 0..count {
            if offset % self.block_size as u64 == 0 {
                checkpoints.push(bits.len());
            }
            let value = self.raw.get(order, Offset(offset));
            let rank = dict.rank(&value).ok_or_else(|| {
                Error::Corrupted(format!(
                    "value at offset {offset} of order {order} missing from dictionary"
                ))
            })?;
            bits.write_gamma(u64::from(rank) + 1);
        }
        bits.shrink_to_fit();
        Ok(CompressedSection {
            bits,
            count,
            checkpoints,
        })
    }

    /// Replays the section of `order` up to `offset`.
    fn read_packed(&self, order: usize, offset: Offset) -> Result<ProbBackoffPair> {
        let section = self.section(order)?;
        check_offset(offset, order, section.count)?;
        let block = offset.index() / self.block_size;
        let start = section.checkpoints.get(block).copied().ok_or_else(|| {
            Error::Corrupted(format!("missing checkpoint {block} in order {order}"))
        })?;
        let mut reader = section.bits.reader();
        reader.seek(start)?;
        let mut out = ProbBackoffPair::default();
        for _ in (block * self.block_size)..offset.index() {
            self.decompress(&mut reader, order, true, &mut out)?;
        }
        self.decompress(&mut reader, order, false, &mut out)?;
        Ok(out)
    }

    fn verify_section(&self, order: usize) -> Result<()> {
        let section = self.section(order)?;
        let mut reader = section.bits.reader();
        let mut decoded = ProbBackoffPair::default();
        for offset in 0..section.count {
            self.decompress(&mut reader, order, false, &mut decoded)?;
            let expected = self.raw.get(order, Offset(offset));
            if key_of(&decoded) != key_of(&expected) {
                return Err(Error::Corrupted(format!(
                    "order {order} offset {offset}: replay gave {decoded:?}, stored {expected:?}"
                )));
            }
        }
        Ok(())
    }

    /// Snapshot of every order's bitstream, dictionary and links.
    ///
    /// # Errors
    ///
    /// [`Error::NotFinalized`] if an order has not been compressed.
    pub fn to_persisted(&self) -> Result<PersistedValues> {
        let mut orders = Vec::with_capacity(self.raw.num_orders());
        for order in 0..self.raw.num_orders() {
            let section = self.section(order)?;
            let dict = self.dictionary(order)?;
            orders.push(PersistedOrder {
                count: section.count,
                bit_len: section.bits.len(),
                dictionary: dict.pairs.clone(),
                bytes: section.bits.as_bytes().to_vec(),
                links: self.links.export(order),
            });
        }
        Ok(PersistedValues::new(self.block_size as u32, orders))
    }

    /// Restores a read-only container from a snapshot.
    ///
    /// Checkpoints are rebuilt by scanning each stream, which also checks that
    /// every stream holds exactly its recorded number of values.
    ///
    /// # Errors
    ///
    /// [`Error::Corrupted`] if a stream is truncated, has trailing bits, names
    /// a rank outside its dictionary, or its links disagree with the orders
    /// they point into.
    pub fn from_persisted(persisted: PersistedValues) -> Result<Self> {
        let block_size = persisted.block_size().max(1) as usize;
        let num_orders = persisted.orders().len();
        let store_links = persisted.orders().iter().any(|o| o.links.is_some());
        let mut values = Self::new(num_orders, store_links, block_size);

        for (order, stored) in persisted.into_orders().into_iter().enumerate() {
            if stored.bit_len > stored.bytes.len() as u64 * 8 {
                return Err(Error::Corrupted(format!(
                    "order {order}: {} bits do not fit in {} bytes",
                    stored.bit_len,
                    stored.bytes.len()
                )));
            }
            values.raw.adopt_released(order, stored.count);
            values.dictionaries[order] = Some(RankDictionary::from_pairs(stored.dictionary));
            values.sections[order] = Some(CompressedSection {
                bits: BitList::from_bytes(stored.bytes, stored.bit_len),
                count: stored.count,
                checkpoints: Vec::new(),
            });
            values.rebuild_checkpoints(order)?;

            match stored.links {
                Some(links) if links.len() as u64 == stored.count => {
                    check_links(&links, order, order.checked_sub(1).map(|o| values.size(o)))?;
                    values.links.import(order, links);
                }
                Some(links) => {
                    return Err(Error::Corrupted(format!(
                        "order {order}: {} links for {} values",
                        links.len(),
                        stored.count
                    )));
                }
                None if store_links => {
                    return Err(Error::Corrupted(format!("order {order}: links missing")));
                }
                None => {}
            }
        }
        Ok(values)
    }

    fn rebuild_checkpoints(&mut self, order: usize) -> Result<()> {
        let section = self.section(order)?;
        let mut reader = section.bits.reader();
        let mut scratch = ProbBackoffPair::default();
        let mut checkpoints = Vec::new();
        for offset in 0..section.count {
            if offset % self.block_size as u64 == 0 {
                checkpoints.push(reader.position());
            }
            // Decode rather than consume so bad ranks are caught here.
            self.decompress(&mut reader, order, false, &mut scratch)?;
        }
        if !reader.is_exhausted() {
            return Err(Error::Corrupted(format!(
                "order {order}: {} trailing bits after {} values",
                reader.remaining(),
                section.count
            )));
        }
        if let Some(section) = self.sections[order].as_mut() {
            section.checkpoints = checkpoints;
        }
        Ok(())
    }

    /// Writes the compressed container to `path`.
    ///
    /// # Errors
    ///
    /// Fails if an order is not compressed or the file cannot be written.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_persisted()?.save_to_path(path)
    }

    /// Reads a container written by [`Self::save_to_path`].
    ///
    /// # Errors
    ///
    /// Fails on IO errors or a corrupted blob.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_persisted(PersistedValues::load_from_path(path)?)
    }
}

impl ValueContainer for CompressedProbBackoffValues {
    type Value = ProbBackoffPair;

    /// Overwrites on repeat.
    fn add(&mut self, entry: &NgramEntry<'_>, value: &ProbBackoffPair) -> Result<()> {
        check_order(entry.order, self.raw.num_orders())?;
        if self.dictionaries[entry.order].is_some() {
            return Err(Error::AlreadyFinalized(entry.order));
        }
        check_offset(entry.offset, entry.order, self.raw.size(entry.order))?;
        self.raw.set(entry.order, entry.offset, value);
        self.links
            .set(entry.order, entry.offset, entry.suffix_offset.get())
    }

    fn swap(&mut self, a: Offset, b: Offset, order: usize) -> Result<()> {
        check_order(order, self.raw.num_orders())?;
        if self.sections[order].is_some() {
            return Err(Error::AlreadyFinalized(order));
        }
        let size = self.raw.size(order);
        check_offset(a, order, size)?;
        check_offset(b, order, size)?;
        self.raw.swap(order, a, b);
        self.links.swap(order, a, b);
        Ok(())
    }

    fn set_size_at_least(&mut self, size: u64, order: usize) -> Result<()> {
        check_order(order, self.raw.num_orders())?;
        self.raw.ensure_size(order, size)?;
        self.links.ensure_size(order, size)
    }

    fn create_fresh_values(&self) -> Self {
        Self::new(self.raw.num_orders(), self.links.enabled(), self.block_size)
    }

    fn get_from_offset(&self, offset: Offset, order: usize, out: &mut ProbBackoffPair) {
        if !self.raw.is_released(order) {
            *out = self.raw.get(order, offset);
            return;
        }
        match self.read_packed(order, offset) {
            Ok(pair) => *out = pair,
            Err(e) => panic!("cannot read offset {offset} of order {order}: {e}"),
        }
    }

    fn set_from_other_values(&mut self, other: Self) {
        *self = other;
    }

    fn get_compressed(&self, offset: Offset, order: usize) -> Result<BitList> {
        check_order(order, self.raw.num_orders())?;
        let dict = self.dictionary(order)?;
        check_offset(offset, order, self.raw.size(order))?;
        let value = if self.raw.is_released(order) {
            self.read_packed(order, offset)?
        } else {
            self.raw.get(order, offset)
        };
        let rank = dict
            .rank(&value)
            .ok_or_else(|| Error::Corrupted(format!("value {value:?} missing from dictionary")))?;
        let mut bits = BitList::new();
        bits.write_gamma(u64::from(rank) + 1);
        Ok(bits)
    }

    fn decompress(
        &self,
        bits: &mut BitReader<'_>,
        order: usize,
        just_consume: bool,
        out: &mut ProbBackoffPair,
    ) -> Result<()> {
        let dict = self.dictionary(order)?;
        // Gamma codes carry their own length, so even skipping reads the prefix.
        let code = bits.read_gamma()?;
        if !just_consume {
            *out = dict.pair(code - 1)?;
        }
        Ok(())
    }

    fn compress_order(&mut self, order: usize) -> Result<()> {
        check_order(order, self.raw.num_orders())?;
        if self.sections[order].is_some() {
            return Ok(());
        }
        let section = self.encode_order(order)?;
        tracing::info!(
            order,
            size = section.count,
            bits = section.bits.len(),
            bytes = section.bits.byte_len(),
            distinct = self.dictionaries[order].as_ref().map_or(0, |d| d.pairs.len()),
            "Compressed order"
        );
        self.sections[order] = Some(section);
        Ok(())
    }

    fn clear_storage_after_compression(&mut self, order: usize) -> Result<()> {
        check_order(order, self.raw.num_orders())?;
        self.section(order)?;
        if self.raw.is_released(order) {
            return Ok(());
        }
        self.verify_section(order)?;
        self.raw.release(order);
        Ok(())
    }

    fn trim_after_ngram(&mut self, order: usize, size: u64) -> Result<()> {
        check_order(order, self.raw.num_orders())?;
        if self.dictionaries[order].is_some() {
            return Err(Error::AlreadyFinalized(order));
        }
        check_size(size, order, self.raw.size(order))?;
        self.raw.truncate(order, size);
        self.links.pack(order, size);
        let dict = RankDictionary::build(&self.raw, order);
        tracing::debug!(order, size, distinct = dict.pairs.len(), "Built rank dictionary");
        self.dictionaries[order] = Some(dict);
        Ok(())
    }

    fn trim(&mut self) {
        self.raw.shrink();
        self.links.shrink();
        for section in self.sections.iter_mut().flatten() {
            section.bits.shrink_to_fit();
            section.checkpoints.shrink_to_fit();
        }
    }

    fn get_context_offset(&self, offset: Offset, order: usize) -> Offset {
        self.links.get(order, offset)
    }

    fn init_for_map(&mut self, map: &dyn NgramMap) {
        self.raw.resize_orders(map.max_order());
        self.dictionaries.resize(map.max_order(), None);
        self.sections.resize(map.max_order(), None);
        self.links.resize_orders(map.max_order());
    }

    fn num_orders(&self) -> usize {
        self.raw.num_orders()
    }

    fn size(&self, order: usize) -> u64 {
        self.raw.size(order)
    }
}
