//! Payload storage for n-gram language models.
//!
//! A [`ValueContainer`] owns every payload of every order, addressed by the
//! offsets an [`NgramMap`] assigns. It knows nothing about keys and never
//! interprets its payloads beyond storing, packing and replaying them.
//!
//! # Representations
//!
//! | Container | Payload | Packed form | Loss |
//! |-----------|---------|-------------|------|
//! | [`UncompressedProbBackoffValues`] | prob + backoff | raw `f32` bits | none |
//! | [`QuantizedProbBackoffValues`] | prob + backoff | fixed-width codebook indices | ≤ half a bin |
//! | [`CompressedProbBackoffValues`] | prob + backoff | Elias-gamma ranks, one bitstream per order | none |
//! | [`CountValues`] | `u64` count | Elias-delta | none |
//!
//! [`ProbBackoffValues`] selects one of the prob/backoff representations at
//! construction time.
//!
//! # Build protocol
//!
//! Per order, in increasing order: `set_size_at_least` → `add`* →
//! `trim_after_ngram` → `compress_order` → `clear_storage_after_compression`.
//! After the last order the container is read-only and `Sync`; readers use
//! their own scratch value.

mod compressed;
mod counts;
mod links;
mod persist;
mod quantized;
mod raw;
mod uncompressed;

pub use compressed::{CompressedProbBackoffValues, CompressionStats};
pub use counts::CountValues;
pub use persist::{PersistedOrder, PersistedValues};
pub use quantized::{Codebook, QuantizedProbBackoffValues};
pub use uncompressed::UncompressedProbBackoffValues;

use crate::bits::{BitList, BitReader};
use crate::config::{StorageKind, StorageSection, MAX_QUANTIZATION_BITS};
use crate::error::{Error, Result};
use crate::map::NgramMap;
use crate::types::{ContextOffset, Offset, SuffixOffset, WordId};
use serde::{Deserialize, Serialize};

/// Log10 probability and backoff weight of one n-gram.
///
/// The highest order carries no backoff; its `backoff` is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProbBackoffPair {
    /// Log10 conditional probability.
    pub prob: f32,
    /// Log10 backoff weight.
    pub backoff: f32,
}

impl ProbBackoffPair {
    /// Creates a pair.
    #[must_use]
    pub const fn new(prob: f32, backoff: f32) -> Self {
        Self { prob, backoff }
    }
}

/// Everything the map knows about an n-gram when its payload is recorded.
#[derive(Debug, Clone, Copy)]
pub struct NgramEntry<'a> {
    /// The n-gram's words (`order + 1` of them).
    pub ngram: &'a [WordId],
    /// 0-based order.
    pub order: usize,
    /// Payload slot.
    pub offset: Offset,
    /// Offset of the prefix at `order - 1`.
    pub context_offset: ContextOffset,
    /// Offset of the suffix at `order - 1`.
    pub suffix_offset: SuffixOffset,
    /// Last word of the n-gram.
    pub word: WordId,
    /// False if the map already held this key.
    pub is_new: bool,
}

/// Storage contract between an n-gram map and its payloads.
pub trait ValueContainer {
    /// Stored payload type.
    type Value: Clone + Default;

    /// Records `value` at `entry.offset`.
    ///
    /// Offsets may arrive in any order. When `entry.is_new` is false the
    /// representation decides between overwrite and accumulate; see each
    /// implementation.
    ///
    /// # Errors
    ///
    /// Fails if the offset is outside the declared size or the order is
    /// already finalized.
    fn add(&mut self, entry: &NgramEntry<'_>, value: &Self::Value) -> Result<()>;

    /// Exchanges the payloads (and stored suffix links) at `a` and `b`.
    ///
    /// # Errors
    ///
    /// Fails if either offset is outside the declared size or the order's
    /// raw storage was already released.
    fn swap(&mut self, a: Offset, b: Offset, order: usize) -> Result<()>;

    /// Grows the order to hold at least `size` slots. Never shrinks.
    ///
    /// # Errors
    ///
    /// [`Error::ResourceExhausted`] if the allocation cannot be satisfied.
    fn set_size_at_least(&mut self, size: u64, order: usize) -> Result<()>;

    /// Creates an empty container with the same settings.
    #[must_use]
    fn create_fresh_values(&self) -> Self
    where
        Self: Sized;

    /// Writes the payload at `offset` into `out`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is outside the order's size.
    fn get_from_offset(&self, offset: Offset, order: usize, out: &mut Self::Value);

    /// Replaces this container's storage with `other`'s.
    fn set_from_other_values(&mut self, other: Self)
    where
        Self: Sized;

    /// Encodes the payload at `offset` as a self-delimiting bit code.
    ///
    /// # Errors
    ///
    /// Fails if the order has no encoder yet or the offset is out of range.
    fn get_compressed(&self, offset: Offset, order: usize) -> Result<BitList>;

    /// Reads one code written by [`ValueContainer::get_compressed`].
    ///
    /// With `just_consume` the cursor advances past the code and `out` is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// [`Error::Corrupted`] if the stream is truncated or names a payload
    /// that does not exist.
    fn decompress(
        &self,
        bits: &mut BitReader<'_>,
        order: usize,
        just_consume: bool,
        out: &mut Self::Value,
    ) -> Result<()>;

    /// Packs the order into its compressed form, if the representation has one.
    ///
    /// # Errors
    ///
    /// [`Error::NotFinalized`] if called before `trim_after_ngram`.
    fn compress_order(&mut self, _order: usize) -> Result<()> {
        Ok(())
    }

    /// Releases the order's raw storage once its packed form replays exactly.
    ///
    /// # Errors
    ///
    /// [`Error::Corrupted`] if the packed form disagrees with the raw values.
    fn clear_storage_after_compression(&mut self, order: usize) -> Result<()>;

    /// Marks `order` complete at `size` n-grams and releases spare capacity.
    ///
    /// # Errors
    ///
    /// Fails if `size` exceeds the declared size.
    fn trim_after_ngram(&mut self, order: usize, size: u64) -> Result<()>;

    /// Releases spare capacity of every order.
    fn trim(&mut self);

    /// Returns the backoff link recorded for the n-gram at `offset`: the
    /// offset, at `order - 1`, of its suffix.
    ///
    /// # Panics
    ///
    /// Panics if suffix links are not stored or `order` was never populated.
    fn get_context_offset(&self, offset: Offset, order: usize) -> Offset;

    /// Returns a value suitable as reusable output buffer.
    #[must_use]
    fn scratch_value(&self) -> Self::Value {
        Self::Value::default()
    }

    /// Adopts the number of orders of `map`.
    fn init_for_map(&mut self, map: &dyn NgramMap);

    /// Number of orders held.
    fn num_orders(&self) -> usize;

    /// Declared size of `order`.
    fn size(&self, order: usize) -> u64;
}

pub(crate) fn check_order(order: usize, num_orders: usize) -> Result<()> {
    if order >= num_orders {
        return Err(Error::InvalidOrder {
            order,
            max_order: num_orders,
        });
    }
    Ok(())
}

pub(crate) fn check_offset(offset: Offset, order: usize, size: u64) -> Result<()> {
    if offset.get() >= size {
        return Err(Error::OffsetOutOfRange {
            offset: offset.get(),
            order,
            size,
        });
    }
    Ok(())
}

/// Checks a final order length; unlike an offset it may equal the declared size.
pub(crate) fn check_size(size: u64, order: usize, declared: u64) -> Result<()> {
    if size > declared {
        return Err(Error::OffsetOutOfRange {
            offset: size,
            order,
            size: declared,
        });
    }
    Ok(())
}

/// Prob/backoff container with its representation chosen at construction.
#[derive(Debug, Clone)]
pub enum ProbBackoffValues {
    /// Raw floats.
    Uncompressed(UncompressedProbBackoffValues),
    /// Codebook indices.
    Quantized(QuantizedProbBackoffValues),
    /// Rank-coded bitstreams.
    Compressed(CompressedProbBackoffValues),
}

impl ProbBackoffValues {
    /// Builds the representation named by `storage`.
    ///
    /// Out-of-range `quantization_bits` or `block_size` fall back to their
    /// defaults with a warning.
    #[must_use]
    pub fn from_config(
        num_orders: usize,
        store_suffix_offsets: bool,
        storage: &StorageSection,
    ) -> Self {
        let defaults = StorageSection::default();
        match storage.kind {
            StorageKind::Uncompressed => Self::Uncompressed(UncompressedProbBackoffValues::new(
                num_orders,
                store_suffix_offsets,
            )),
            StorageKind::Quantized => {
                let mut bits = storage.quantization_bits;
                if !(1..=MAX_QUANTIZATION_BITS).contains(&bits) {
                    tracing::warn!(
                        bits,
                        fallback = defaults.quantization_bits,
                        "Invalid quantization bits, using default"
                    );
                    bits = defaults.quantization_bits;
                }
                Self::Quantized(QuantizedProbBackoffValues::new(
                    num_orders,
                    store_suffix_offsets,
                    bits,
                ))
            }
            StorageKind::Compressed => {
                let mut block_size = storage.block_size;
                if block_size == 0 {
                    tracing::warn!(
                        fallback = defaults.block_size,
                        "Block size 0 is invalid, using default"
                    );
                    block_size = defaults.block_size;
                }
                Self::Compressed(CompressedProbBackoffValues::new(
                    num_orders,
                    store_suffix_offsets,
                    block_size,
                ))
            }
        }
    }

    /// The representation in use.
    #[must_use]
    pub fn kind(&self) -> StorageKind {
        match self {
            Self::Uncompressed(_) => StorageKind::Uncompressed,
            Self::Quantized(_) => StorageKind::Quantized,
            Self::Compressed(_) => StorageKind::Compressed,
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            ProbBackoffValues::Uncompressed($inner) => $body,
            ProbBackoffValues::Quantized($inner) => $body,
            ProbBackoffValues::Compressed($inner) => $body,
        }
    };
}

impl ValueContainer for ProbBackoffValues {
    type Value = ProbBackoffPair;

    fn add(&mut self, entry: &NgramEntry<'_>, value: &ProbBackoffPair) -> Result<()> {
        dispatch!(self, v => v.add(entry, value))
    }

    fn swap(&mut self, a: Offset, b: Offset, order: usize) -> Result<()> {
        dispatch!(self, v => v.swap(a, b, order))
    }

    fn set_size_at_least(&mut self, size: u64, order: usize) -> Result<()> {
        dispatch!(self, v => v.set_size_at_least(size, order))
    }

    fn create_fresh_values(&self) -> Self {
        match self {
            Self::Uncompressed(v) => Self::Uncompressed(v.create_fresh_values()),
            Self::Quantized(v) => Self::Quantized(v.create_fresh_values()),
            Self::Compressed(v) => Self::Compressed(v.create_fresh_values()),
        }
    }

    fn get_from_offset(&self, offset: Offset, order: usize, out: &mut ProbBackoffPair) {
        dispatch!(self, v => v.get_from_offset(offset, order, out));
    }

    /// # Panics
    ///
    /// Panics if `other` uses a different representation.
    fn set_from_other_values(&mut self, other: Self) {
        match (self, other) {
            (Self::Uncompressed(v), Self::Uncompressed(o)) => v.set_from_other_values(o),
            (Self::Quantized(v), Self::Quantized(o)) => v.set_from_other_values(o),
            (Self::Compressed(v), Self::Compressed(o)) => v.set_from_other_values(o),
            (this, other) => panic!(
                "cannot move {:?} values into a {:?} container",
                other.kind(),
                this.kind()
            ),
        }
    }

    fn get_compressed(&self, offset: Offset, order: usize) -> Result<BitList> {
        dispatch!(self, v => v.get_compressed(offset, order))
    }

    fn decompress(
        &self,
        bits: &mut BitReader<'_>,
        order: usize,
        just_consume: bool,
        out: &mut ProbBackoffPair,
    ) -> Result<()> {
        dispatch!(self, v => v.decompress(bits, order, just_consume, out))
    }

    fn compress_order(&mut self, order: usize) -> Result<()> {
        dispatch!(self, v => v.compress_order(order))
    }

    fn clear_storage_after_compression(&mut self, order: usize) -> Result<()> {
        dispatch!(self, v => v.clear_storage_after_compression(order))
    }

    fn trim_after_ngram(&mut self, order: usize, size: u64) -> Result<()> {
        dispatch!(self, v => v.trim_after_ngram(order, size))
    }

    fn trim(&mut self) {
        dispatch!(self, v => v.trim());
    }

    fn get_context_offset(&self, offset: Offset, order: usize) -> Offset {
        dispatch!(self, v => v.get_context_offset(offset, order))
    }

    fn init_for_map(&mut self, map: &dyn NgramMap) {
        dispatch!(self, v => v.init_for_map(map));
    }

    fn num_orders(&self) -> usize {
        dispatch!(self, v => v.num_orders())
    }

    fn size(&self, order: usize) -> u64 {
        dispatch!(self, v => v.size(order))
    }
}
