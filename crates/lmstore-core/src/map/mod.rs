//! Offset addressing consumed by the value containers and query front-ends.
//!
//! A map owns the n-gram keys and hands out one stable [`Offset`] per
//! (order, key). The value containers own the payloads at those offsets and
//! never compute offsets themselves.

mod hash_map;

pub use hash_map::{HashNgramMap, PutResult};

use crate::types::{ContextOffset, LmContextInfo, Offset, SuffixOffset, WordId};

/// Read side of an n-gram trie.
///
/// Orders are 0-based (0 = unigram); a key of order `k` has `k + 1` words.
pub trait NgramMap {
    /// Number of orders held (3 for a trigram model).
    fn max_order(&self) -> usize;

    /// Number of n-grams stored at `order`.
    fn num_ngrams(&self, order: usize) -> u64;

    /// Resolves a full key to its offset, hashing every prefix.
    fn resolve(&self, order: usize, key: &[WordId]) -> Option<Offset>;

    /// Resolves the n-gram formed by extending `context` with `word`.
    ///
    /// An empty context resolves `word` as a unigram.
    fn child_offset(&self, context: LmContextInfo, word: WordId) -> Option<Offset>;

    /// Offset of the prefix (drop last word) of the n-gram at `offset`.
    ///
    /// # Panics
    ///
    /// Panics for unigrams or offsets of an unpopulated order.
    fn ancestor_offset(&self, offset: Offset, order: usize) -> ContextOffset;

    /// Offset of the suffix (drop first word) of the n-gram at `offset`.
    ///
    /// # Panics
    ///
    /// Panics for unigrams or offsets of an unpopulated order.
    fn suffix_offset(&self, offset: Offset, order: usize) -> SuffixOffset;
}
