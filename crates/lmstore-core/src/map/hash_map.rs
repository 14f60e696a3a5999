//! Hash-based reference map.
//!
//! Each order indexes `(prefix offset, last word) -> offset`, so resolving a
//! key of order k costs k + 1 probes and extending a context costs one.
//! Offsets are assigned densely in insertion order.

use super::NgramMap;
use crate::error::{Error, Result};
use crate::types::{ContextOffset, LmContextInfo, Offset, SuffixOffset, WordId};
use rustc_hash::FxHashMap;

/// Outcome of [`HashNgramMap::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutResult {
    /// Offset of the n-gram.
    pub offset: Offset,
    /// Offset of its prefix at `order - 1` (0 for unigrams).
    pub context_offset: ContextOffset,
    /// Offset of its suffix at `order - 1` (0 for unigrams).
    pub suffix_offset: SuffixOffset,
    /// False if the key was already present.
    pub is_new: bool,
}

#[derive(Debug, Default, Clone)]
struct OrderTable {
    index: FxHashMap<(u64, WordId), u64>,
    prefixes: Vec<u64>,
    suffixes: Vec<u64>,
}

impl OrderTable {
    fn len(&self) -> u64 {
        self.prefixes.len() as u64
    }
}

/// In-memory [`NgramMap`] with insertion.
#[derive(Debug, Clone)]
pub struct HashNgramMap {
    orders: Vec<OrderTable>,
}

impl HashNgramMap {
    /// Creates an empty map holding `max_order` orders.
    #[must_use]
    pub fn new(max_order: usize) -> Self {
        Self {
            orders: vec![OrderTable::default(); max_order],
        }
    }

    /// Inserts `key` (or finds it) and returns its offset and links.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidOrder`] if `key` is empty or longer than the map allows.
    /// - [`Error::MissingContext`] if its prefix or suffix n-gram was never inserted.
    pub fn put(&mut self, key: &[WordId]) -> Result<PutResult> {
        let order = self.order_of(key)?;
        let word = key[order];

        let (prefix, suffix) = if order == 0 {
            (0, 0)
        } else {
            let prefix = self
                .resolve(order - 1, &key[..order])
                .ok_or(Error::MissingContext {
                    order,
                    link: "prefix",
                })?;
            let suffix = self
                .resolve(order - 1, &key[1..])
                .ok_or(Error::MissingContext {
                    order,
                    link: "suffix",
                })?;
            (prefix.get(), suffix.get())
        };

        let table = &mut self.orders[order];
        if let Some(&offset) = table.index.get(&(prefix, word)) {
            return Ok(PutResult {
                offset: Offset(offset),
                context_offset: ContextOffset(prefix),
                suffix_offset: SuffixOffset(suffix),
                is_new: false,
            });
        }

        let offset = table.len();
        table.index.insert((prefix, word), offset);
        table.prefixes.push(prefix);
        table.suffixes.push(suffix);

        Ok(PutResult {
            offset: Offset(offset),
            context_offset: ContextOffset(prefix),
            suffix_offset: SuffixOffset(suffix),
            is_new: true,
        })
    }

    fn order_of(&self, key: &[WordId]) -> Result<usize> {
        if key.is_empty() || key.len() > self.orders.len() {
            return Err(Error::InvalidOrder {
                order: key.len().saturating_sub(1),
                max_order: self.orders.len(),
            });
        }
        Ok(key.len() - 1)
    }

    fn link_table(&self, offset: Offset, order: usize) -> &OrderTable {
        assert!(order > 0, "unigrams have no prefix or suffix");
        let table = &self.orders[order];
        assert!(
            offset.get() < table.len(),
            "offset {offset} not populated at order {order} ({} n-grams)",
            table.len()
        );
        table
    }
}

impl NgramMap for HashNgramMap {
    fn max_order(&self) -> usize {
        self.orders.len()
    }

    fn num_ngrams(&self, order: usize) -> u64 {
        self.orders.get(order).map_or(0, OrderTable::len)
    }

    fn resolve(&self, order: usize, key: &[WordId]) -> Option<Offset> {
        if key.len() != order + 1 || order >= self.orders.len() {
            return None;
        }
        let mut offset = 0u64;
        for (table, &word) in self.orders.iter().zip(key) {
            offset = *table.index.get(&(offset, word))?;
        }
        Some(Offset(offset))
    }

    fn child_offset(&self, context: LmContextInfo, word: WordId) -> Option<Offset> {
        let (order, prefix) = if context.is_empty() {
            (0, 0)
        } else {
            (context.order as usize + 1, context.offset.get())
        };
        let table = self.orders.get(order)?;
        table.index.get(&(prefix, word)).map(|&o| Offset(o))
    }

    fn ancestor_offset(&self, offset: Offset, order: usize) -> ContextOffset {
        ContextOffset(self.link_table(offset, order).prefixes[offset.index()])
    }

    fn suffix_offset(&self, offset: Offset, order: usize) -> SuffixOffset {
        SuffixOffset(self.link_table(offset, order).suffixes[offset.index()])
    }
}
