//! Streaming model construction.
//!
//! [`LmBuilder`] drives a [`ValueContainer`] through its build protocol while
//! n-grams arrive order by order (all unigrams, then all bigrams, ...), the
//! way ARPA files list them:
//!
//! 1. the map assigns an offset to each key;
//! 2. the container grows by doubling and records the payload with its links;
//! 3. when the first n-gram of the next order arrives, or on
//!    [`LmBuilder::finish`], the completed order is trimmed, compressed and its
//!    raw storage released.
//!
//! N-grams longer than the configured maximum order are skipped.

use crate::config::{LmConfig, DEFAULT_UNKNOWN_LOG_PROB};
use crate::error::{Error, Result};
use crate::lm::{ArrayEncodedProbBackoffLm, ContextEncodedProbBackoffLm};
use crate::map::{HashNgramMap, NgramMap};
use crate::types::WordId;
use crate::values::{NgramEntry, ProbBackoffPair, ProbBackoffValues, ValueContainer};
use crate::word_indexer::StringWordIndexer;

/// Smallest allocation made for an order.
const MIN_ORDER_CAPACITY: u64 = 16;

/// Finished map, container and vocabulary.
#[derive(Debug, Clone)]
pub struct LmParts<C> {
    /// Offsets of every stored n-gram.
    pub map: HashNgramMap,
    /// Payloads at those offsets.
    pub values: C,
    /// Vocabulary.
    pub indexer: StringWordIndexer,
    /// Score of words with no unigram.
    pub unknown_log_prob: f32,
}

impl<C: ValueContainer<Value = ProbBackoffPair>> LmParts<C> {
    /// Stateless front-end over the parts.
    #[must_use]
    pub fn into_array_lm(self) -> ArrayEncodedProbBackoffLm<HashNgramMap, C> {
        ArrayEncodedProbBackoffLm::new(self.map, self.values, self.indexer, self.unknown_log_prob)
    }

    /// Incremental front-end over the parts; the container must hold suffix links.
    #[must_use]
    pub fn into_context_lm(self) -> ContextEncodedProbBackoffLm<HashNgramMap, C> {
        ContextEncodedProbBackoffLm::new(self.map, self.values, self.indexer, self.unknown_log_prob)
    }
}

/// Single-pass builder of an n-gram model.
#[derive(Debug)]
pub struct LmBuilder<C> {
    map: HashNgramMap,
    values: C,
    indexer: StringWordIndexer,
    unknown_log_prob: f32,
    /// Capacity requested from the container per order.
    declared: Vec<u64>,
    /// Order currently being populated.
    current: Option<usize>,
    skipped: u64,
}

impl LmBuilder<ProbBackoffValues> {
    /// Builder for a model with `model_orders` orders, keeping at most
    /// `config.lm.max_order` of them, in the configured representation.
    ///
    /// Suffix links are always stored so that both front-ends can be used.
    #[must_use]
    pub fn from_config(config: &LmConfig, model_orders: usize) -> Self {
        let orders = config
            .lm
            .max_order
            .map_or(model_orders, |max| model_orders.min(max));
        if orders < model_orders {
            tracing::info!(model_orders, orders, "Loading a lower-order model");
        }
        let values = ProbBackoffValues::from_config(orders, true, &config.storage);
        Self::new(orders, values).with_unknown_log_prob(config.lm.unknown_word_log_prob)
    }
}

impl<C: ValueContainer> LmBuilder<C> {
    /// Builder keeping `num_orders` orders in `values`.
    #[must_use]
    pub fn new(num_orders: usize, values: C) -> Self {
        let map = HashNgramMap::new(num_orders);
        let mut values = values;
        values.init_for_map(&map);
        Self {
            map,
            values,
            indexer: StringWordIndexer::new(),
            unknown_log_prob: DEFAULT_UNKNOWN_LOG_PROB,
            declared: vec![0; num_orders],
            current: None,
            skipped: 0,
        }
    }

    /// Uses an existing vocabulary.
    #[must_use]
    pub fn with_indexer(mut self, indexer: StringWordIndexer) -> Self {
        self.indexer = indexer;
        self
    }

    /// Sets the score of words with no unigram.
    #[must_use]
    pub fn with_unknown_log_prob(mut self, log_prob: f32) -> Self {
        self.unknown_log_prob = log_prob;
        self
    }

    /// Vocabulary built so far.
    #[must_use]
    pub fn indexer(&self) -> &StringWordIndexer {
        &self.indexer
    }

    /// Number of n-grams dropped for exceeding the maximum order.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Adds a whitespace-separated n-gram, indexing new words.
    ///
    /// # Errors
    ///
    /// See [`LmBuilder::add_ngram`].
    pub fn add_phrase(&mut self, phrase: &str, value: &C::Value) -> Result<bool> {
        let words = self.indexer.add_phrase(phrase);
        self.add_ngram(&words, value)
    }

    /// Records `value` for `words`. Returns false if the n-gram was skipped
    /// for exceeding the maximum order.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidOrder`] for an empty n-gram.
    /// - [`Error::BuildOrder`] if a lower order arrives after a higher one.
    /// - [`Error::MissingContext`] if its prefix or suffix was never added.
    /// - Container errors from growth or insertion.
    pub fn add_ngram(&mut self, words: &[WordId], value: &C::Value) -> Result<bool> {
        let Some(order) = words.len().checked_sub(1) else {
            return Err(Error::InvalidOrder {
                order: 0,
                max_order: self.map.max_order(),
            });
        };
        if order >= self.map.max_order() {
            self.skipped += 1;
            return Ok(false);
        }
        self.advance_to(order)?;

        let put = self.map.put(words)?;
        self.reserve(order, put.offset.get() + 1)?;
        let entry = NgramEntry {
            ngram: words,
            order,
            offset: put.offset,
            context_offset: put.context_offset,
            suffix_offset: put.suffix_offset,
            word: words[order],
            is_new: put.is_new,
        };
        self.values.add(&entry, value)?;
        Ok(true)
    }

    /// Finalizes every remaining order and returns the parts.
    ///
    /// # Errors
    ///
    /// Container errors from trimming or compression.
    pub fn finish(mut self) -> Result<LmParts<C>> {
        let first = self.current.unwrap_or(0);
        for order in first..self.map.max_order() {
            self.finalize_order(order)?;
        }
        self.values.trim();
        if self.skipped > 0 {
            tracing::warn!(skipped = self.skipped, "Skipped n-grams above the maximum order");
        }
        Ok(LmParts {
            map: self.map,
            values: self.values,
            indexer: self.indexer,
            unknown_log_prob: self.unknown_log_prob,
        })
    }

    fn advance_to(&mut self, order: usize) -> Result<()> {
        let current = self.current.unwrap_or(0);
        if order < current {
            return Err(Error::BuildOrder {
                current,
                got: order,
            });
        }
        for done in current..order {
            self.finalize_order(done)?;
        }
        self.current = Some(order);
        Ok(())
    }

    fn reserve(&mut self, order: usize, needed: u64) -> Result<()> {
        let declared = self.declared[order];
        if needed <= declared {
            return Ok(());
        }
        let size = needed.max(declared.saturating_mul(2)).max(MIN_ORDER_CAPACITY);
        tracing::debug!(order, from = declared, to = size, "Growing order");
        self.values.set_size_at_least(size, order)?;
        self.declared[order] = size;
        Ok(())
    }

    fn finalize_order(&mut self, order: usize) -> Result<()> {
        let size = self.map.num_ngrams(order);
        if self.declared[order] < size {
            self.reserve(order, size)?;
        }
        self.values.trim_after_ngram(order, size)?;
        self.values.compress_order(order)?;
        self.values.clear_storage_after_compression(order)?;
        tracing::info!(order, size, "Finalized order");
        Ok(())
    }
}
