//! Incremental prob/backoff model.

use super::{score_sentence_context, ContextEncodedNgramLm, NgramLanguageModel};
use crate::map::NgramMap;
use crate::types::{LmContextInfo, Offset, WordId};
use crate::values::{ProbBackoffPair, ValueContainer};
use crate::word_indexer::StringWordIndexer;

/// Backoff model that extends a caller-held context one word at a time.
///
/// The container must store suffix links (`store_suffix_offsets`); backing
/// off follows them instead of re-hashing the shorter contexts.
#[derive(Debug, Clone)]
pub struct ContextEncodedProbBackoffLm<M, C> {
    map: M,
    values: C,
    indexer: StringWordIndexer,
    unknown_log_prob: f32,
}

impl<M, C> ContextEncodedProbBackoffLm<M, C>
where
    M: NgramMap,
    C: ValueContainer<Value = ProbBackoffPair>,
{
    /// Wraps a finalized map and a container holding suffix links.
    #[must_use]
    pub fn new(map: M, values: C, indexer: StringWordIndexer, unknown_log_prob: f32) -> Self {
        Self {
            map,
            values,
            indexer,
            unknown_log_prob,
        }
    }

    /// The n-gram map.
    #[must_use]
    pub fn map(&self) -> &M {
        &self.map
    }

    /// The value container.
    #[must_use]
    pub fn values(&self) -> &C {
        &self.values
    }

    /// Releases the map, container and indexer.
    #[must_use]
    pub fn into_parts(self) -> (M, C, StringWordIndexer) {
        (self.map, self.values, self.indexer)
    }

    /// Context of the matched n-gram `(offset, order)` as seen by the next word.
    ///
    /// A match at the highest order cannot be extended, so the next word
    /// starts from its suffix.
    fn next_context(&self, offset: Offset, order: usize) -> LmContextInfo {
        if order + 1 < self.map.max_order() {
            LmContextInfo {
                offset,
                order: order as i32,
            }
        } else if order == 0 {
            LmContextInfo::EMPTY
        } else {
            LmContextInfo {
                offset: self.values.get_context_offset(offset, order),
                order: order as i32 - 1,
            }
        }
    }

    /// Drops the first word of a non-empty context.
    fn shorten(&self, context: LmContextInfo) -> LmContextInfo {
        if context.order == 0 {
            LmContextInfo::EMPTY
        } else {
            LmContextInfo {
                offset: self
                    .values
                    .get_context_offset(context.offset, context.order as usize),
                order: context.order - 1,
            }
        }
    }
}

impl<M, C> NgramLanguageModel for ContextEncodedProbBackoffLm<M, C>
where
    M: NgramMap,
    C: ValueContainer<Value = ProbBackoffPair>,
{
    fn lm_order(&self) -> usize {
        self.map.max_order()
    }

    fn word_indexer(&self) -> &StringWordIndexer {
        &self.indexer
    }

    fn unknown_log_prob(&self) -> f32 {
        self.unknown_log_prob
    }

    fn score_sentence(&self, sentence: &[WordId]) -> f32 {
        score_sentence_context(self, sentence)
    }
}

impl<M, C> ContextEncodedNgramLm for ContextEncodedProbBackoffLm<M, C>
where
    M: NgramMap,
    C: ValueContainer<Value = ProbBackoffPair>,
{
    fn log_prob(&self, context: LmContextInfo, word: WordId) -> (f32, LmContextInfo) {
        let mut scratch = self.values.scratch_value();
        let mut backoff = 0.0f32;
        let mut context = context;
        loop {
            if let Some(offset) = self.map.child_offset(context, word) {
                let order = (context.order + 1) as usize;
                self.values.get_from_offset(offset, order, &mut scratch);
                return (backoff + scratch.prob, self.next_context(offset, order));
            }
            if context.is_empty() {
                return (self.unknown_log_prob, LmContextInfo::EMPTY);
            }
            self.values
                .get_from_offset(context.offset, context.order as usize, &mut scratch);
            backoff += scratch.backoff;
            context = self.shorten(context);
        }
    }
}
