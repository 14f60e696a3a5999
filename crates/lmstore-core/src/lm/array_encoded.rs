//! Stateless prob/backoff model.

use super::{score_sentence_array, ArrayEncodedNgramLm, NgramLanguageModel};
use crate::map::NgramMap;
use crate::types::WordId;
use crate::values::{ProbBackoffPair, ValueContainer};
use crate::word_indexer::StringWordIndexer;

/// Backoff model that resolves every query through the map.
#[derive(Debug, Clone)]
pub struct ArrayEncodedProbBackoffLm<M, C> {
    map: M,
    values: C,
    indexer: StringWordIndexer,
    unknown_log_prob: f32,
}

impl<M, C> ArrayEncodedProbBackoffLm<M, C>
where
    M: NgramMap,
    C: ValueContainer<Value = ProbBackoffPair>,
{
    /// Wraps a finalized map and container.
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

    fn value_of(&self, order: usize, key: &[WordId], out: &mut ProbBackoffPair) -> bool {
        match self.map.resolve(order, key) {
            Some(offset) => {
                self.values.get_from_offset(offset, order, out);
                true
            }
            None => false,
        }
    }
}

impl<M, C> NgramLanguageModel for ArrayEncodedProbBackoffLm<M, C>
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
        score_sentence_array(self, sentence)
    }
}

impl<M, C> ArrayEncodedNgramLm for ArrayEncodedProbBackoffLm<M, C>
where
    M: NgramMap,
    C: ValueContainer<Value = ProbBackoffPair>,
{
    fn log_prob(&self, ngram: &[WordId]) -> f32 {
        let key = &ngram[ngram.len().saturating_sub(self.map.max_order())..];
        if key.is_empty() {
            return self.unknown_log_prob;
        }
        let n = key.len();
        let mut scratch = self.values.scratch_value();

        // Longest stored suffix ending in the word.
        let Some((matched, prob)) = (0..n).find_map(|start| {
            self.value_of(n - 1 - start, &key[start..], &mut scratch)
                .then_some((start, scratch.prob))
        }) else {
            return self.unknown_log_prob;
        };

        // Backoff of every longer context that is stored.
        let mut score = prob;
        for start in 0..matched {
            if self.value_of(n - 2 - start, &key[start..n - 1], &mut scratch) {
                score += scratch.backoff;
            }
        }
        score
    }
}
