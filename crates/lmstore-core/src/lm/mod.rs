//! Query front-ends.
//!
//! Two lookup protocols over the same map and container:
//!
//! - [`ArrayEncodedNgramLm`]: the caller passes the whole n-gram and every
//!   call resolves it through the map again.
//! - [`ContextEncodedNgramLm`]: the caller threads an [`LmContextInfo`] from
//!   one word to the next, so each call extends an already matched context
//!   with a single probe.
//!
//! Both score in the log10 domain with standard backoff: the longest stored
//! n-gram ending in the word supplies the probability, and the backoff weight
//! of every longer stored context is added to it. A word with no unigram
//! scores exactly the configured unknown-word log-probability.

mod array_encoded;
mod context_encoded;

pub use array_encoded::ArrayEncodedProbBackoffLm;
pub use context_encoded::ContextEncodedProbBackoffLm;

use crate::types::{LmContextInfo, WordId};
use crate::word_indexer::StringWordIndexer;

/// Surface shared by every language model.
pub trait NgramLanguageModel {
    /// Number of orders (3 for a trigram model).
    fn lm_order(&self) -> usize;

    /// Vocabulary the model was built with.
    fn word_indexer(&self) -> &StringWordIndexer;

    /// Log10 probability assigned to words the model has never seen.
    fn unknown_log_prob(&self) -> f32;

    /// Total log10 probability of `sentence`, wrapped in `<s>` ... `</s>`.
    ///
    /// The start symbol is conditioned on but not scored.
    fn score_sentence(&self, sentence: &[WordId]) -> f32;

    /// Scores a whitespace-separated sentence, mapping unseen words to `<unk>`.
    fn score_text(&self, text: &str) -> f32 {
        let indexer = self.word_indexer();
        let ids: Vec<WordId> = text
            .split_whitespace()
            .map(|w| indexer.index_of_possibly_unk(w))
            .collect();
        self.score_sentence(&ids)
    }
}

/// Stateless lookup by full n-gram.
pub trait ArrayEncodedNgramLm: NgramLanguageModel {
    /// Log10 probability of the last word of `ngram` given the words before it.
    ///
    /// Only the last [`NgramLanguageModel::lm_order`] words are considered.
    fn log_prob(&self, ngram: &[WordId]) -> f32;
}

/// Incremental lookup by context token.
pub trait ContextEncodedNgramLm: NgramLanguageModel {
    /// Log10 probability of `word` after `context`, and the context to pass
    /// with the next word.
    fn log_prob(&self, context: LmContextInfo, word: WordId) -> (f32, LmContextInfo);
}

impl<T: NgramLanguageModel + ?Sized> NgramLanguageModel for &T {
    fn lm_order(&self) -> usize {
        (**self).lm_order()
    }

    fn word_indexer(&self) -> &StringWordIndexer {
        (**self).word_indexer()
    }

    fn unknown_log_prob(&self) -> f32 {
        (**self).unknown_log_prob()
    }

    fn score_sentence(&self, sentence: &[WordId]) -> f32 {
        (**self).score_sentence(sentence)
    }
}

impl<T: ArrayEncodedNgramLm + ?Sized> ArrayEncodedNgramLm for &T {
    fn log_prob(&self, ngram: &[WordId]) -> f32 {
        ArrayEncodedNgramLm::log_prob(*self, ngram)
    }
}

impl<T: ContextEncodedNgramLm + ?Sized> ContextEncodedNgramLm for &T {
    fn log_prob(&self, context: LmContextInfo, word: WordId) -> (f32, LmContextInfo) {
        ContextEncodedNgramLm::log_prob(*self, context, word)
    }
}

fn with_sentence_markers(
    lm: &(impl NgramLanguageModel + ?Sized),
    sentence: &[WordId],
) -> Vec<WordId> {
    let indexer = lm.word_indexer();
    let mut sent = Vec::with_capacity(sentence.len() + 2);
    sent.push(indexer.start_id());
    sent.extend_from_slice(sentence);
    sent.push(indexer.end_id());
    sent
}

/// Sentence score through [`ArrayEncodedNgramLm::log_prob`].
///
/// The first words are scored with every available prefix, then one window
/// of `lm_order` words per remaining position.
pub fn score_sentence_array<L>(lm: &L, sentence: &[WordId]) -> f32
where
    L: ArrayEncodedNgramLm + ?Sized,
{
    let sent = with_sentence_markers(lm, sentence);
    let order = lm.lm_order().max(1);
    let mut score = 0.0f32;
    for end in 2..=order.min(sent.len()) {
        score += lm.log_prob(&sent[..end]);
    }
    for start in 1..=sent.len().saturating_sub(order) {
        score += lm.log_prob(&sent[start..start + order]);
    }
    score
}

/// Sentence score through [`ContextEncodedNgramLm::log_prob`].
pub fn score_sentence_context<L>(lm: &L, sentence: &[WordId]) -> f32
where
    L: ContextEncodedNgramLm + ?Sized,
{
    let sent = with_sentence_markers(lm, sentence);
    let (_, mut context) = lm.log_prob(LmContextInfo::EMPTY, sent[0]);
    let mut score = 0.0f32;
    for &word in &sent[1..] {
        let (word_score, next) = lm.log_prob(context, word);
        score += word_score;
        context = next;
    }
    score
}

#[cfg(test)]
pub(crate) mod tests;
