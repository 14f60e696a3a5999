//! Caching decorators for the query front-ends.

use super::lru::{CacheStats, LruCache};
use crate::config::CacheSection;
use crate::lm::{
    score_sentence_array, score_sentence_context, ArrayEncodedNgramLm, ContextEncodedNgramLm,
    NgramLanguageModel,
};
use crate::types::{LmContextInfo, WordId};
use crate::word_indexer::StringWordIndexer;
use rustc_hash::FxHasher;
use std::cell::RefCell;
use std::hash::{Hash, Hasher};

fn fingerprint(ngram: &[WordId]) -> u64 {
    let mut hasher = FxHasher::default();
    ngram.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone)]
struct CachedNgram {
    ngram: Box<[WordId]>,
    score: f32,
}

/// [`ArrayEncodedNgramLm`] with an LRU cache of scores.
///
/// Entries are keyed by a hash of the n-gram and store the n-gram itself, so a
/// fingerprint collision is a miss, never a wrong score. The cache sits in a
/// `RefCell`: the wrapper is `!Sync`, use one per thread.
#[derive(Debug)]
pub struct ArrayEncodedCachingLm<L> {
    inner: L,
    cache: Option<RefCell<LruCache<u64, CachedNgram>>>,
}

impl<L: ArrayEncodedNgramLm> ArrayEncodedCachingLm<L> {
    /// Wraps `inner` with room for `capacity` scores; 0 disables caching.
    #[must_use]
    pub fn new(inner: L, capacity: usize) -> Self {
        let cache = (capacity > 0).then(|| RefCell::new(LruCache::new(capacity)));
        Self { inner, cache }
    }

    /// Wraps `inner` with the configured capacity.
    #[must_use]
    pub fn from_config(inner: L, config: &CacheSection) -> Self {
        Self::new(inner, config.capacity)
    }

    /// The wrapped model.
    #[must_use]
    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Unwraps the model, dropping the cache.
    #[must_use]
    pub fn into_inner(self) -> L {
        self.inner
    }

    /// Hit, miss and eviction counts (all zero when caching is disabled).
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache
            .as_ref()
            .map_or_else(CacheStats::default, |c| c.borrow().stats())
    }

    /// Drops every cached score.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.borrow_mut().clear();
        }
    }
}

impl<L: ArrayEncodedNgramLm> NgramLanguageModel for ArrayEncodedCachingLm<L> {
    fn lm_order(&self) -> usize {
        self.inner.lm_order()
    }

    fn word_indexer(&self) -> &StringWordIndexer {
        self.inner.word_indexer()
    }

    fn unknown_log_prob(&self) -> f32 {
        self.inner.unknown_log_prob()
    }

    fn score_sentence(&self, sentence: &[WordId]) -> f32 {
        score_sentence_array(self, sentence)
    }
}

impl<L: ArrayEncodedNgramLm> ArrayEncodedNgramLm for ArrayEncodedCachingLm<L> {
    fn log_prob(&self, ngram: &[WordId]) -> f32 {
        let Some(cache) = &self.cache else {
            return self.inner.log_prob(ngram);
        };
        // Words beyond the model order never change the score.
        let key = &ngram[ngram.len().saturating_sub(self.inner.lm_order())..];
        let fp = fingerprint(key);
        if let Some(hit) = cache
            .borrow_mut()
            .get_matching(&fp, |e| *e.ngram == *key)
        {
            return hit.score;
        }
        let score = self.inner.log_prob(key);
        cache.borrow_mut().insert(
            fp,
            CachedNgram {
                ngram: key.into(),
                score,
            },
        );
        score
    }
}

/// [`ContextEncodedNgramLm`] with an LRU cache keyed by `(context, word)`.
///
/// The cache sits in a `RefCell`: the wrapper is `!Sync`, use one per thread.
#[derive(Debug)]
pub struct ContextEncodedCachingLm<L> {
    inner: L,
    cache: Option<RefCell<LruCache<(LmContextInfo, WordId), (f32, LmContextInfo)>>>,
}

impl<L: ContextEncodedNgramLm> ContextEncodedCachingLm<L> {
    /// Wraps `inner` with room for `capacity` scores; 0 disables caching.
    #[must_use]
    pub fn new(inner: L, capacity: usize) -> Self {
        let cache = (capacity > 0).then(|| RefCell::new(LruCache::new(capacity)));
        Self { inner, cache }
    }

    /// Wraps `inner` with the configured capacity.
    #[must_use]
    pub fn from_config(inner: L, config: &CacheSection) -> Self {
        Self::new(inner, config.capacity)
    }

    /// The wrapped model.
    #[must_use]
    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Unwraps the model, dropping the cache.
    #[must_use]
    pub fn into_inner(self) -> L {
        self.inner
    }

    /// Hit, miss and eviction counts (all zero when caching is disabled).
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache
            .as_ref()
            .map_or_else(CacheStats::default, |c| c.borrow().stats())
    }

    /// Drops every cached score.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.borrow_mut().clear();
        }
    }
}

impl<L: ContextEncodedNgramLm> NgramLanguageModel for ContextEncodedCachingLm<L> {
    fn lm_order(&self) -> usize {
        self.inner.lm_order()
    }

    fn word_indexer(&self) -> &StringWordIndexer {
        self.inner.word_indexer()
    }

    fn unknown_log_prob(&self) -> f32 {
        self.inner.unknown_log_prob()
    }

    fn score_sentence(&self, sentence: &[WordId]) -> f32 {
        score_sentence_context(self, sentence)
    }
}

impl<L: ContextEncodedNgramLm> ContextEncodedNgramLm for ContextEncodedCachingLm<L> {
    fn log_prob(&self, context: LmContextInfo, word: WordId) -> (f32, LmContextInfo) {
        let Some(cache) = &self.cache else {
            return self.inner.log_prob(context, word);
        };
        let key = (context, word);
        if let Some(&hit) = cache.borrow_mut().get(&key) {
            return hit;
        }
        let result = self.inner.log_prob(context, word);
        cache.borrow_mut().insert(key, result);
        result
    }
}
