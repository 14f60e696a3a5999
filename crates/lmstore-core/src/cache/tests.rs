//! Tests for the LRU cache and the caching front-ends.

use super::*;
use crate::config::{CacheSection, StorageKind};
use crate::lm::tests::{ids, toy_parts};
use crate::lm::{ArrayEncodedNgramLm, ContextEncodedNgramLm, NgramLanguageModel};
use crate::types::LmContextInfo;

// ========== LRU Cache Basic Tests ==========

#[test]
fn test_lru_cache_new() {
    let cache: LruCache<u64, String> = LruCache::new(100);
    assert!(cache.is_empty());
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.capacity(), 100);
}

#[test]
fn test_lru_cache_insert_and_get() {
    let mut cache: LruCache<u64, String> = LruCache::new(100);

    cache.insert(1, "hello".to_string());

    assert_eq!(cache.get(&1), Some(&"hello".to_string()));
    assert_eq!(cache.get(&999), None);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_lru_cache_update_existing() {
    let mut cache: LruCache<u64, String> = LruCache::new(100);

    cache.insert(1, "hello".to_string());
    cache.insert(1, "world".to_string());

    assert_eq!(cache.get(&1), Some(&"world".to_string()));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().evictions, 0);
}

#[test]
fn test_lru_cache_evicts_least_recently_used() {
    let mut cache: LruCache<u64, u64> = LruCache::new(3);
    cache.insert(1, 10);
    cache.insert(2, 20);
    cache.insert(3, 30);

    // Touch 1 so that 2 becomes the oldest.
    assert_eq!(cache.get(&1), Some(&10));
    cache.insert(4, 40);

    assert_eq!(cache.peek(&2), None);
    assert_eq!(cache.peek(&1), Some(&10));
    assert_eq!(cache.peek(&3), Some(&30));
    assert_eq!(cache.peek(&4), Some(&40));
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn test_lru_cache_long_eviction_sequence() {
    let mut cache: LruCache<u64, u64> = LruCache::new(8);

    for i in 0..1000u64 {
        cache.insert(i, i * 2);
    }

    assert_eq!(cache.len(), 8);
    for i in 992..1000u64 {
        assert_eq!(cache.peek(&i), Some(&(i * 2)));
    }
    assert_eq!(cache.peek(&991), None);
    assert_eq!(cache.stats().evictions, 992);
}

#[test]
fn test_lru_cache_capacity_one() {
    let mut cache: LruCache<u64, u64> = LruCache::new(1);
    cache.insert(1, 1);
    cache.insert(2, 2);

    assert_eq!(cache.get(&1), None);
    assert_eq!(cache.get(&2), Some(&2));
}

#[test]
fn test_lru_cache_zero_capacity_stores_nothing() {
    let mut cache: LruCache<u64, u64> = LruCache::new(0);

    cache.insert(1, 1);

    assert!(cache.is_empty());
    assert_eq!(cache.get(&1), None);
}

#[test]
fn test_lru_cache_stats_and_hit_rate() {
    let mut cache: LruCache<u64, u64> = LruCache::new(10);
    cache.insert(1, 1);

    let _ = cache.get(&1);
    let _ = cache.get(&1);
    let _ = cache.get(&2);
    let stats = cache.stats();

    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    assert!((CacheStats::default().hit_rate()).abs() < f64::EPSILON);
}

#[test]
fn test_lru_cache_rejected_match_is_a_miss() {
    let mut cache: LruCache<u64, u64> = LruCache::new(10);
    cache.insert(1, 7);

    assert_eq!(cache.get_matching(&1, |v| *v == 8), None);
    assert_eq!(cache.get_matching(&1, |v| *v == 7), Some(&7));
    assert_eq!(cache.stats().misses, 1);
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn test_lru_cache_clear_keeps_stats() {
    let mut cache: LruCache<u64, u64> = LruCache::new(10);
    cache.insert(1, 1);
    let _ = cache.get(&1);

    cache.clear();

    assert!(cache.is_empty());
    assert_eq!(cache.stats().hits, 1);
    cache.insert(2, 2);
    assert_eq!(cache.get(&2), Some(&2));
}

// ========== Array-encoded caching ==========

const NGRAMS: [&str; 5] = ["the cat", "<s> the cat", "dog cat", "the dog sat", "cat sat </s>"];

#[test]
fn test_array_cache_is_transparent() {
    for kind in [StorageKind::Uncompressed, StorageKind::Compressed] {
        let plain = toy_parts(kind).into_array_lm();
        let cached = ArrayEncodedCachingLm::new(toy_parts(kind).into_array_lm(), 16);

        for _ in 0..3 {
            for text in NGRAMS {
                let ngram = ids(&plain, text);
                assert_eq!(
                    cached.log_prob(&ngram).to_bits(),
                    plain.log_prob(&ngram).to_bits()
                );
            }
        }

        let stats = cached.cache_stats();
        assert_eq!(stats.misses, 5);
        assert_eq!(stats.hits, 10);
    }
}

#[test]
fn test_array_cache_recomputes_after_eviction() {
    let plain = toy_parts(StorageKind::Uncompressed).into_array_lm();
    let cached =
        ArrayEncodedCachingLm::new(toy_parts(StorageKind::Uncompressed).into_array_lm(), 3);
    let queries: Vec<_> = NGRAMS[..4].iter().map(|t| ids(&plain, t)).collect();

    for q in &queries {
        let _ = cached.log_prob(q);
    }
    let before = cached.cache_stats();
    let again = cached.log_prob(&queries[0]);
    let after = cached.cache_stats();

    assert_eq!(before.evictions, 1);
    assert_eq!(after.misses, before.misses + 1);
    assert_eq!(after.hits, before.hits);
    assert_eq!(again.to_bits(), plain.log_prob(&queries[0]).to_bits());
}

#[test]
fn test_array_cache_keys_on_effective_ngram() {
    let cached =
        ArrayEncodedCachingLm::new(toy_parts(StorageKind::Uncompressed).into_array_lm(), 8);
    let long = ids(cached.inner(), "dog dog the cat sat");
    let short = ids(cached.inner(), "the cat sat");

    let a = cached.log_prob(&long);
    let b = cached.log_prob(&short);

    assert_eq!(a.to_bits(), b.to_bits());
    assert_eq!(cached.cache_stats().hits, 1);
}

#[test]
fn test_zero_capacity_disables_caching() {
    let plain = toy_parts(StorageKind::Uncompressed).into_array_lm();
    let config = CacheSection { capacity: 0 };
    let cached = ArrayEncodedCachingLm::from_config(
        toy_parts(StorageKind::Uncompressed).into_array_lm(),
        &config,
    );

    for text in NGRAMS {
        let ngram = ids(&plain, text);
        assert_eq!(cached.log_prob(&ngram), plain.log_prob(&ngram));
    }

    assert_eq!(cached.cache_stats(), CacheStats::default());
}

#[test]
fn test_array_cache_sentence_scores_match() {
    let plain = toy_parts(StorageKind::Quantized).into_array_lm();
    let cached = ArrayEncodedCachingLm::new(&plain, 4);

    for text in ["the cat sat", "the dog sat", "", "zebra cat sat the"] {
        assert_eq!(
            cached.score_text(text).to_bits(),
            plain.score_text(text).to_bits()
        );
    }
    cached.clear_cache();
    assert!(cached.cache_stats().misses > 0);
}

// ========== Context-encoded caching ==========

#[test]
fn test_context_cache_is_transparent() {
    let plain = toy_parts(StorageKind::Compressed).into_context_lm();
    let cached = ContextEncodedCachingLm::new(&plain, 32);

    for _ in 0..2 {
        for text in ["the cat sat", "dog cat", "the zebra cat"] {
            assert_eq!(
                cached.score_text(text).to_bits(),
                plain.score_text(text).to_bits()
            );
        }
    }

    assert!(cached.cache_stats().hits > 0);
}

#[test]
fn test_context_cache_recomputes_after_eviction() {
    let plain = toy_parts(StorageKind::Uncompressed).into_context_lm();
    let cached = ContextEncodedCachingLm::new(&plain, 2);
    let w = ids(&plain, "the cat sat");

    let first = cached.log_prob(LmContextInfo::EMPTY, w[0]);
    let _ = cached.log_prob(LmContextInfo::EMPTY, w[1]);
    let _ = cached.log_prob(LmContextInfo::EMPTY, w[2]);
    let before = cached.cache_stats();
    let again = cached.log_prob(LmContextInfo::EMPTY, w[0]);
    let after = cached.cache_stats();

    assert_eq!(before.evictions, 1);
    assert_eq!(after.misses, before.misses + 1);
    assert_eq!(again.0.to_bits(), first.0.to_bits());
    assert_eq!(again.1, first.1);
}

#[test]
fn test_per_thread_wrappers_share_one_model() {
    let model = toy_parts(StorageKind::Compressed).into_context_lm();
    let expected = model.score_text("the cat sat");

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let cached = ContextEncodedCachingLm::new(&model, 64);
                for _ in 0..10 {
                    assert_eq!(cached.score_text("the cat sat").to_bits(), expected.to_bits());
                }
            });
        }
    });
}
