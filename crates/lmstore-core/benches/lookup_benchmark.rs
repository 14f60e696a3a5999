//! Lookup benchmark across storage representations.
//!
//! Builds a synthetic trigram model and measures array-encoded lookups,
//! context-encoded sentence scoring, and the effect of the LRU cache.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lmstore_core::{
    ArrayEncodedCachingLm, ArrayEncodedNgramLm, LmBuilder, LmConfig, LmParts, NgramLanguageModel,
    ProbBackoffPair, ProbBackoffValues, StorageKind, WordId,
};

const VOCAB: u32 = 500;

/// Deterministic pseudo-random stream (xorshift).
fn next(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

fn pair(state: &mut u64) -> ProbBackoffPair {
    let r = next(state);
    ProbBackoffPair::new(
        -((r % 500) as f32) / 100.0,
        -(((r >> 32) % 100) as f32) / 100.0,
    )
}

fn build_model(kind: StorageKind) -> LmParts<ProbBackoffValues> {
    let mut config = LmConfig::default();
    config.storage.kind = kind;
    let mut builder = LmBuilder::from_config(&config, 3);
    let mut state = 0x9E37_79B9_7F4A_7C15u64;

    let mut bigrams = Vec::new();
    for w in 0..VOCAB {
        builder
            .add_phrase(&format!("w{w}"), &pair(&mut state))
            .expect("unigram");
    }
    for w in 0..VOCAB {
        for _ in 0..8 {
            let v = (next(&mut state) % u64::from(VOCAB)) as u32;
            if builder
                .add_phrase(&format!("w{w} w{v}"), &pair(&mut state))
                .expect("bigram")
            {
                bigrams.push((w, v));
            }
        }
    }
    bigrams.sort_unstable();
    bigrams.dedup();
    for &(w, v) in &bigrams {
        // Only extend bigrams whose suffix bigram (v, v) exists.
        if bigrams.binary_search(&(v, v)).is_ok() {
            builder
                .add_phrase(&format!("w{w} w{v} w{v}"), &pair(&mut state))
                .expect("trigram");
        }
    }
    builder.finish().expect("finish")
}

fn queries(lm: &impl NgramLanguageModel, count: usize) -> Vec<Vec<WordId>> {
    let mut state = 42u64;
    (0..count)
        .map(|_| {
            (0..3)
                .map(|_| {
                    let w = next(&mut state) % u64::from(VOCAB);
                    lm.word_indexer().index_of_possibly_unk(&format!("w{w}"))
                })
                .collect()
        })
        .collect()
}

fn bench_array_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_lookup");

    for kind in [
        StorageKind::Uncompressed,
        StorageKind::Quantized,
        StorageKind::Compressed,
    ] {
        let lm = build_model(kind).into_array_lm();
        let ngrams = queries(&lm, 1_000);

        let id = BenchmarkId::new("log_prob", format!("{kind:?}"));
        group.bench_with_input(id, &ngrams, |b, ngrams| {
            b.iter(|| {
                let mut total = 0.0f32;
                for ngram in ngrams {
                    total += lm.log_prob(black_box(ngram));
                }
                black_box(total)
            });
        });
    }

    group.finish();
}

fn bench_sentence_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("sentence_scoring");
    let sentences: Vec<String> = {
        let mut state = 7u64;
        (0..100)
            .map(|_| {
                (0..12)
                    .map(|_| format!("w{}", next(&mut state) % u64::from(VOCAB)))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    };

    for kind in [StorageKind::Uncompressed, StorageKind::Compressed] {
        let array = build_model(kind).into_array_lm();
        let context = build_model(kind).into_context_lm();

        group.bench_function(BenchmarkId::new("array", format!("{kind:?}")), |b| {
            b.iter(|| sentences.iter().map(|s| array.score_text(black_box(s))).sum::<f32>());
        });
        group.bench_function(BenchmarkId::new("context", format!("{kind:?}")), |b| {
            b.iter(|| sentences.iter().map(|s| context.score_text(black_box(s))).sum::<f32>());
        });
    }

    group.finish();
}

fn bench_cached_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_lookup");
    let lm = build_model(StorageKind::Compressed).into_array_lm();
    let ngrams = queries(&lm, 200);

    for capacity in [0usize, 64, 1024] {
        let cached = ArrayEncodedCachingLm::new(&lm, capacity);
        group.bench_with_input(BenchmarkId::new("capacity", capacity), &ngrams, |b, ngrams| {
            b.iter(|| {
                let mut total = 0.0f32;
                for ngram in ngrams {
                    total += cached.log_prob(black_box(ngram));
                }
                black_box(total)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_array_lookup,
    bench_sentence_scoring,
    bench_cached_lookup
);
criterion_main!(benches);
