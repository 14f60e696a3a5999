//! Tests for the query front-ends.

use super::*;
use crate::builder::{LmBuilder, LmParts};
use crate::config::{LmConfig, StorageKind};
use crate::map::NgramMap;
use crate::values::{ProbBackoffPair, ProbBackoffValues};
use proptest::prelude::*;

const KINDS: [StorageKind; 3] = [
    StorageKind::Uncompressed,
    StorageKind::Quantized,
    StorageKind::Compressed,
];

/// A trigram model over {the, cat, sat, dog}.
const TOY: &[(&str, f32, f32)] = &[
    ("<s>", -99.0, -0.5),
    ("</s>", -1.0, 0.0),
    ("the", -1.2, -0.4),
    ("cat", -1.5, -0.3),
    ("sat", -1.7, -0.2),
    ("dog", -2.0, -0.1),
    ("<s> the", -0.3, -0.25),
    ("the cat", -0.5, -0.15),
    ("cat sat", -0.6, -0.1),
    ("sat </s>", -0.4, 0.0),
    ("<s> the cat", -0.2, 0.0),
    ("the cat sat", -0.25, 0.0),
];

pub(crate) fn toy_parts(kind: StorageKind) -> LmParts<ProbBackoffValues> {
    let mut config = LmConfig::default();
    config.storage.kind = kind;
    config.storage.block_size = 2;
    let mut builder = LmBuilder::from_config(&config, 3);
    for &(phrase, prob, backoff) in TOY {
        builder
            .add_phrase(phrase, &ProbBackoffPair::new(prob, backoff))
            .expect("add");
    }
    builder.finish().expect("finish")
}

pub(crate) fn ids(lm: &(impl NgramLanguageModel + ?Sized), text: &str) -> Vec<WordId> {
    text.split_whitespace()
        .map(|w| lm.word_indexer().index_of_possibly_unk(w))
        .collect()
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {expected}, got {actual}"
    );
}

// ========== Array-encoded ==========

#[test]
fn test_array_full_match_uses_stored_prob() {
    for kind in KINDS {
        let lm = toy_parts(kind).into_array_lm();

        assert_close(lm.log_prob(&ids(&lm, "the cat")), -0.5);
        assert_close(lm.log_prob(&ids(&lm, "<s> the cat")), -0.2);
    }
}

#[test]
fn test_array_backs_off_to_shorter_suffix() {
    for kind in KINDS {
        let lm = toy_parts(kind).into_array_lm();

        // cat | dog: no bigram, unigram plus the backoff of "dog".
        assert_close(lm.log_prob(&ids(&lm, "dog cat")), -1.5 - 0.1);
        // </s> | cat sat: bigram "sat </s>" plus the backoff of "cat sat".
        assert_close(lm.log_prob(&ids(&lm, "cat sat </s>")), -0.4 - 0.1);
        // sat | the dog: context "the dog" is not stored, so only "dog" backs off.
        assert_close(lm.log_prob(&ids(&lm, "the dog sat")), -1.7 - 0.1);
    }
}

#[test]
fn test_array_uses_only_last_order_words() {
    let lm = toy_parts(StorageKind::Uncompressed).into_array_lm();

    assert_close(
        lm.log_prob(&ids(&lm, "dog dog the cat sat")),
        lm.log_prob(&ids(&lm, "the cat sat")),
    );
}

#[test]
fn test_array_unknown_word_scores_configured_constant() {
    let lm = toy_parts(StorageKind::Compressed).into_array_lm();

    assert_eq!(lm.log_prob(&ids(&lm, "the zebra")), -100.0);
    assert_eq!(lm.log_prob(&[WordId(999)]), -100.0);
    assert_eq!(lm.log_prob(&[]), -100.0);
}

#[test]
fn test_array_sentence_score() {
    for kind in KINDS {
        let lm = toy_parts(kind).into_array_lm();

        // the|<s> + cat|<s> the + sat|the cat + </s>|cat sat
        let expected = -0.3 - 0.2 - 0.25 + (-0.4 - 0.1);
        assert_close(lm.score_sentence(&ids(&lm, "the cat sat")), expected);
        assert_close(lm.score_text("the cat sat"), expected);
    }
}

// ========== Context-encoded ==========

#[test]
fn test_context_threads_longest_match() {
    let lm = toy_parts(StorageKind::Uncompressed).into_context_lm();
    let w = ids(&lm, "<s> the cat sat");

    let (_, ctx) = lm.log_prob(LmContextInfo::EMPTY, w[0]);
    assert_eq!(ctx.order, 0);
    let (score, ctx) = lm.log_prob(ctx, w[1]);
    assert_close(score, -0.3);
    assert_eq!(ctx.order, 1);
    let (score, ctx) = lm.log_prob(ctx, w[2]);
    assert_close(score, -0.2);
    // A trigram match continues from its suffix "the cat".
    assert_eq!(ctx.order, 1);
    assert_eq!(Some(ctx.offset), lm.map().resolve(1, &w[1..3]));
    let (score, _) = lm.log_prob(ctx, w[3]);
    assert_close(score, -0.25);
}

#[test]
fn test_context_unknown_word_resets_context() {
    for kind in KINDS {
        let lm = toy_parts(kind).into_context_lm();
        let w = ids(&lm, "the zebra cat");

        let (_, ctx) = lm.log_prob(LmContextInfo::EMPTY, w[0]);
        let (score, ctx) = lm.log_prob(ctx, w[1]);

        assert_eq!(score, -100.0);
        assert!(ctx.is_empty());
        let (score, _) = lm.log_prob(ctx, w[2]);
        assert_close(score, -1.5);
    }
}

#[test]
fn test_context_sentence_score() {
    for kind in KINDS {
        let lm = toy_parts(kind).into_context_lm();

        let expected = -0.3 - 0.2 - 0.25 + (-0.4 - 0.1);
        assert_close(lm.score_sentence(&ids(&lm, "the cat sat")), expected);
    }
}

#[test]
fn test_score_text_maps_unseen_words_to_unk() {
    let lm = toy_parts(StorageKind::Uncompressed).into_context_lm();

    // "zebra" becomes <unk>, which has no unigram.
    let with_unknown = lm.score_text("the zebra");
    let the = -0.3;
    let end_after_unk = -1.0;

    assert_close(with_unknown, the - 100.0 + end_after_unk);
}

// ========== Agreement ==========

fn sentence_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(
        prop::sample::select(vec!["the", "cat", "sat", "dog", "zebra", "</s>", "<s>"]),
        0..12,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_array_and_context_scores_agree(words in sentence_strategy()) {
        for kind in KINDS {
            let parts = toy_parts(kind);
            let array = parts.clone().into_array_lm();
            let context = parts.into_context_lm();
            let text = words.join(" ");

            let a = array.score_text(&text);
            let c = context.score_text(&text);

            prop_assert!((a - c).abs() < 1e-4, "{kind:?} {text:?}: array {a}, context {c}");
        }
    }
}
