//! Tests for builder module

#[cfg(test)]
mod tests {
    use crate::builder::LmBuilder;
    use crate::config::{LmConfig, StorageKind};
    use crate::error::Error;
    use crate::lm::{ArrayEncodedNgramLm, NgramLanguageModel};
    use crate::map::NgramMap;
    use crate::types::{Offset, WordId};
    use crate::values::{CountValues, ProbBackoffPair, ProbBackoffValues, ValueContainer};

    fn pair(prob: f32, backoff: f32) -> ProbBackoffPair {
        ProbBackoffPair::new(prob, backoff)
    }

    fn config(kind: StorageKind) -> LmConfig {
        let mut config = LmConfig::default();
        config.storage.kind = kind;
        config
    }

    #[test]
    fn test_builder_assigns_offsets_and_payloads() {
        // Arrange
        let mut builder = LmBuilder::from_config(&config(StorageKind::Uncompressed), 2);

        // Act
        builder.add_phrase("a", &pair(-1.0, -0.1)).expect("add");
        builder.add_phrase("b", &pair(-2.0, -0.2)).expect("add");
        builder.add_phrase("a b", &pair(-0.5, 0.0)).expect("add");
        let parts = builder.finish().expect("finish");

        // Assert
        let b = parts.indexer.index_of("b").expect("indexed");
        let offset = parts.map.resolve(0, &[b]).expect("unigram");
        let mut out = parts.values.scratch_value();
        parts.values.get_from_offset(offset, 0, &mut out);
        assert_eq!(out, pair(-2.0, -0.2));
        assert_eq!(parts.map.num_ngrams(0), 2);
        assert_eq!(parts.map.num_ngrams(1), 1);
        assert_eq!(parts.values.size(0), 2);
    }

    #[test]
    fn test_builder_skips_orders_above_max() {
        let mut config = config(StorageKind::Uncompressed);
        config.lm.max_order = Some(2);
        let mut builder = LmBuilder::from_config(&config, 3);

        builder.add_phrase("a", &pair(-1.0, 0.0)).expect("add");
        builder.add_phrase("a a", &pair(-1.0, 0.0)).expect("add");
        let kept = builder.add_phrase("a a a", &pair(-1.0, 0.0)).expect("add");

        assert!(!kept);
        assert_eq!(builder.skipped(), 1);
        let lm = builder.finish().expect("finish").into_array_lm();
        assert_eq!(lm.lm_order(), 2);
    }

    #[test]
    fn test_builder_rejects_lower_order_after_higher() {
        let mut builder = LmBuilder::from_config(&config(StorageKind::Compressed), 2);
        builder.add_phrase("a", &pair(-1.0, 0.0)).expect("add");
        builder.add_phrase("a a", &pair(-1.0, 0.0)).expect("add");

        let err = builder.add_phrase("b", &pair(-1.0, 0.0)).expect_err("order");

        assert!(matches!(err, Error::BuildOrder { current: 1, got: 0 }));
    }

    #[test]
    fn test_builder_requires_context_ngrams() {
        let mut builder = LmBuilder::from_config(&config(StorageKind::Uncompressed), 2);
        builder.add_phrase("a", &pair(-1.0, 0.0)).expect("add");

        let err = builder.add_phrase("a b", &pair(-1.0, 0.0)).expect_err("missing");

        assert!(matches!(err, Error::MissingContext { order: 1, .. }));
    }

    #[test]
    fn test_builder_rejects_empty_ngram() {
        let mut builder = LmBuilder::from_config(&config(StorageKind::Uncompressed), 2);

        let err = builder.add_ngram(&[], &pair(0.0, 0.0)).expect_err("empty");

        assert!(matches!(err, Error::InvalidOrder { .. }));
    }

    #[test]
    fn test_builder_grows_past_initial_capacity() {
        let mut builder = LmBuilder::from_config(&config(StorageKind::Quantized), 1);
        for i in 0..500u32 {
            builder
                .add_phrase(&format!("w{i}"), &pair(-(i as f32) / 100.0, 0.0))
                .expect("add");
        }

        let lm = builder.finish().expect("finish").into_array_lm();

        assert_eq!(lm.values().size(0), 500);
        let w = lm.word_indexer().index_of("w250").expect("indexed");
        assert!((lm.log_prob(&[w]) + 2.5).abs() < 0.05);
    }

    #[test]
    fn test_builder_repeat_ngram_overwrites_prob() {
        let mut builder = LmBuilder::from_config(&config(StorageKind::Compressed), 1);
        builder.add_phrase("a", &pair(-1.0, 0.0)).expect("add");
        builder.add_phrase("a", &pair(-3.0, 0.0)).expect("add");

        let lm = builder.finish().expect("finish").into_array_lm();
        let a = lm.word_indexer().index_of("a").expect("indexed");

        assert_eq!(lm.log_prob(&[a]), -3.0);
    }

    #[test]
    fn test_builder_compresses_every_order() {
        let mut builder = LmBuilder::from_config(&config(StorageKind::Compressed), 2);
        builder.add_phrase("a", &pair(-1.0, -0.5)).expect("add");
        builder.add_phrase("a a", &pair(-0.5, 0.0)).expect("add");

        let parts = builder.finish().expect("finish");

        match &parts.values {
            ProbBackoffValues::Compressed(values) => {
                assert!(values.is_compressed(0));
                assert!(values.is_compressed(1));
            }
            other => panic!("unexpected representation {:?}", other.kind()),
        }
    }

    #[test]
    fn test_builder_with_count_values_accumulates() {
        let mut builder = LmBuilder::new(2, CountValues::new(2, false));
        builder.add_phrase("a", &3).expect("add");
        builder.add_phrase("b", &1).expect("add");
        builder.add_phrase("a", &4).expect("add");
        builder.add_phrase("a b", &2).expect("add");

        let parts = builder.finish().expect("finish");
        let a = parts.indexer.index_of("a").expect("indexed");
        let offset = parts.map.resolve(0, &[a]).expect("unigram");
        let mut count = 0u64;
        parts.values.get_from_offset(offset, 0, &mut count);

        assert_eq!(count, 7);
        assert_eq!(parts.values.total(0), 8);
        assert_eq!(parts.values.size(1), 1);
    }

    #[test]
    fn test_builder_unknown_log_prob_from_config() {
        let mut config = config(StorageKind::Uncompressed);
        config.lm.unknown_word_log_prob = -42.0;
        let mut builder = LmBuilder::from_config(&config, 1);
        builder.add_phrase("a", &pair(-1.0, 0.0)).expect("add");

        let lm = builder.finish().expect("finish").into_array_lm();

        assert_eq!(lm.unknown_log_prob(), -42.0);
        assert_eq!(lm.log_prob(&[WordId(77)]), -42.0);
    }

    #[test]
    fn test_builder_empty_model_finishes() {
        let builder = LmBuilder::from_config(&config(StorageKind::Compressed), 3);

        let parts = builder.finish().expect("finish");

        assert_eq!(parts.values.size(0), 0);
        assert_eq!(parts.map.resolve(0, &[WordId(0)]), None::<Offset>);
    }

    mod finalization_events {
        use super::*;
        use std::sync::{Arc, Mutex};
        use tracing::field::{Field, Visit};
        use tracing::{Event, Subscriber};
        use tracing_subscriber::layer::{Context, SubscriberExt};
        use tracing_subscriber::Layer;

        #[derive(Default)]
        struct EventFields {
            message: String,
            order: Option<u64>,
        }

        impl Visit for EventFields {
            fn record_u64(&mut self, field: &Field, value: u64) {
                if field.name() == "order" {
                    self.order = Some(value);
                }
            }

            fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.message = format!("{value:?}");
                }
            }
        }

        /// Collects the order of every "Finalized order" event.
        #[derive(Clone, Default)]
        struct FinalizedOrders(Arc<Mutex<Vec<u64>>>);

        impl<S: Subscriber> Layer<S> for FinalizedOrders {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                let mut fields = EventFields::default();
                event.record(&mut fields);
                if let (true, Some(order)) = (fields.message == "Finalized order", fields.order) {
                    self.0.lock().expect("lock").push(order);
                }
            }
        }

        #[test]
        fn test_builder_logs_each_finalized_order() {
            // Arrange
            let recorder = FinalizedOrders::default();
            let subscriber = tracing_subscriber::registry().with(recorder.clone());

            // Act
            tracing::subscriber::with_default(subscriber, || {
                let mut builder = LmBuilder::from_config(&config(StorageKind::Compressed), 3);
                builder.add_phrase("a", &pair(-1.0, -0.1)).expect("add");
                builder.add_phrase("a a", &pair(-0.5, 0.0)).expect("add");
                let _parts = builder.finish().expect("finish");
            });

            // Assert
            assert_eq!(*recorder.0.lock().expect("lock"), vec![0, 1, 2]);
        }
    }
}
