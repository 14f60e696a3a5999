//! # `lmstore` Core
//!
//! Compact value storage and lookup for large n-gram language models.
//!
//! An n-gram model is split in two: a map that owns the keys and hands out one
//! offset per (order, n-gram), and a value container that owns the payloads
//! stored at those offsets. This crate provides the containers, the bit codec
//! they pack into, two query front-ends and an LRU cache in front of them.
//!
//! ## Features
//!
//! - **Three representations**: raw `f32`, codebook-quantized, and lossless
//!   rank-coded compression with Elias-gamma codes
//! - **Suffix links**: every stored n-gram can point at its context's suffix,
//!   which is what incremental (context-encoded) lookup walks
//! - **Two query protocols**: full n-gram (array-encoded) or threaded context
//!   token (context-encoded), scoring identically
//! - **Caching**: per-thread LRU wrappers with hit/miss statistics
//! - **Persistence**: versioned binary blobs of compressed orders
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lmstore_core::{LmBuilder, LmConfig, NgramLanguageModel, ProbBackoffPair};
//!
//! let config = LmConfig::load()?;
//! let mut builder = LmBuilder::from_config(&config, 3);
//! builder.add_phrase("the", &ProbBackoffPair::new(-1.2, -0.4))?;
//! builder.add_phrase("cat", &ProbBackoffPair::new(-1.5, -0.3))?;
//! builder.add_phrase("the cat", &ProbBackoffPair::new(-0.5, -0.1))?;
//!
//! let lm = builder.finish()?.into_context_lm();
//! let score = lm.score_text("the cat");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::float_cmp)]

pub mod bits;
pub mod builder;
#[cfg(test)]
mod builder_tests;
pub mod cache;
pub mod config;
#[cfg(test)]
mod config_tests;
pub mod error;
#[cfg(test)]
mod error_tests;
pub mod lm;
pub mod map;
pub mod types;
pub mod values;
pub mod word_indexer;

pub use bits::{BitList, BitReader};
pub use builder::{LmBuilder, LmParts};
pub use cache::{ArrayEncodedCachingLm, CacheStats, ContextEncodedCachingLm, LruCache};
pub use config::{CacheSection, ConfigError, LmConfig, LmSection, StorageKind, StorageSection};
pub use error::{Error, Result};
pub use lm::{
    ArrayEncodedNgramLm, ArrayEncodedProbBackoffLm, ContextEncodedNgramLm,
    ContextEncodedProbBackoffLm, NgramLanguageModel,
};
pub use map::{HashNgramMap, NgramMap};
pub use types::{ContextOffset, LmContextInfo, Offset, SuffixOffset, WordId};
pub use values::{
    CompressedProbBackoffValues, CompressionStats, CountValues, NgramEntry, PersistedValues,
    ProbBackoffPair, ProbBackoffValues, QuantizedProbBackoffValues, UncompressedProbBackoffValues,
    ValueContainer,
};
pub use word_indexer::{StringWordIndexer, WordIndexer};
