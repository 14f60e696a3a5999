//! Query-time caching.
//!
//! [`LruCache`] is a fixed-capacity least-recently-used map with hit, miss and
//! eviction counters. [`ArrayEncodedCachingLm`] and [`ContextEncodedCachingLm`]
//! put one in front of a query front-end: a hit answers without touching the
//! map or the value container, a miss asks the wrapped model and remembers the
//! answer. Scores are bit-identical to the uncached model.
//!
//! # Thread-Safety
//!
//! The wrappers keep their cache in a `RefCell`, so they are `Send` but not
//! `Sync`. Share the underlying model across threads and give each thread its
//! own wrapper.

mod caching;
mod lru;

pub use caching::{ArrayEncodedCachingLm, ContextEncodedCachingLm};
pub use lru::{CacheStats, LruCache};

#[cfg(test)]
mod tests;
