//! On-disk format of compressed prob/backoff values.
//!
//! # Format
//!
//! ```text
//! [Magic: "LMSV" 4 bytes]
//! [Version: 1 byte]
//! [Body: bincode(PersistedValues)]
//! ```
//!
//! Each order stores its value count, its rank dictionary, its bitstream
//! (bit length plus byte-aligned bytes) and, if kept, its suffix links.
//! Block checkpoints are not stored; they are rebuilt on load.

use super::ProbBackoffPair;
use crate::error::{Error, Result};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Blob magic bytes.
pub const PERSIST_MAGIC: &[u8; 4] = b"LMSV";

/// Current blob format version.
pub const PERSIST_VERSION: u8 = 1;

const HEADER_LEN: usize = 5;

/// One order of a persisted container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedOrder {
    /// Number of values in the bitstream.
    pub count: u64,
    /// Number of meaningful bits in `bytes`.
    pub bit_len: u64,
    /// Distinct pairs in rank order.
    pub dictionary: Vec<ProbBackoffPair>,
    /// Bitstream bytes, zero-padded to a byte boundary.
    pub bytes: Vec<u8>,
    /// Suffix link of every value, if the container keeps them.
    pub links: Option<Vec<u64>>,
}

/// A complete persisted container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedValues {
    block_size: u32,
    orders: Vec<PersistedOrder>,
}

impl PersistedValues {
    /// Wraps per-order snapshots.
    #[must_use]
    pub fn new(block_size: u32, orders: Vec<PersistedOrder>) -> Self {
        Self { block_size, orders }
    }

    /// Values between checkpoints.
    #[must_use]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Per-order snapshots, lowest order first.
    #[must_use]
    pub fn orders(&self) -> &[PersistedOrder] {
        &self.orders
    }

    /// Consumes the blob, yielding its orders.
    #[must_use]
    pub fn into_orders(self) -> Vec<PersistedOrder> {
        self.orders
    }

    /// Encodes header and body.
    ///
    /// # Errors
    ///
    /// [`Error::Serialization`] if bincode fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self)?;
        let mut buf = Vec::with_capacity(HEADER_LEN + body.len());
        buf.extend_from_slice(PERSIST_MAGIC);
        buf.push(PERSIST_VERSION);
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Decodes bytes written by [`Self::to_bytes`].
    ///
    /// # Errors
    ///
    /// [`Error::Corrupted`] on a bad header, truncated body or trailing bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::Corrupted("blob too small".to_string()));
        }
        if &data[0..4] != PERSIST_MAGIC {
            return Err(Error::Corrupted("invalid blob magic".to_string()));
        }
        if data[4] != PERSIST_VERSION {
            return Err(Error::Corrupted(format!(
                "unsupported blob version {}",
                data[4]
            )));
        }
        let body = &data[HEADER_LEN..];
        // The limit keeps forged length prefixes from allocating past the input.
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_limit(body.len() as u64)
            .deserialize(body)
            .map_err(|e| Error::Corrupted(format!("blob body: {e}")))
    }

    /// Writes the blob to `path`.
    ///
    /// # Errors
    ///
    /// Fails if encoding or the write fails.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path.as_ref(), &bytes)?;
        tracing::info!(
            path = %path.as_ref().display(),
            orders = self.orders.len(),
            bytes = bytes.len(),
            "Saved compressed values"
        );
        Ok(())
    }

    /// Reads a blob from `path`.
    ///
    /// # Errors
    ///
    /// Fails on IO errors or a malformed blob.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        let values = Self::from_bytes(&bytes)?;
        tracing::info!(
            path = %path.as_ref().display(),
            orders = values.orders.len(),
            bytes = bytes.len(),
            "Loaded compressed values"
        );
        Ok(values)
    }
}
