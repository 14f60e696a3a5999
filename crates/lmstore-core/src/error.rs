//! Error types for `lmstore`.
//!
//! Recoverable misuse (bad orders, offsets outside the declared size, malformed
//! n-gram input) and data problems (corrupted bitstreams, allocation failure)
//! are surfaced as [`Error`]. Breaches of the build-ordering contract, such as
//! reading a suffix link of an order that was never populated, panic instead:
//! they cannot happen when the builder drives the container.

use thiserror::Error;

/// Result type alias for `lmstore` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in `lmstore` operations.
///
/// Error codes follow the pattern `LMS-XXX`.
#[derive(Error, Debug)]
pub enum Error {
    /// N-gram order outside the container's range (LMS-001).
    #[error("[LMS-001] Invalid n-gram order {order} (model has {max_order} orders)")]
    InvalidOrder {
        /// Requested order (0 = unigram).
        order: usize,
        /// Number of orders the container holds.
        max_order: usize,
    },

    /// Offset beyond the size declared with `set_size_at_least` (LMS-002).
    #[error("[LMS-002] Offset {offset} out of range for order {order} (size {size})")]
    OffsetOutOfRange {
        /// Offending offset.
        offset: u64,
        /// N-gram order.
        order: usize,
        /// Declared size of the order.
        size: u64,
    },

    /// Storage growth could not be satisfied (LMS-003).
    #[error("[LMS-003] Cannot grow storage for order {order} to {requested} slots")]
    ResourceExhausted {
        /// N-gram order being grown.
        order: usize,
        /// Requested number of slots.
        requested: u64,
    },

    /// Compressed data does not decode to what was written (LMS-004).
    #[error("[LMS-004] Corrupted compressed data: {0}")]
    Corrupted(String),

    /// Prefix or suffix n-gram missing when inserting an n-gram (LMS-005).
    #[error("[LMS-005] Missing {link} n-gram for order {order}")]
    MissingContext {
        /// Order of the n-gram being inserted.
        order: usize,
        /// Which link was missing ("prefix" or "suffix").
        link: &'static str,
    },

    /// Operation requires an order that has not been finalized yet (LMS-006).
    #[error("[LMS-006] Order {0} has not been finalized")]
    NotFinalized(usize),

    /// Configuration error (LMS-007).
    #[error("[LMS-007] Configuration error: {0}")]
    Config(String),

    /// IO error (LMS-008).
    #[error("[LMS-008] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (LMS-009).
    #[error("[LMS-009] Serialization error: {0}")]
    Serialization(String),

    /// N-grams were fed to the builder out of order (LMS-010).
    #[error("[LMS-010] N-gram of order {got} arrived after order {current} was started")]
    BuildOrder {
        /// Order currently being populated.
        current: usize,
        /// Order of the offending n-gram.
        got: usize,
    },

    /// Mutation of an order whose storage has already been packed (LMS-011).
    #[error("[LMS-011] Order {0} is finalized and read-only")]
    AlreadyFinalized(usize),
}

impl Error {
    /// Returns the error code (e.g., "LMS-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidOrder { .. } => "LMS-001",
            Self::OffsetOutOfRange { .. } => "LMS-002",
            Self::ResourceExhausted { .. } => "LMS-003",
            Self::Corrupted(_) => "LMS-004",
            Self::MissingContext { .. } => "LMS-005",
            Self::NotFinalized(_) => "LMS-006",
            Self::Config(_) => "LMS-007",
            Self::Io(_) => "LMS-008",
            Self::Serialization(_) => "LMS-009",
            Self::BuildOrder { .. } => "LMS-010",
            Self::AlreadyFinalized(_) => "LMS-011",
        }
    }

    /// Returns true if this error is recoverable.
    ///
    /// Corruption and allocation failure abort a build or a load.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Corrupted(_) | Self::ResourceExhausted { .. })
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
