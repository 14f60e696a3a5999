//! Identifier newtypes shared by the map, the value containers and the
//! query front-ends.
//!
//! Offsets are scoped to a single n-gram order. Keeping the slot, prefix and
//! suffix offsets as distinct types stops them from being passed in each
//! other's place through the wide `add` surface.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense integer id of a word, assigned by a [`crate::WordIndexer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WordId(pub u32);

impl WordId {
    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the id as a vector index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

macro_rules! offset_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
            Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl $name {
            /// Returns the raw offset.
            #[inline]
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Returns the offset as a slot index.
            #[inline]
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

offset_newtype!(
    /// Slot of an n-gram's payload within its order.
    Offset
);

offset_newtype!(
    /// Offset (at `order - 1`) of an n-gram's prefix, i.e. the n-gram without
    /// its last word.
    ContextOffset
);

offset_newtype!(
    /// Offset (at `order - 1`) of an n-gram's suffix, i.e. the n-gram without
    /// its first word. Used when backing off.
    SuffixOffset
);

impl From<ContextOffset> for Offset {
    fn from(value: ContextOffset) -> Self {
        Self(value.0)
    }
}

impl From<SuffixOffset> for Offset {
    fn from(value: SuffixOffset) -> Self {
        Self(value.0)
    }
}

/// Query state threaded through context-encoded lookups.
///
/// Identifies the longest n-gram matched so far. `order == -1` is the empty
/// context (nothing matched yet, or the previous word was unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LmContextInfo {
    /// Offset of the matched n-gram within `order`.
    pub offset: Offset,
    /// Order of the matched n-gram, `-1` for the empty context.
    pub order: i32,
}

impl LmContextInfo {
    /// The empty context.
    pub const EMPTY: Self = Self {
        offset: Offset(0),
        order: -1,
    };

    /// Returns true for the empty context.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.order < 0
    }
}

impl Default for LmContextInfo {
    fn default() -> Self {
        Self::EMPTY
    }
}
