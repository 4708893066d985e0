//! Error types for ring buffer operations.

use thiserror::Error;

/// Errors that can occur when building or addressing a ring buffer.
///
/// All of these are precondition violations reported synchronously to the
/// caller. A blocked `add` that is interrupted or times out is not an error;
/// it returns `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// Capacity must be greater than zero.
    #[error("capacity must be greater than 0")]
    InvalidCapacity,

    /// Shard count must be greater than zero.
    #[error("shard count must be greater than 0")]
    InvalidShardCount,

    /// An absent item was offered for insertion.
    #[error("attempted to add an absent item to the buffer")]
    NullItem,

    /// Shard index outside `[0, shard_count)`.
    #[error("shard {shard} out of range (shard count: {shard_count})")]
    InvalidShard {
        /// The requested shard index.
        shard: usize,
        /// The number of shards in the buffer.
        shard_count: usize,
    },

    /// The single reader handle for this buffer has already been claimed.
    #[error("reader already claimed for this buffer")]
    ReaderTaken,
}

impl RingError {
    /// Returns `true` if this error is a misuse of the API by the caller
    /// (bad argument), as opposed to a construction-time misconfiguration.
    #[inline]
    pub fn is_caller_bug(&self) -> bool {
        matches!(
            self,
            Self::NullItem | Self::InvalidShard { .. } | Self::ReaderTaken
        )
    }

    /// Returns `true` if this error aborts construction of a buffer.
    #[inline]
    pub fn is_construction_error(&self) -> bool {
        matches!(self, Self::InvalidCapacity | Self::InvalidShardCount)
    }
}
