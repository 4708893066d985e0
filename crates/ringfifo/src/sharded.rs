use crate::{Config, MetricsSnapshot, Reader, RingBuffer, RingError};
use std::collections::hash_map::DefaultHasher;
use std::hash::{BuildHasher, BuildHasherDefault, Hash};
use std::time::Duration;
use tracing::debug;

/// Fixed-key SipHash: the same item hashes to the same shard in every
/// buffer and every run of the same build.
pub type StableHasher = BuildHasherDefault<DefaultHasher>;

/// N independent ring buffers with writes routed by a stable item hash.
///
/// Every item lands on shard `hash(item) % shard_count`, so all items with
/// equal hashes are seen by the same reader. Each shard has its own
/// [`Reader`], letting N consumers drain N shards without coordinating.
///
/// ```
/// use ringfifo::ShardedRingBuffer;
///
/// let buffer = ShardedRingBuffer::new(8, 2).unwrap();
/// let shard = buffer.shard_for(&"user-42");
///
/// assert!(buffer.add("user-42"));
/// assert_eq!(buffer.size(shard), Ok(1));
///
/// let mut reader = buffer.reader(shard).unwrap();
/// assert_eq!(reader.remove(), Some("user-42"));
/// ```
pub struct ShardedRingBuffer<T, S = StableHasher> {
    shards: Box<[RingBuffer<T>]>,
    hasher: S,
}

impl<T: Hash> ShardedRingBuffer<T> {
    /// Splits `total_capacity` across `shard_count` shards, each holding
    /// `ceil(total_capacity / shard_count)` items.
    ///
    /// The combined capacity can therefore exceed `total_capacity` slightly.
    pub fn new(total_capacity: usize, shard_count: usize) -> Result<Self, RingError> {
        Self::with_hasher(total_capacity, shard_count, StableHasher::default())
    }

    /// Creates a sharded buffer from a configuration.
    pub fn with_config(config: Config) -> Result<Self, RingError> {
        Self::with_config_and_hasher(config, StableHasher::default())
    }
}

impl<T: Hash, S: BuildHasher> ShardedRingBuffer<T, S> {
    /// Like [`new`](ShardedRingBuffer::new) with a caller-chosen hasher.
    ///
    /// Routing is only stable across instances if `hasher` is deterministic.
    pub fn with_hasher(
        total_capacity: usize,
        shard_count: usize,
        hasher: S,
    ) -> Result<Self, RingError> {
        Self::with_config_and_hasher(Config::new(total_capacity, shard_count, false), hasher)
    }

    /// Creates a sharded buffer from a configuration and a hasher.
    pub fn with_config_and_hasher(config: Config, hasher: S) -> Result<Self, RingError> {
        if config.capacity == 0 {
            return Err(RingError::InvalidCapacity);
        }
        if config.shard_count == 0 {
            return Err(RingError::InvalidShardCount);
        }

        let shard_config = config.with_capacity(config.shard_capacity());
        let shards = (0..config.shard_count)
            .map(|_| RingBuffer::with_config(shard_config))
            .collect::<Result<Box<[_]>, _>>()?;

        debug!(
            "sharded ring buffer created: {} shards x {} slots",
            config.shard_count,
            shard_config.capacity
        );

        Ok(Self { shards, hasher })
    }

    /// The shard `item` is routed to.
    ///
    /// Uses the unsigned 64-bit hash, so the result is always in
    /// `[0, shard_count)`.
    #[inline]
    pub fn shard_for(&self, item: &T) -> usize {
        (self.hasher.hash_one(item) % self.shards.len() as u64) as usize
    }

    // ---------------------------------------------------------------------
    // WRITER API
    // ---------------------------------------------------------------------

    /// Inserts `item` into its shard, blocking while that shard is full.
    ///
    /// Returns the shard's result: `false` if the wait was interrupted.
    pub fn add(&self, item: T) -> bool {
        self.shards[self.shard_for(&item)].add(item)
    }

    /// Like [`add`](Self::add) for callers whose items may be absent.
    ///
    /// `None` is rejected with [`RingError::NullItem`] before hashing.
    pub fn add_nullable(&self, item: Option<T>) -> Result<bool, RingError> {
        let item = item.ok_or(RingError::NullItem)?;
        Ok(self.add(item))
    }

    /// Inserts `item` into its shard, waiting at most `timeout`.
    pub fn add_timeout(&self, item: T, timeout: Duration) -> bool {
        self.shards[self.shard_for(&item)].add_timeout(item, timeout)
    }

    /// Inserts `item` only if its shard has a free slot right now.
    pub fn try_add(&self, item: T) -> Result<(), T> {
        self.shards[self.shard_for(&item)].try_add(item)
    }
}

impl<T, S> ShardedRingBuffer<T, S> {
    /// Number of shards.
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Combined capacity of all shards.
    pub fn total_capacity(&self) -> usize {
        self.shards.iter().map(RingBuffer::max_size).sum()
    }

    /// Items stored across all shards (best-effort snapshot).
    pub fn len(&self) -> usize {
        self.shards.iter().map(RingBuffer::size).sum()
    }

    /// Returns true if no shard holds an item (best-effort snapshot).
    pub fn is_all_empty(&self) -> bool {
        self.shards.iter().all(RingBuffer::is_empty)
    }

    /// Direct access to one shard's buffer.
    pub fn shard(&self, shard: usize) -> Result<&RingBuffer<T>, RingError> {
        self.shards.get(shard).ok_or(RingError::InvalidShard {
            shard,
            shard_count: self.shards.len(),
        })
    }

    /// Items stored in `shard`.
    pub fn size(&self, shard: usize) -> Result<usize, RingError> {
        self.shard(shard).map(RingBuffer::size)
    }

    /// Returns true if `shard` holds no items.
    pub fn is_empty(&self, shard: usize) -> Result<bool, RingError> {
        self.shard(shard).map(RingBuffer::is_empty)
    }

    /// Returns true if every slot of `shard` is occupied.
    pub fn is_full(&self, shard: usize) -> Result<bool, RingError> {
        self.shard(shard).map(RingBuffer::is_full)
    }

    /// Capacity of `shard`.
    pub fn max_size(&self, shard: usize) -> Result<usize, RingError> {
        self.shard(shard).map(RingBuffer::max_size)
    }

    /// Claims the reader of `shard`. `get_n`, `get_all`, `remove_n` and
    /// `clear` for that shard go through the returned handle.
    pub fn reader(&self, shard: usize) -> Result<Reader<T>, RingError> {
        self.shard(shard)?.reader()
    }

    /// Claims the readers of every shard, in shard order.
    pub fn readers(&self) -> Result<Vec<Reader<T>>, RingError> {
        self.shards.iter().map(RingBuffer::reader).collect()
    }

    /// Wakes every writer blocked on any shard. Returns the number woken.
    pub fn interrupt_writers(&self) -> usize {
        self.shards.iter().map(RingBuffer::interrupt_writers).sum()
    }

    /// Metrics summed over all shards.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shards
            .iter()
            .fold(MetricsSnapshot::default(), |mut acc, shard| {
                acc += shard.metrics();
                acc
            })
    }
}

impl<T, S: Clone> Clone for ShardedRingBuffer<T, S> {
    fn clone(&self) -> Self {
        Self {
            shards: self.shards.clone(),
            hasher: self.hasher.clone(),
        }
    }
}

impl<T, S> std::fmt::Debug for ShardedRingBuffer<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedRingBuffer")
            .field("shards", &self.shards)
            .finish_non_exhaustive()
    }
}
