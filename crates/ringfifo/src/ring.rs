use crate::gate::{Acquire, CapacityGate};
use crate::invariants::{
    debug_assert_bounded_count, debug_assert_permits_bounded, debug_assert_read_not_past_write,
    debug_assert_slot_occupied, debug_assert_slot_vacant,
};
use crate::{Config, Metrics, MetricsSnapshot, RingError};
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use std::cell::{Cell, UnsafeCell};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// =============================================================================
// SYNCHRONIZATION STRATEGY
// =============================================================================
//
// Two independent primitives guard the write side:
//
// - Capacity gate: a counting permit pool sized to `capacity`. A writer takes
//   one permit before touching the buffer and the reader returns one for
//   every removed item. Holding a permit proves a free slot exists.
// - Writer gate: a mutex held only while a writer stores its item and
//   advances `write`. It is never held across the capacity wait.
//
// The read side takes no lock. There is exactly one `Reader` per buffer and
// it is the only code that advances `read`.
//
// ## Cursors
//
// `write` and `read` are unbounded u64 sequence numbers; the slot index is
// `seq % capacity`. `write - read` is the occupied count, so the "full" state
// (equal slot indices, every slot occupied) needs no separate flag.
//
// ## Memory Ordering Protocol
//
// **Writer:**
// 1. Acquire a permit (mutex hand-off orders it after the matching release)
// 2. Lock the writer gate, load `write` Relaxed (only mutated under the gate)
// 3. Store the item into `storage[write % capacity]`
// 4. Store `write + 1` with Release (publishes the item to the reader)
//
// **Reader:**
// 1. Load `read` Relaxed (only the reader writes it)
// 2. Load `write` with Acquire (synchronizes with the writer's Release)
// 3. Take the item out of `storage[read % capacity]`
// 4. Store `read + 1` with Release, then return the permit
//
// =============================================================================

/// Bounded circular FIFO buffer with blocking multi-writer backpressure.
///
/// `RingBuffer` is the producer-side handle: it is cheap to clone and every
/// clone may call [`add`](Self::add) concurrently. Reading is done through
/// the single [`Reader`] obtained from [`reader`](Self::reader).
///
/// ```
/// use ringfifo::RingBuffer;
///
/// let ring = RingBuffer::new(4).unwrap();
/// let mut reader = ring.reader().unwrap();
///
/// for item in ["a", "b", "c", "d"] {
///     assert!(ring.add(item));
/// }
/// assert!(ring.is_full());
///
/// assert_eq!(reader.remove(), Some("a"));
/// assert!(ring.add("e"));
/// assert_eq!(reader.get_all(), vec![&"b", &"c", &"d", &"e"]);
/// ```
pub struct RingBuffer<T> {
    inner: Arc<RingInner<T>>,
}

struct RingInner<T> {
    /// Next sequence to write (mutated under `writer_gate`, read by anyone)
    write: CachePadded<AtomicU64>,
    /// Next sequence to read (mutated by the reader only)
    read: CachePadded<AtomicU64>,

    writer_gate: Mutex<()>,
    capacity_gate: CapacityGate,
    reader_claimed: AtomicBool,

    metrics: Metrics,
    enable_metrics: bool,
    capacity: usize,

    /// Fixed-size slot storage; never grows or shrinks.
    storage: Box<[UnsafeCell<Option<T>>]>,
}

// Safety: slots are only accessed under the permit/cursor protocol above; an
// item moves from exactly one writer to the single reader.
unsafe impl<T: Send> Send for RingInner<T> {}
unsafe impl<T: Send> Sync for RingInner<T> {}

impl<T> RingBuffer<T> {
    /// Creates a ring buffer holding at most `capacity` items.
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        Self::with_config(Config::default().with_capacity(capacity))
    }

    /// Creates a ring buffer from a configuration. `shard_count` is ignored.
    pub fn with_config(config: Config) -> Result<Self, RingError> {
        let capacity = config.capacity;
        if capacity == 0 {
            return Err(RingError::InvalidCapacity);
        }

        let storage = (0..capacity).map(|_| UnsafeCell::new(None)).collect();
        debug!("ring buffer created with capacity {}", capacity);

        Ok(Self {
            inner: Arc::new(RingInner {
                write: CachePadded::new(AtomicU64::new(0)),
                read: CachePadded::new(AtomicU64::new(0)),
                writer_gate: Mutex::new(()),
                capacity_gate: CapacityGate::new(capacity),
                reader_claimed: AtomicBool::new(false),
                metrics: Metrics::new(),
                enable_metrics: config.enable_metrics,
                capacity,
                storage,
            }),
        })
    }

    // ---------------------------------------------------------------------
    // STATUS
    // ---------------------------------------------------------------------

    /// Returns the number of stored items.
    ///
    /// Best-effort snapshot: under concurrent `add`/`remove` the value may be
    /// stale by the time the caller looks at it.
    #[inline]
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// Returns true if no items are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns true if every slot is occupied.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.size() == self.max_size()
    }

    /// Returns the fixed capacity.
    #[inline]
    pub fn max_size(&self) -> usize {
        self.inner.capacity
    }

    /// Get a snapshot of metrics if enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.inner.enable_metrics {
            self.inner.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    /// Claims the single reader handle for this buffer.
    ///
    /// Fails with [`RingError::ReaderTaken`] while another `Reader` is alive.
    /// Dropping the reader makes it claimable again.
    pub fn reader(&self) -> Result<Reader<T>, RingError> {
        self.inner
            .reader_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RingError::ReaderTaken)?;

        Ok(Reader {
            ring: self.clone(),
            _not_sync: PhantomData,
        })
    }

    // ---------------------------------------------------------------------
    // WRITER API
    // ---------------------------------------------------------------------

    /// Inserts `item`, blocking while the buffer is full.
    ///
    /// Returns `false` without inserting if the wait is cut short by
    /// [`interrupt_writers`](Self::interrupt_writers).
    pub fn add(&self, item: T) -> bool {
        self.add_until(item, None)
    }

    /// Like [`add`](Self::add) for callers whose items may be absent.
    ///
    /// `None` is rejected with [`RingError::NullItem`] before touching the
    /// buffer.
    pub fn add_nullable(&self, item: Option<T>) -> Result<bool, RingError> {
        let item = item.ok_or(RingError::NullItem)?;
        Ok(self.add(item))
    }

    /// Inserts `item`, waiting at most `timeout` for a free slot.
    pub fn add_timeout(&self, item: T, timeout: Duration) -> bool {
        self.add_until(item, Instant::now().checked_add(timeout))
    }

    /// Inserts `item` only if a slot is free right now.
    ///
    /// Returns `Err(item)` when the buffer is full.
    pub fn try_add(&self, item: T) -> Result<(), T> {
        if !self.inner.capacity_gate.try_acquire() {
            return Err(item);
        }
        self.inner.add_slot(item);
        Ok(())
    }

    /// Wakes every writer currently blocked in `add`/`add_timeout`.
    ///
    /// Each of them returns `false` without inserting. Returns the number of
    /// writers woken.
    pub fn interrupt_writers(&self) -> usize {
        let woken = self.inner.capacity_gate.interrupt_all();
        if woken > 0 {
            debug!("interrupted {} blocked writers", woken);
        }
        woken
    }

    fn add_until(&self, item: T, deadline: Option<Instant>) -> bool {
        let outcome = self.inner.capacity_gate.acquire(deadline);
        if !outcome.is_acquired() {
            debug!("add abandoned while waiting for capacity: {:?}", outcome);
            if self.inner.enable_metrics {
                self.inner.metrics.add_add_failures(1);
            }
            return false;
        }

        if outcome == Acquire::AfterWait {
            trace!("writer resumed after waiting for capacity");
            if self.inner.enable_metrics {
                self.inner.metrics.add_add_waits(1);
            }
        }

        self.inner.add_slot(item);
        true
    }
}

impl<T> Clone for RingBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("size", &self.size())
            .field("capacity", &self.inner.capacity)
            .finish_non_exhaustive()
    }
}

impl<T> RingInner<T> {
    #[inline]
    fn slot_index(&self, seq: u64) -> usize {
        (seq % self.capacity as u64) as usize
    }

    fn size(&self) -> usize {
        // `read` first: `write` only grows, so the difference can't underflow.
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        (write.wrapping_sub(read) as usize).min(self.capacity)
    }

    /// Stores `item` at the write cursor. Caller must hold a permit.
    fn add_slot(&self, item: T) {
        let _gate = self.writer_gate.lock();

        let write = self.write.load(Ordering::Relaxed);
        let read = self.read.load(Ordering::Acquire);
        let idx = self.slot_index(write);

        // SAFETY: the caller's permit means `write - read < capacity`, so this
        // slot is outside the reader's range [read, write). The writer gate
        // excludes other writers, and the reader won't look at the slot until
        // the Release store below publishes it.
        unsafe {
            let slot = &mut *self.storage[idx].get();
            debug_assert_slot_vacant!(slot, write);
            *slot = Some(item);
        }

        let new_write = write.wrapping_add(1);
        debug_assert_bounded_count!(new_write.wrapping_sub(read) as usize, self.capacity);
        self.write.store(new_write, Ordering::Release);

        if self.enable_metrics {
            self.metrics.add_items_added(1);
        }
    }
}

/// The single reader of a [`RingBuffer`].
///
/// Obtained from [`RingBuffer::reader`]. Not `Clone` and not `Sync`, so one
/// thread at a time observes and removes items. Peeks borrow the reader
/// immutably and pops borrow it mutably, so a peeked reference can never
/// outlive the removal of its item.
pub struct Reader<T> {
    ring: RingBuffer<T>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<T> Reader<T> {
    /// The buffer this reader drains.
    #[inline]
    pub fn ring(&self) -> &RingBuffer<T> {
        &self.ring
    }

    /// Returns the number of stored items.
    #[inline]
    pub fn size(&self) -> usize {
        self.ring.size()
    }

    /// Returns true if no items are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Returns true if every slot is occupied.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Returns the fixed capacity.
    #[inline]
    pub fn max_size(&self) -> usize {
        self.ring.max_size()
    }

    // ---------------------------------------------------------------------
    // PEEK
    // ---------------------------------------------------------------------

    /// Returns the head item without removing it.
    pub fn get(&self) -> Option<&T> {
        let inner = &self.ring.inner;
        let read = inner.read.load(Ordering::Relaxed);
        let write = inner.write.load(Ordering::Acquire);
        if read == write {
            return None;
        }
        self.slot(inner.slot_index(read), read)
    }

    /// Returns up to `n` items from the head in FIFO order, without removing
    /// them.
    ///
    /// The range wraps past the end of storage at most once. An empty buffer
    /// yields an empty vec.
    pub fn get_n(&self, n: usize) -> Vec<&T> {
        let inner = &self.ring.inner;
        let read = inner.read.load(Ordering::Relaxed);
        let write = inner.write.load(Ordering::Acquire);

        let count = (write.wrapping_sub(read) as usize).min(n);
        if count == 0 {
            return Vec::new();
        }

        let start = inner.slot_index(read);
        let head_run = count.min(inner.capacity - start);
        let tail_run = count - head_run;

        (start..start + head_run)
            .chain(0..tail_run)
            .zip(0u64..)
            .filter_map(|(idx, offset)| self.slot(idx, read.wrapping_add(offset)))
            .collect()
    }

    /// Returns every stored item in FIFO order, without removing them.
    pub fn get_all(&self) -> Vec<&T> {
        self.get_n(self.size())
    }

    fn slot(&self, idx: usize, seq: u64) -> Option<&T> {
        // SAFETY: `seq` is in [read, write) as observed with an Acquire load of
        // `write`, so the slot holds a published item. Writers never touch an
        // occupied slot, and removing it needs `&mut self`, which the returned
        // borrow prevents.
        let slot = unsafe { &*self.ring.inner.storage[idx].get() };
        debug_assert_slot_occupied!(slot, seq);
        slot.as_ref()
    }

    // ---------------------------------------------------------------------
    // REMOVE
    // ---------------------------------------------------------------------

    /// Removes and returns the head item, releasing its slot to writers.
    ///
    /// Never blocks; returns `None` if the buffer is empty.
    pub fn remove(&mut self) -> Option<T> {
        let inner = &self.ring.inner;
        let read = inner.read.load(Ordering::Relaxed);
        let write = inner.write.load(Ordering::Acquire);
        if read == write {
            return None;
        }

        let idx = inner.slot_index(read);
        // SAFETY: the slot is in [read, write) and published (see `slot`).
        // `&mut self` makes this the only reader access.
        let item = unsafe { (*inner.storage[idx].get()).take() };
        debug_assert_slot_occupied!(item, read);

        let new_read = read.wrapping_add(1);
        debug_assert_read_not_past_write!(new_read, write);
        inner.read.store(new_read, Ordering::Release);
        inner.capacity_gate.release(1);

        if inner.enable_metrics {
            inner.metrics.add_items_removed(1);
        }

        item
    }

    /// Removes up to `n` items from the head in FIFO order.
    ///
    /// Each removal frees one slot as it happens, so writers blocked on a
    /// full buffer resume while the batch is still being drained.
    pub fn remove_n(&mut self, n: usize) -> Vec<T> {
        let count = self.size().min(n);
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            match self.remove() {
                Some(item) => items.push(item),
                None => break,
            }
        }
        items
    }

    /// Removes every stored item.
    pub fn remove_all(&mut self) -> Vec<T> {
        let size = self.size();
        self.remove_n(size)
    }

    /// Drops every stored item and resets the buffer to empty.
    ///
    /// Holds the writer gate while wiping, and hands the freed slots back to
    /// the capacity gate so blocked writers can proceed.
    pub fn clear(&mut self) {
        let inner = &self.ring.inner;
        let gate = inner.writer_gate.lock();

        let read = inner.read.load(Ordering::Relaxed);
        let write = inner.write.load(Ordering::Acquire);
        let count = write.wrapping_sub(read) as usize;

        for seq in read..write {
            // SAFETY: writer gate held and `&mut self` excludes the reader;
            // nobody else can touch these slots.
            unsafe {
                *inner.storage[inner.slot_index(seq)].get() = None;
            }
        }

        inner.read.store(write, Ordering::Release);
        drop(gate);

        inner.capacity_gate.release(count);
        debug_assert_permits_bounded!(inner.capacity_gate.available(), inner.capacity);

        if inner.enable_metrics {
            inner.metrics.add_clears(1);
        }
        debug!("ring buffer cleared, {} items discarded", count);
    }
}

impl<T> Drop for Reader<T> {
    fn drop(&mut self) {
        self.ring.inner.reader_claimed.store(false, Ordering::Release);
    }
}

impl<T> std::fmt::Debug for Reader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader").field("ring", &self.ring).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_new_rejects_zero_capacity() {
        assert_eq!(RingBuffer::<u64>::new(0).unwrap_err(), RingError::InvalidCapacity);
    }

    #[test]
    fn test_ring_wraps_after_remove() {
        let ring = RingBuffer::new(4).unwrap();
        let mut reader = ring.reader().unwrap();

        for item in ["a", "b", "c", "d"] {
            assert!(ring.add(item));
        }
        assert!(ring.is_full());
        assert_eq!(ring.size(), 4);

        assert_eq!(reader.remove(), Some("a"));
        assert!(!ring.is_full());
        assert_eq!(ring.size(), 3);

        assert!(ring.add("e"));
        assert_eq!(reader.get_all(), vec![&"b", &"c", &"d", &"e"]);
    }

    #[test]
    fn test_get_does_not_remove() {
        let ring = RingBuffer::new(8).unwrap();
        let mut reader = ring.reader().unwrap();
        assert_eq!(reader.get(), None);

        for i in 0..5u64 {
            ring.add(i);
        }

        assert_eq!(reader.get(), Some(&0));
        assert_eq!(reader.get_n(3), vec![&0, &1, &2]);
        assert_eq!(reader.get_n(100).len(), 5);
        assert_eq!(ring.size(), 5);

        assert_eq!(reader.remove_n(3), vec![0, 1, 2]);
        assert_eq!(reader.get(), Some(&3));
    }

    #[test]
    fn test_empty_reads() {
        let ring = RingBuffer::<u64>::new(3).unwrap();
        let mut reader = ring.reader().unwrap();

        assert!(reader.get_n(10).is_empty());
        assert!(reader.get_all().is_empty());
        assert!(reader.remove_n(10).is_empty());
        assert_eq!(reader.remove(), None);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_single_reader_claim() {
        let ring = RingBuffer::<u64>::new(2).unwrap();
        let reader = ring.reader().unwrap();
        assert_eq!(ring.reader().unwrap_err(), RingError::ReaderTaken);

        drop(reader);
        assert!(ring.reader().is_ok());
    }

    #[test]
    fn test_add_nullable() {
        let ring = RingBuffer::new(2).unwrap();
        assert_eq!(ring.add_nullable(None::<u64>), Err(RingError::NullItem));
        assert!(ring.is_empty());
        assert_eq!(ring.add_nullable(Some(1)), Ok(true));
        assert_eq!(ring.size(), 1);
    }

    #[test]
    fn test_try_add_hands_item_back_when_full() {
        let ring = RingBuffer::new(1).unwrap();
        assert_eq!(ring.try_add(1u64), Ok(()));
        assert_eq!(ring.try_add(2u64), Err(2));
    }

    #[test]
    fn test_add_timeout_on_full_buffer() {
        let ring = RingBuffer::with_config(Config::new(1, 1, true)).unwrap();
        assert!(ring.add(1u64));
        assert!(!ring.add_timeout(2, Duration::from_millis(20)));
        assert_eq!(ring.size(), 1);
        assert_eq!(ring.metrics().add_failures, 1);
    }

    #[test]
    fn test_blocked_add_resumes_after_remove() {
        let ring = RingBuffer::new(2).unwrap();
        let mut reader = ring.reader().unwrap();
        ring.add(1u64);
        ring.add(2u64);

        let writer = {
            let ring = ring.clone();
            thread::spawn(move || ring.add(3))
        };

        thread::sleep(Duration::from_millis(30));
        assert!(!writer.is_finished());
        assert_eq!(ring.size(), 2);

        assert_eq!(reader.remove(), Some(1));
        assert!(writer.join().unwrap());
        assert_eq!(reader.remove_all(), vec![2, 3]);
    }

    #[test]
    fn test_interrupt_blocked_writer() {
        let ring = RingBuffer::new(1).unwrap();
        ring.add(0u64);

        let writer = {
            let ring = ring.clone();
            thread::spawn(move || ring.add(1))
        };

        while !writer.is_finished() {
            ring.interrupt_writers();
            thread::sleep(Duration::from_millis(5));
        }

        assert!(!writer.join().unwrap());
        assert_eq!(ring.size(), 1);
    }

    #[test]
    fn test_clear_returns_capacity() {
        let ring = RingBuffer::with_config(Config::new(3, 1, true)).unwrap();
        let mut reader = ring.reader().unwrap();
        for i in 0..3u64 {
            ring.add(i);
        }
        reader.remove();
        ring.add(3);
        assert!(ring.is_full());

        reader.clear();
        assert!(ring.is_empty());
        assert_eq!(reader.get(), None);

        for i in 10..13u64 {
            assert_eq!(ring.try_add(i), Ok(()));
        }
        assert_eq!(reader.get_all(), vec![&10, &11, &12]);
        assert_eq!(ring.metrics().clears, 1);
    }

    #[test]
    fn test_metrics() {
        let ring = RingBuffer::with_config(Config::new(4, 1, true)).unwrap();
        let mut reader = ring.reader().unwrap();
        for i in 0..4u64 {
            ring.add(i);
        }
        reader.remove_n(3);

        let m = ring.metrics();
        assert_eq!(m.items_added, 4);
        assert_eq!(m.items_removed, 3);

        let quiet = RingBuffer::new(4).unwrap();
        quiet.add(1u64);
        assert_eq!(quiet.metrics(), MetricsSnapshot::default());
    }

    #[test]
    fn test_remove_drops_nothing_early() {
        use std::sync::atomic::AtomicUsize;

        static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

        struct DropTracker {
            _id: u64,
        }

        impl Drop for DropTracker {
            fn drop(&mut self) {
                DROP_COUNT.fetch_add(1, Ordering::SeqCst);
            }
        }

        DROP_COUNT.store(0, Ordering::SeqCst);

        let ring = RingBuffer::new(8).unwrap();
        let mut reader = ring.reader().unwrap();
        for i in 0..6 {
            ring.add(DropTracker { _id: i });
        }

        // Peeking hands out references only
        assert_eq!(reader.get_n(6).len(), 6);
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 0);

        // Removed items belong to the caller
        let removed = reader.remove_n(2);
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 0);
        drop(removed);
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 2);

        // Clear drops in place
        reader.clear();
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 6);

        // Whatever is left goes with the buffer
        ring.add(DropTracker { _id: 99 });
        drop(reader);
        drop(ring);
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 7);
    }
}
