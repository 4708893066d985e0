//! Reader-side batch draining.
//!
//! The reader of a buffer typically runs a polling loop: peek a batch, hand
//! it to a processor, then remove exactly the items it peeked. The buffer
//! does not look at what the processor does with the batch.

use crate::{ConsumerConfig, Reader};
use std::thread;
use tracing::trace;

/// Processes a batch of items peeked from a buffer.
///
/// Implemented for any `FnMut(&[&T])`.
pub trait BatchProcessor<T> {
    /// Handles one batch, in FIFO order.
    fn process(&mut self, batch: &[&T]);
}

impl<T, F> BatchProcessor<T> for F
where
    F: FnMut(&[&T]),
{
    #[inline]
    fn process(&mut self, batch: &[&T]) {
        self(batch);
    }
}

impl<T> Reader<T> {
    /// Peeks up to `max_items`, hands them to `processor`, then removes them.
    ///
    /// Returns the number of items processed. The processor is not called
    /// when the buffer is empty.
    pub fn drain_with<P>(&mut self, max_items: usize, processor: &mut P) -> usize
    where
        P: BatchProcessor<T> + ?Sized,
    {
        let count = {
            let batch = self.get_n(max_items);
            if batch.is_empty() {
                return 0;
            }
            processor.process(&batch);
            batch.len()
        };

        let removed = self.remove_n(count).len();
        debug_assert_eq!(removed, count, "single reader lost peeked items");
        trace!("drained batch of {} items", removed);
        removed
    }

    /// Polls the buffer until `finished()` reports that no producer remains,
    /// then drains whatever is left.
    ///
    /// Sleeps `idle_interval` after an empty poll and `partial_interval`
    /// after a poll that returned fewer than `batch_size` items. Returns the
    /// total number of items processed.
    pub fn drain_until<F, P>(
        &mut self,
        config: &ConsumerConfig,
        mut finished: F,
        processor: &mut P,
    ) -> usize
    where
        F: FnMut() -> bool,
        P: BatchProcessor<T> + ?Sized,
    {
        let batch_size = config.batch_size.max(1);
        let mut total = 0;

        while !finished() {
            let drained = self.drain_with(batch_size, processor);
            total += drained;

            if drained == 0 {
                thread::sleep(config.idle_interval);
            } else if drained < batch_size && !config.partial_interval.is_zero() {
                thread::sleep(config.partial_interval);
            }
        }

        loop {
            let drained = self.drain_with(batch_size, processor);
            if drained == 0 {
                break;
            }
            total += drained;
        }

        total
    }
}
