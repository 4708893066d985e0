use parking_lot::{Condvar, Mutex};
use std::time::Instant;

/// Outcome of waiting on the capacity gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Acquire {
    /// A permit was free on arrival.
    Immediate,
    /// A permit was obtained after blocking.
    AfterWait,
    /// `interrupt_all` was called while blocked. No permit taken.
    Interrupted,
    /// The deadline passed while blocked. No permit taken.
    TimedOut,
}

impl Acquire {
    #[inline]
    pub(crate) fn is_acquired(self) -> bool {
        matches!(self, Self::Immediate | Self::AfterWait)
    }
}

/// Counting permit pool bounding the number of occupied slots.
///
/// Writers take one permit per insert and the reader gives one back per
/// removed item, so `available()` tracks free capacity. The pool has its own
/// lock, separate from the writer gate, so a blocked writer never holds the
/// lock that serializes cursor mutation.
#[derive(Debug)]
pub(crate) struct CapacityGate {
    state: Mutex<GateState>,
    available: Condvar,
}

#[derive(Debug)]
struct GateState {
    permits: usize,
    /// Bumped by `interrupt_all`; a waiter that sees it change gives up.
    epoch: u64,
}

impl CapacityGate {
    pub(crate) fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(GateState { permits, epoch: 0 }),
            available: Condvar::new(),
        }
    }

    /// Free permits right now.
    #[inline]
    pub(crate) fn available(&self) -> usize {
        self.state.lock().permits
    }

    /// Takes a permit if one is free, without blocking.
    pub(crate) fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if state.permits == 0 {
            return false;
        }
        state.permits -= 1;
        true
    }

    /// Takes a permit, blocking until one is released, the deadline passes,
    /// or `interrupt_all` is called.
    pub(crate) fn acquire(&self, deadline: Option<Instant>) -> Acquire {
        let mut state = self.state.lock();
        if state.permits > 0 {
            state.permits -= 1;
            return Acquire::Immediate;
        }

        let epoch = state.epoch;
        loop {
            match deadline {
                Some(deadline) => {
                    if self.available.wait_until(&mut state, deadline).timed_out()
                        && state.permits == 0
                        && state.epoch == epoch
                    {
                        return Acquire::TimedOut;
                    }
                }
                None => self.available.wait(&mut state),
            }

            if state.epoch != epoch {
                // Pass the wakeup on if a permit is sitting unused.
                if state.permits > 0 {
                    self.available.notify_one();
                }
                return Acquire::Interrupted;
            }
            if state.permits > 0 {
                state.permits -= 1;
                return Acquire::AfterWait;
            }
        }
    }

    /// Returns `n` permits and wakes up to `n` blocked writers.
    pub(crate) fn release(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut state = self.state.lock();
        state.permits += n;
        drop(state);

        for _ in 0..n {
            if !self.available.notify_one() {
                break;
            }
        }
    }

    /// Wakes every writer blocked in `acquire`; each returns `Interrupted`.
    ///
    /// Writers that arrive afterwards are not affected.
    pub(crate) fn interrupt_all(&self) -> usize {
        let mut state = self.state.lock();
        state.epoch = state.epoch.wrapping_add(1);
        drop(state);
        self.available.notify_all()
    }
}
