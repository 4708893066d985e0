//! Debug assertion macros for ring buffer invariants.
//!
//! Only active in debug builds (`debug_assert!`), so there is zero overhead
//! in release builds.
//!
//! Used by `RingBuffer<T>` and its `Reader<T>`.

// =============================================================================
// Bounded occupancy
// =============================================================================

/// Assert that the occupied count does not exceed capacity.
///
/// **Invariant**: `0 ≤ (write - read) ≤ capacity`
///
/// Used in: `add_slot()` after computing the new write cursor
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "bounded occupancy violated: count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that the read cursor does not advance past the write cursor.
///
/// **Invariant**: `read ≤ write` (after advance)
///
/// Used in: `Reader::remove()` before publishing the new read cursor
macro_rules! debug_assert_read_not_past_write {
    ($new_read:expr, $write:expr) => {
        debug_assert!(
            $new_read <= $write,
            "bounded occupancy violated: advancing read cursor {} beyond write cursor {}",
            $new_read,
            $write
        )
    };
}

// =============================================================================
// Slot occupancy
// =============================================================================

/// Assert that a slot about to be written is empty.
///
/// **Invariant**: `storage[i]` is occupied ⟺ `read ≤ seq(i) < write`
///
/// Used in: `add_slot()` before storing the item
macro_rules! debug_assert_slot_vacant {
    ($slot:expr, $seq:expr) => {
        debug_assert!(
            $slot.is_none(),
            "slot occupancy violated: writing into occupied slot at seq {}",
            $seq
        )
    };
}

/// Assert that a slot about to be read is occupied.
///
/// Used in: `Reader::get_n()` and `Reader::remove()`
macro_rules! debug_assert_slot_occupied {
    ($slot:expr, $seq:expr) => {
        debug_assert!(
            $slot.is_some(),
            "slot occupancy violated: reading empty slot at seq {}",
            $seq
        )
    };
}

// =============================================================================
// Permit accounting
// =============================================================================

/// Assert that free permits never exceed the free slot count.
///
/// **Invariant**: `permits ≤ capacity - (write - read)`
///
/// Used in: `Reader::clear()` after returning permits
macro_rules! debug_assert_permits_bounded {
    ($permits:expr, $free:expr) => {
        debug_assert!(
            $permits <= $free,
            "permit accounting violated: {} permits for {} free slots",
            $permits,
            $free
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_permits_bounded;
pub(crate) use debug_assert_read_not_past_write;
pub(crate) use debug_assert_slot_occupied;
pub(crate) use debug_assert_slot_vacant;
