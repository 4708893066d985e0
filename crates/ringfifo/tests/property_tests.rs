//! Property-based tests for the ring buffer occupancy and ordering laws.
//!
//! Each property drives a buffer through a random operation sequence and
//! checks it against a `VecDeque` model.

use proptest::prelude::*;
use ringfifo::{RingBuffer, ShardedRingBuffer};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Op {
    Add(u32),
    Remove,
    RemoveN(usize),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => any::<u32>().prop_map(Op::Add),
        3 => Just(Op::Remove),
        2 => (0usize..8).prop_map(Op::RemoveN),
        1 => Just(Op::Clear),
    ]
}

// =============================================================================
// FIFO law
// =============================================================================

proptest! {
    /// Items come back out in exactly the order they went in.
    #[test]
    fn prop_fifo_law(items in prop::collection::vec(any::<u64>(), 0..200)) {
        let ring = RingBuffer::new(items.len().max(1)).unwrap();
        let mut reader = ring.reader().unwrap();

        for item in &items {
            prop_assert!(ring.add(*item));
        }

        let mut out = Vec::new();
        while let Some(item) = reader.remove() {
            out.push(item);
        }
        prop_assert_eq!(out, items);
    }
}

// =============================================================================
// Occupancy accounting
// =============================================================================

proptest! {
    /// size/is_empty/is_full track a model queue through any operation mix,
    /// including wrap-around and clears.
    #[test]
    fn prop_matches_model(
        capacity in 1usize..16,
        ops in prop::collection::vec(op_strategy(), 1..200),
    ) {
        let ring = RingBuffer::new(capacity).unwrap();
        let mut reader = ring.reader().unwrap();
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                Op::Add(v) => {
                    let accepted = ring.try_add(v).is_ok();
                    prop_assert_eq!(accepted, model.len() < capacity);
                    if accepted {
                        model.push_back(v);
                    }
                }
                Op::Remove => {
                    prop_assert_eq!(reader.remove(), model.pop_front());
                }
                Op::RemoveN(n) => {
                    let expected: Vec<u32> = (0..n.min(model.len()))
                        .filter_map(|_| model.pop_front())
                        .collect();
                    prop_assert_eq!(reader.remove_n(n), expected);
                }
                Op::Clear => {
                    reader.clear();
                    model.clear();
                }
            }

            prop_assert_eq!(ring.size(), model.len());
            prop_assert!(ring.size() <= ring.max_size());
            prop_assert_eq!(ring.is_empty(), ring.size() == 0);
            prop_assert_eq!(ring.is_full(), ring.size() == ring.max_size());

            let peeked: Vec<u32> = reader.get_all().into_iter().copied().collect();
            let modeled: Vec<u32> = model.iter().copied().collect();
            prop_assert_eq!(peeked, modeled);
        }
    }
}

proptest! {
    /// After k adds and j removes, size is k - j.
    #[test]
    fn prop_size_after_adds_and_removes(
        capacity in 1usize..64,
        k in 0usize..64,
        j in 0usize..64,
    ) {
        let k = k.min(capacity);
        let j = j.min(k);
        let ring = RingBuffer::new(capacity).unwrap();
        let mut reader = ring.reader().unwrap();

        for i in 0..k {
            ring.add(i);
        }
        prop_assert_eq!(ring.size(), k);

        prop_assert_eq!(reader.remove_n(j).len(), j);
        prop_assert_eq!(ring.size(), k - j);
    }
}

// =============================================================================
// Batch round-trip
// =============================================================================

proptest! {
    /// get_n followed by remove_n returns the same sequence, wherever the
    /// cursors sit.
    #[test]
    fn prop_get_then_remove(
        capacity in 1usize..32,
        offset in 0usize..32,
        fill in 0usize..32,
        n in 0usize..40,
    ) {
        let ring = RingBuffer::new(capacity).unwrap();
        let mut reader = ring.reader().unwrap();

        // Move the cursors away from slot 0
        for i in 0..offset.min(capacity) {
            ring.add(i);
        }
        reader.remove_all();

        for i in 0..fill.min(capacity) {
            ring.add(1000 + i);
        }

        let peeked: Vec<usize> = reader.get_n(n).into_iter().copied().collect();
        let removed = reader.remove_n(n);
        prop_assert_eq!(peeked.len(), n.min(fill.min(capacity)));
        prop_assert_eq!(peeked, removed);
    }
}

// =============================================================================
// Shard routing
// =============================================================================

proptest! {
    /// The same item always maps to the same in-range shard, and draining
    /// every shard yields each inserted item exactly once.
    #[test]
    fn prop_sharded_routing(
        shards in 1usize..8,
        keys in prop::collection::hash_set(any::<i64>(), 0..100),
    ) {
        let buffer = ShardedRingBuffer::new(keys.len().max(1) * shards, shards).unwrap();

        for key in &keys {
            let shard = buffer.shard_for(key);
            prop_assert!(shard < shards);
            prop_assert_eq!(shard, buffer.shard_for(key));
            prop_assert!(buffer.add(*key));
        }

        let mut drained = Vec::new();
        for (shard, mut reader) in buffer.readers().unwrap().into_iter().enumerate() {
            for item in reader.remove_all() {
                prop_assert_eq!(buffer.shard_for(&item), shard);
                drained.push(item);
            }
        }

        prop_assert_eq!(drained.len(), keys.len());
        let drained: std::collections::HashSet<i64> = drained.into_iter().collect();
        prop_assert_eq!(drained, keys);
    }
}
