//! ringfifo - Bounded Circular FIFO with Writer Backpressure
//!
//! A fixed-capacity ring buffer that many threads write into and a single
//! reader drains in batches. Writers block while the buffer is full; the
//! reader peeks a batch, processes it, and removes it in insertion order.
//!
//! # Key Features
//!
//! - Fixed capacity, no reallocation
//! - Blocking `add` with interrupt and timeout variants
//! - Lock-free reader behind a single, non-`Clone` [`Reader`] handle
//! - Batch peek (`get_n`) and batch pop (`remove_n`)
//! - [`ShardedRingBuffer`]: N shards routed by a stable item hash, one
//!   reader per shard
//!
//! # Example
//!
//! ```
//! use ringfifo::RingBuffer;
//! use std::thread;
//!
//! let ring = RingBuffer::<u64>::new(1024).unwrap();
//! let mut reader = ring.reader().unwrap();
//!
//! let producers: Vec<_> = (0..4)
//!     .map(|p| {
//!         let ring = ring.clone();
//!         thread::spawn(move || {
//!             for i in 0..100 {
//!                 ring.add(p * 1000 + i);
//!             }
//!         })
//!     })
//!     .collect();
//! for producer in producers {
//!     producer.join().unwrap();
//! }
//!
//! // Peek a batch, process it, then remove it
//! let batch = reader.get_n(256);
//! let sum: u64 = batch.iter().copied().sum();
//! let n = batch.len();
//! reader.remove_n(n);
//!
//! assert!(sum > 0);
//! assert_eq!(reader.size(), 400 - n);
//! ```

mod config;
mod consumer;
mod error;
mod gate;
mod invariants;
mod metrics;
mod ring;
mod sharded;

pub use config::{Config, ConsumerConfig, SHARDED_CONFIG, SINGLE_READER_CONFIG};
pub use consumer::BatchProcessor;
pub use error::RingError;
pub use metrics::{Metrics, MetricsSnapshot};
pub use ring::{Reader, RingBuffer};
pub use sharded::{ShardedRingBuffer, StableHasher};
