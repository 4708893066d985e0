//! Producer/consumer pipeline demo.
//!
//! Run with: `cargo run -p ringfifo --features demo --bin demo`
//! Set `RUST_LOG=ringfifo=trace` to see per-batch events.

use ringfifo::{Config, ConsumerConfig, RingBuffer, ShardedRingBuffer};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PRODUCERS: u32 = 10;
const PER_PRODUCER: u32 = 2_000;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    demo_single_reader()?;
    demo_sharded()?;
    demo_backpressure()?;

    info!("all demos completed");
    Ok(())
}

/// 10 producers, one batch-draining reader.
fn demo_single_reader() -> Result<(), Box<dyn std::error::Error>> {
    let ring = RingBuffer::<(u32, u32)>::with_config(Config::new(10_000, 1, true))?;
    let mut reader = ring.reader()?;
    let remaining = Arc::new(AtomicUsize::new(PRODUCERS as usize));
    let started = Instant::now();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|id| {
            let ring = ring.clone();
            let remaining = Arc::clone(&remaining);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    ring.add((id, i));
                }
                info!("producer {} finished {} items", id, PER_PRODUCER);
                remaining.fetch_sub(1, Ordering::AcqRel);
            })
        })
        .collect();

    let mut collected = HashSet::new();
    let total = reader.drain_until(
        &ConsumerConfig::default(),
        || remaining.load(Ordering::Acquire) == 0,
        &mut |batch: &[&(u32, u32)]| {
            info!("processing batch of {}", batch.len());
            collected.extend(batch.iter().map(|item| **item));
        },
    );

    for producer in producers {
        producer.join().map_err(|_| "producer panicked")?;
    }

    info!(
        "single reader: {} items ({} distinct) in {:?}, metrics {:?}",
        total,
        collected.len(),
        started.elapsed(),
        ring.metrics()
    );
    Ok(())
}

/// Keyed items over 4 shards, one reader thread per shard.
fn demo_sharded() -> Result<(), Box<dyn std::error::Error>> {
    let buffer = Arc::new(ShardedRingBuffer::<String>::with_config(Config::new(
        4_096, 4, true,
    ))?);
    let readers = buffer.readers()?;
    let remaining = Arc::new(AtomicUsize::new(PRODUCERS as usize));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|id| {
            let buffer = Arc::clone(&buffer);
            let remaining = Arc::clone(&remaining);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    buffer.add(format!("user-{}-event-{}", id, i));
                }
                remaining.fetch_sub(1, Ordering::AcqRel);
            })
        })
        .collect();

    let consumers: Vec<_> = readers
        .into_iter()
        .enumerate()
        .map(|(shard, mut reader)| {
            let remaining = Arc::clone(&remaining);
            thread::spawn(move || {
                let total = reader.drain_until(
                    &ConsumerConfig::low_latency(),
                    || remaining.load(Ordering::Acquire) == 0,
                    &mut |_: &[&String]| {},
                );
                info!("shard {} drained {} items", shard, total);
                total
            })
        })
        .collect();

    for producer in producers {
        producer.join().map_err(|_| "producer panicked")?;
    }
    let mut total = 0;
    for consumer in consumers {
        total += consumer.join().map_err(|_| "consumer panicked")?;
    }

    info!("sharded: {} items, metrics {:?}", total, buffer.metrics());
    Ok(())
}

/// A full buffer stalls writers until the reader frees space; a stuck
/// writer can be interrupted.
fn demo_backpressure() -> Result<(), Box<dyn std::error::Error>> {
    let ring = RingBuffer::<u64>::with_config(Config::new(4, 1, true))?;
    let mut reader = ring.reader()?;
    for i in 0..4 {
        ring.add(i);
    }

    let writer = {
        let ring = ring.clone();
        thread::spawn(move || ring.add(4))
    };
    thread::sleep(Duration::from_millis(50));
    info!("buffer full: {}, writer finished: {}", ring.is_full(), writer.is_finished());

    let head = reader.remove();
    let accepted = writer.join().map_err(|_| "writer panicked")?;
    info!("removed {:?}, blocked writer accepted: {}", head, accepted);

    let stuck = {
        let ring = ring.clone();
        thread::spawn(move || ring.add(5))
    };
    while !stuck.is_finished() {
        ring.interrupt_writers();
        thread::sleep(Duration::from_millis(5));
    }
    let accepted = stuck.join().map_err(|_| "writer panicked")?;
    info!("interrupted writer accepted: {}", accepted);

    info!("remaining: {:?}, metrics {:?}", reader.remove_all(), ring.metrics());
    Ok(())
}
