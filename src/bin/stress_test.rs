//! SpiteLog Stress Test Binary
//!
//! A standalone binary for stress testing SpiteLog under high concurrency.
//! Run with: `cargo run --bin stress_test -- [OPTIONS]`
//!
//! This is separate from the regular test suite because:
//! 1. It can take a long time to run
//! 2. It's configurable via command-line arguments
//! 3. It reports detailed metrics
//!
//! Set `RUST_LOG=spitelog=debug` to watch chunk and file handle activity.
//!
//! # Examples
//!
//! ```bash
//! # Default test: 10000 records, 10 concurrent writers, one topic
//! cargo run --release --bin stress_test
//!
//! # Many small chunks
//! cargo run --release --bin stress_test -- --events 20000 --records-per-file 100
//!
//! # Several topics sharing the store
//! cargo run --release --bin stress_test -- --topics 8 --concurrency 32
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing_subscriber::EnvFilter;

use spitelog::{SpiteLog, StoreConfig, DEFAULT_CATCHUP_BATCH_SIZE};

/// Stress test configuration
struct Config {
    /// Total number of records to write
    num_events: usize,
    /// Number of concurrent writer tasks
    concurrency: usize,
    /// Number of topics the writers spread over
    num_topics: usize,
    /// Chunk capacity
    records_per_file: u64,
    /// Data directory (or temp if None)
    data_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_events: 10_000,
            concurrency: 10,
            num_topics: 1,
            records_per_file: 1_000,
            data_dir: None,
        }
    }
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--events" | "-e" => {
                i += 1;
                config.num_events = args[i].parse().expect("Invalid --events value");
            }
            "--concurrency" | "-c" => {
                i += 1;
                config.concurrency = args[i].parse().expect("Invalid --concurrency value");
            }
            "--topics" | "-t" => {
                i += 1;
                config.num_topics = args[i].parse().expect("Invalid --topics value");
            }
            "--records-per-file" | "-r" => {
                i += 1;
                config.records_per_file =
                    args[i].parse().expect("Invalid --records-per-file value");
            }
            "--dir" | "-d" => {
                i += 1;
                config.data_dir = Some(args[i].clone());
            }
            "--help" | "-h" => {
                println!(
                    r#"SpiteLog Stress Test

Usage: stress_test [OPTIONS]

Options:
  -e, --events <N>            Total records to write (default: 10000)
  -c, --concurrency <N>       Concurrent writer tasks (default: 10)
  -t, --topics <N>            Topics to spread writes over (default: 1)
  -r, --records-per-file <N>  Chunk capacity (default: 1000)
  -d, --dir <PATH>            Data directory (default: temp dir)
  -h, --help                  Show this help
"#
                );
                std::process::exit(0);
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config.concurrency = config.concurrency.max(1);
    config.num_topics = config.num_topics.max(1);
    config
}

fn topic_name(index: usize) -> String {
    format!("stress-{}", index)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = parse_args();

    println!("SpiteLog Stress Test");
    println!("====================");
    println!("Events:           {}", config.num_events);
    println!("Concurrency:      {}", config.concurrency);
    println!("Topics:           {}", config.num_topics);
    println!("Records per file: {}", config.records_per_file);
    println!();

    let data_dir = config.data_dir.clone().map(PathBuf::from).unwrap_or_else(|| {
        std::env::temp_dir().join(format!("spitelog-stress-{}", std::process::id()))
    });
    println!("Data dir:         {}", data_dir.display());
    println!();

    let store_config = StoreConfig::default()
        .with_data_dir(&data_dir)
        .with_records_per_file(config.records_per_file);
    let log = SpiteLog::open(store_config).await.unwrap();

    // Lengths before this run, so an existing directory can be reused
    let mut initial_lengths = HashMap::new();
    for t in 0..config.num_topics {
        let name = topic_name(t);
        initial_lengths.insert(name.clone(), log.length(&name).await.unwrap());
    }

    // Live followers: one per topic, must see every new record exactly once
    let events_per_task = config.num_events / config.concurrency;
    let total = (events_per_task * config.concurrency) as u64;
    let mut followers = Vec::new();
    for t in 0..config.num_topics {
        let name = topic_name(t);
        let from = initial_lengths[&name];
        let expected = (0..config.concurrency)
            .filter(|task_id| task_id % config.num_topics == t)
            .count() as u64
            * events_per_task as u64;
        let mut sub = log.subscribe(&name, from).await.unwrap();
        followers.push(tokio::spawn(async move {
            let mut next = from;
            for _ in 0..expected {
                let record = sub.next().await.expect("subscription ended").unwrap();
                assert_eq!(record.offset, next, "follower of {} saw a gap", name);
                next += 1;
            }
            expected
        }));
    }

    // Metrics
    let events_written = Arc::new(AtomicU64::new(0));
    let errors = Arc::new(AtomicU64::new(0));

    println!("Starting stress test...");
    let start = Instant::now();

    let mut handles = Vec::new();
    for task_id in 0..config.concurrency {
        let log = log.clone();
        let events_written = events_written.clone();
        let errors = errors.clone();
        let name = topic_name(task_id % config.num_topics);

        handles.push(tokio::spawn(async move {
            let mut offsets = Vec::with_capacity(events_per_task);
            for i in 0..events_per_task {
                let payload = Bytes::from(format!("stress-event-{}-{}", task_id, i));
                match log.write(&name, payload).await {
                    Ok(offset) => {
                        events_written.fetch_add(1, Ordering::Relaxed);
                        offsets.push(offset);
                    }
                    Err(e) => {
                        eprintln!("write failed: {}", e);
                        errors.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            (name, offsets)
        }));
    }

    let mut offsets_by_topic: HashMap<String, Vec<u64>> = HashMap::new();
    for handle in handles {
        let (name, offsets) = handle.await.unwrap();
        offsets_by_topic.entry(name).or_default().extend(offsets);
    }

    let elapsed = start.elapsed();

    // Report metrics
    let written = events_written.load(Ordering::Relaxed);
    let error_count = errors.load(Ordering::Relaxed);

    println!();
    println!("Results");
    println!("-------");
    println!("Events written:  {}", written);
    println!("Errors:          {}", error_count);
    println!("Duration:        {:?}", elapsed);
    println!(
        "Throughput:      {:.2} events/sec",
        written as f64 / elapsed.as_secs_f64()
    );
    println!();

    // Verify invariants
    println!("Verifying invariants...");
    assert_eq!(written, total, "not every write succeeded");

    for (name, mut offsets) in offsets_by_topic {
        let from = initial_lengths[&name];
        offsets.sort_unstable();
        for (i, offset) in offsets.iter().enumerate() {
            let expected = from + i as u64;
            assert_eq!(
                *offset, expected,
                "Gap in offsets of {}: expected {}, got {}",
                name, expected, offset
            );
        }

        let length = log.length(&name).await.unwrap();
        assert_eq!(length, from + offsets.len() as u64);

        let mut reader = log
            .read(&name, from, offsets.len() as u64)
            .await
            .unwrap();
        let mut read_back = 0u64;
        while let Some(record) = reader.next().await {
            let record = record.unwrap();
            assert!(record.value.starts_with(b"stress-event-"));
            read_back += 1;
        }
        assert_eq!(read_back, offsets.len() as u64);
    }
    println!("  Offsets:           contiguous per topic ✓");
    println!("  Data integrity:    all records readable ✓");

    let mut followed = 0;
    for follower in followers {
        followed += tokio::time::timeout(Duration::from_secs(30), follower)
            .await
            .expect("follower timed out")
            .unwrap();
    }
    assert_eq!(followed, total);
    println!(
        "  Live tailing:      {} records, no gaps (catch-up batch {}) ✓",
        followed, DEFAULT_CATCHUP_BATCH_SIZE
    );

    // Restart: a fresh store must recover the same lengths. The first store
    // is gone before the second opens, so one engine owns each directory.
    let mut final_lengths = HashMap::new();
    for t in 0..config.num_topics {
        let name = topic_name(t);
        let length = log.length(&name).await.unwrap();
        final_lengths.insert(name, length);
    }
    let store_config = log.config().clone();
    log.shutdown().await.unwrap();
    drop(log);

    let reopened = SpiteLog::open(store_config).await.unwrap();
    for (name, length) in &final_lengths {
        assert_eq!(
            reopened.length(name).await.unwrap(),
            *length,
            "recovered length of {} differs",
            name
        );
    }
    println!("  Recovery:          lengths match after reopen ✓");

    println!();
    println!("Stress test PASSED ✓");
}
