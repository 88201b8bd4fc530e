#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use futures::TryStreamExt;
use spitelog::{Record, SpiteLog, StoreConfig, Topic};

pub fn test_config(dir: &Path, records_per_file: u64) -> StoreConfig {
    StoreConfig::default()
        .with_data_dir(dir)
        .with_records_per_file(records_per_file)
}

pub async fn open_store(records_per_file: u64) -> (tempfile::TempDir, SpiteLog) {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let log = SpiteLog::open(test_config(dir.path(), records_per_file))
        .await
        .expect("open store");
    (dir, log)
}

pub async fn reopen_store(dir: &Path, records_per_file: u64) -> SpiteLog {
    SpiteLog::open(test_config(dir, records_per_file))
        .await
        .expect("reopen store")
}

pub fn topic_dir(dir: &Path, topic: &str) -> PathBuf {
    dir.join(topic)
}

pub fn payload(i: u64) -> Bytes {
    Bytes::from(format!("record-{i}"))
}

pub async fn write_n(topic: &Topic, n: u64) -> Vec<u64> {
    let mut offsets = Vec::with_capacity(n as usize);
    for i in 0..n {
        offsets.push(topic.write(payload(i)).await.expect("write"));
    }
    offsets
}

pub async fn read_all(topic: &Topic, offset: u64, count: u64) -> Vec<Record> {
    topic
        .read(offset, count)
        .expect("range in bounds")
        .into_stream()
        .try_collect()
        .await
        .expect("read range")
}

pub async fn eventually<T>(
    timeout: Duration,
    interval: Duration,
    mut f: impl FnMut() -> Option<T>,
) -> T {
    let start = std::time::Instant::now();
    loop {
        if let Some(v) = f() {
            return v;
        }
        if start.elapsed() > timeout {
            panic!("condition not met within {:?}", timeout);
        }
        tokio::time::sleep(interval).await;
    }
}
