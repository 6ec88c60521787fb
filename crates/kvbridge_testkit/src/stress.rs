//! Concurrent load helpers.
//!
//! The engine supports many concurrent readers alongside a single writer;
//! these helpers drive a shared session from several threads.

use kvbridge_core::{Database, ReadOptions, WriteOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of reader threads.
    pub readers: usize,
    /// Number of distinct keys.
    pub key_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 500,
            readers: 4,
            key_count: 64,
        }
    }
}

/// Runs one writer thread and `config.readers` reader threads against `db`.
pub fn stress_readers_and_writer(db: Arc<Database>, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let record = |ok: bool, successful: &AtomicUsize, failed: &AtomicUsize| {
        if ok {
            successful.fetch_add(1, Ordering::Relaxed);
        } else {
            failed.fetch_add(1, Ordering::Relaxed);
        }
    };

    let mut handles = Vec::with_capacity(config.readers + 1);
    {
        let db = Arc::clone(&db);
        let successful = Arc::clone(&successful);
        let failed = Arc::clone(&failed);
        let (operations, key_count) = (config.operations, config.key_count);
        handles.push(thread::spawn(move || {
            for i in 0..operations {
                let key = format!("k{}", i % key_count);
                let ok = db
                    .put(WriteOptions::default(), key.as_bytes(), &i.to_le_bytes())
                    .is_ok();
                record(ok, &successful, &failed);
            }
        }));
    }
    for t in 0..config.readers {
        let db = Arc::clone(&db);
        let successful = Arc::clone(&successful);
        let failed = Arc::clone(&failed);
        let (operations, key_count) = (config.operations, config.key_count);
        handles.push(thread::spawn(move || {
            for i in 0..operations {
                let key = format!("k{}", (t + i) % key_count);
                let ok = db.get(ReadOptions::default(), key.as_bytes()).is_ok();
                record(ok, &successful, &failed);
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult {
        successful_ops: successful.load(Ordering::Relaxed),
        failed_ops: failed.load(Ordering::Relaxed),
        duration: start.elapsed(),
    }
}
