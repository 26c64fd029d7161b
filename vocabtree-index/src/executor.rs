//! # Executors
//!
//! Abstract parallel-for used by tree construction and batch matching.
//!
//! A task receives a sub-range of the requested index range; all tasks
//! together cover the range exactly once. `execute` blocks until every task
//! has finished.

use std::ops::Range;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use vocabtree_core::config::WorkerConfig;
use vocabtree_core::error::{Error, Result};

/// Parallel-for over disjoint index ranges
pub trait Executor: Send + Sync {
    /// Run `task` over `range`, split into chunks of at least `min_chunk`
    fn execute(&self, range: Range<usize>, min_chunk: usize, task: &(dyn Fn(Range<usize>) + Sync));

    /// Whether `execute` may run tasks concurrently
    fn is_parallel(&self) -> bool;
}

/// Runs the whole range on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialExecutor;

impl Executor for SerialExecutor {
    fn execute(&self, range: Range<usize>, _min_chunk: usize, task: &(dyn Fn(Range<usize>) + Sync)) {
        if !range.is_empty() {
            task(range);
        }
    }

    fn is_parallel(&self) -> bool {
        false
    }
}

/// Executor backed by rayon, either the global pool or a dedicated one
pub struct RayonExecutor {
    pool: Option<ThreadPool>,
}

impl RayonExecutor {
    /// Use rayon's global thread pool
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Create a dedicated pool with `threads` workers
    pub fn with_threads(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("vocabtree-worker-{}", i))
            .build()
            .map_err(|e| Error::Internal {
                message: format!("Failed to create worker pool: {}", e),
            })?;
        Ok(Self { pool: Some(pool) })
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

impl Executor for RayonExecutor {
    fn execute(&self, range: Range<usize>, min_chunk: usize, task: &(dyn Fn(Range<usize>) + Sync)) {
        let chunks = split_range(range, min_chunk, self.threads());
        let run = || chunks.into_par_iter().for_each(|chunk| task(chunk));
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn is_parallel(&self) -> bool {
        self.threads() > 1
    }
}

impl std::fmt::Debug for RayonExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayonExecutor")
            .field("dedicated", &self.pool.is_some())
            .field("threads", &self.threads())
            .finish()
    }
}

/// Build the executor described by a worker configuration.
///
/// `None` uses rayon's global pool, `Some(1)` runs serially.
pub fn executor_from_config(config: &WorkerConfig) -> Result<Box<dyn Executor>> {
    match config.threads {
        None => Ok(Box::new(RayonExecutor::global())),
        Some(0) => Err(Error::Configuration {
            message: "workers.threads must be at least 1".to_string(),
        }),
        Some(1) => Ok(Box::new(SerialExecutor)),
        Some(threads) => Ok(Box::new(RayonExecutor::with_threads(threads)?)),
    }
}

/// Split `range` into at most `workers` chunks of at least `min_chunk` items
fn split_range(range: Range<usize>, min_chunk: usize, workers: usize) -> Vec<Range<usize>> {
    let len = range.len();
    if len == 0 {
        return Vec::new();
    }
    let per_worker = (len + workers.max(1) - 1) / workers.max(1);
    let chunk = per_worker.max(min_chunk).max(1);

    (range.start..range.end)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(range.end))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn covered(executor: &dyn Executor, range: Range<usize>, min_chunk: usize) -> Vec<usize> {
        let seen = Mutex::new(Vec::new());
        executor.execute(range, min_chunk, &|r: Range<usize>| seen.lock().extend(r));
        let mut seen = seen.into_inner();
        seen.sort_unstable();
        seen
    }

    #[test]
    fn test_split_range() {
        assert_eq!(split_range(0..10, 3, 2), vec![0..5, 5..10]);
        assert_eq!(split_range(0..10, 8, 4), vec![0..8, 8..10]);
        assert_eq!(split_range(5..6, 50, 16), vec![5..6]);
        assert!(split_range(3..3, 1, 4).is_empty());
    }

    #[test]
    fn test_serial_covers_range() {
        assert_eq!(covered(&SerialExecutor, 0..100, 7), (0..100).collect::<Vec<_>>());
        assert!(!SerialExecutor.is_parallel());
    }

    #[test]
    fn test_rayon_covers_range() {
        let executor = RayonExecutor::with_threads(4).unwrap();
        assert!(executor.is_parallel());
        assert_eq!(covered(&executor, 10..1010, 50), (10..1010).collect::<Vec<_>>());
    }

    #[test]
    fn test_executor_from_config() {
        let serial = executor_from_config(&WorkerConfig { threads: Some(1) }).unwrap();
        assert!(!serial.is_parallel());
        let pooled = executor_from_config(&WorkerConfig { threads: Some(3) }).unwrap();
        assert!(pooled.is_parallel());
        assert!(executor_from_config(&WorkerConfig { threads: Some(0) }).is_err());
    }
}
