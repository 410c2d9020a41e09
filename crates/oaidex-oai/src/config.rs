//! Indexing run configuration

use std::path::PathBuf;
use std::thread;

use oaidex_core::RetryPolicy;

use crate::schema::DEFAULT_INDEX;

/// Runtime configuration for one indexing run
#[derive(Debug, Clone)]
pub struct Config {
    /// Batch file or directory of batch files
    pub input: PathBuf,
    /// Target index name
    pub index: String,
    /// Glob matched against file names when the input is a directory
    pub pattern: String,
    /// Batches processed concurrently
    pub workers: usize,
    /// Submissions in flight across all workers
    pub max_in_flight: usize,
    /// Maximum files to process (for testing)
    pub max_files: Option<usize>,
    pub retry: RetryPolicy,
}

/// `min(available cpus, 8)`
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(8)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data"),
            index: DEFAULT_INDEX.to_string(),
            pattern: "*.gz".to_string(),
            workers: default_workers(),
            max_in_flight: 8,
            max_files: None,
            retry: RetryPolicy::default(),
        }
    }
}
