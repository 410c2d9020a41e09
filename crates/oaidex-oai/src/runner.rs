//! Multi-file orchestration for an indexing run

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use oaidex_core::{CancelToken, IndexClient, Semaphore, WorkQueue};

use crate::config::Config;
use crate::driver::{BatchContext, BatchObserver, BatchSummary, RecordFailure};
use crate::parser::DecodeError;
use crate::submit::Submitter;
use crate::worker::{batch_label, process_file};

/// Resolve the input path into the batch files to process.
///
/// A directory expands to the regular files directly inside it whose names
/// match `pattern`, sorted by path. A file is returned as-is.
pub fn resolve_inputs(input: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        bail!("input path {} does not exist", input.display());
    }
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let dir = glob::Pattern::escape(&input.to_string_lossy());
    let full = format!("{dir}/{pattern}");
    let mut files: Vec<PathBuf> = glob::glob(&full)
        .with_context(|| format!("invalid file pattern {pattern:?}"))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// A batch file that could not be decoded
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: DecodeError,
}

/// A record-level failure together with the batch it came from
#[derive(Debug)]
pub struct BatchFailure {
    pub batch: String,
    pub failure: RecordFailure,
}

/// Summary of an indexing run
#[derive(Debug)]
pub struct RunSummary {
    pub total_files: usize,
    pub completed_files: usize,
    pub failed_files: usize,
    /// Files never started because the run was cancelled
    pub skipped_files: usize,
    pub total_records: usize,
    pub indexed: usize,
    pub rejected: usize,
    pub transport_failed: usize,
    pub skipped_records: usize,
    pub undated: usize,
    pub file_failures: Vec<FileFailure>,
    pub record_failures: Vec<BatchFailure>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn empty() -> Self {
        Self {
            total_files: 0,
            completed_files: 0,
            failed_files: 0,
            skipped_files: 0,
            total_records: 0,
            indexed: 0,
            rejected: 0,
            transport_failed: 0,
            skipped_records: 0,
            undated: 0,
            file_failures: Vec::new(),
            record_failures: Vec::new(),
            cancelled: false,
            elapsed: Duration::ZERO,
        }
    }

    /// Any file or record failed
    pub fn has_failures(&self) -> bool {
        self.failed_files > 0 || self.rejected > 0 || self.transport_failed > 0
    }

    fn absorb(&mut self, label: String, batch: BatchSummary) {
        self.completed_files += 1;
        self.total_records += batch.total;
        self.indexed += batch.indexed;
        self.rejected += batch.rejected;
        self.transport_failed += batch.transport_failed;
        self.skipped_records += batch.skipped;
        self.undated += batch.undated;
        self.cancelled |= batch.cancelled;
        self.record_failures
            .extend(batch.failures.into_iter().map(|failure| BatchFailure {
                batch: label.clone(),
                failure,
            }));
    }

    pub fn log(&self) {
        log::info!("=== Indexing Summary ===");
        log::info!(
            "Files: {}/{} completed ({} failed)",
            self.completed_files,
            self.total_files,
            self.failed_files
        );
        log::info!(
            "Records: {} indexed of {} ({} rejected, {} transport failures, {} undated)",
            self.indexed,
            self.total_records,
            self.rejected,
            self.transport_failed,
            self.undated
        );
        if self.cancelled {
            log::warn!(
                "Cancelled: {} records and {} files not attempted",
                self.skipped_records,
                self.skipped_files
            );
        }
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
        if self.indexed > 0 {
            let rate = self.indexed as f64 / self.elapsed.as_secs_f64().max(f64::EPSILON);
            log::info!("Throughput: {:.0} records/sec", rate);
        }
    }
}

enum FileOutcome {
    Done(BatchSummary),
    Failed(DecodeError),
    NotStarted,
}

/// Index every batch file under `config.input` into `config.index`.
///
/// Files are handed to `config.workers` workers through a shared queue; a file
/// that fails to decode is recorded and the run continues. Returns an error
/// only when the input cannot be resolved or the pool cannot be built.
pub fn run(
    config: &Config,
    client: &dyn IndexClient,
    observer: &dyn BatchObserver,
    cancel: &CancelToken,
) -> Result<RunSummary> {
    let start = Instant::now();

    let mut files = resolve_inputs(&config.input, &config.pattern)?;
    if let Some(limit) = config.max_files {
        files.truncate(limit);
    }
    if files.is_empty() {
        log::warn!(
            "No files matching {:?} in {}",
            config.pattern,
            config.input.display()
        );
        return Ok(RunSummary::empty());
    }

    let workers = config.workers.max(1);
    log::info!(
        "Indexing {} files into {} with {} workers ({} submissions in flight)",
        files.len(),
        config.index,
        workers,
        config.max_in_flight
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(config.max_in_flight))
        .thread_name(|i| format!("oaidex-{i}"))
        .build()
        .context("Failed to create thread pool")?;

    let submitter = Submitter::new(client, config.index.as_str());
    let gate = Semaphore::new(config.max_in_flight);
    let queue = WorkQueue::new(files);
    let outcomes: Mutex<Vec<(usize, PathBuf, FileOutcome)>> = Mutex::new(Vec::new());

    pool.scope(|s| {
        for _ in 0..workers {
            s.spawn(|_| {
                while let Some((pos, path)) = queue.next() {
                    let outcome = if cancel.is_cancelled() {
                        FileOutcome::NotStarted
                    } else {
                        let label = batch_label(path);
                        let ctx = BatchContext {
                            label: &label,
                            cancel,
                            gate: &gate,
                            observer,
                            retry: config.retry,
                        };
                        match process_file(path, &submitter, &ctx) {
                            Ok(summary) => FileOutcome::Done(summary),
                            Err(e) => {
                                log::error!("{label}: {e}");
                                FileOutcome::Failed(e)
                            }
                        }
                    };
                    outcomes
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((pos, path.clone(), outcome));
                }
            });
        }
    });

    let mut outcomes = outcomes
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    outcomes.sort_by_key(|(pos, _, _)| *pos);

    let mut summary = RunSummary::empty();
    summary.total_files = queue.total();
    for (_, path, outcome) in outcomes {
        match outcome {
            FileOutcome::Done(batch) => summary.absorb(batch_label(&path), batch),
            FileOutcome::Failed(error) => {
                summary.failed_files += 1;
                summary.file_failures.push(FileFailure { path, error });
            }
            FileOutcome::NotStarted => {
                summary.skipped_files += 1;
                summary.cancelled = true;
            }
        }
    }
    summary.elapsed = start.elapsed();
    summary.log();

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn run_summary_empty() {
        let summary = RunSummary::empty();
        assert_eq!(summary.total_files, 0);
        assert_eq!(summary.indexed, 0);
        assert!(!summary.has_failures());
        assert_eq!(summary.elapsed, Duration::ZERO);
    }

    #[test]
    fn run_summary_log_does_not_panic() {
        let mut summary = RunSummary::empty();
        summary.total_files = 3;
        summary.completed_files = 2;
        summary.failed_files = 1;
        summary.indexed = 100;
        summary.cancelled = true;
        summary.elapsed = Duration::from_secs(2);
        summary.log();
        assert!(summary.has_failures());
    }

    #[test]
    fn resolve_missing_path_is_error() {
        let err = resolve_inputs(Path::new("/definitely/not/here"), "*.gz").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn resolve_directory_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xml.gz", "a.xml.gz", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("sub.gz")).unwrap();

        let files = resolve_inputs(dir.path(), "*.gz").unwrap();
        let names: Vec<_> = files.iter().map(|p| batch_label(p)).collect();
        assert_eq!(names, vec!["a.xml.gz", "b.xml.gz"]);
    }

    #[test]
    fn resolve_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.xml");
        fs::write(&path, b"").unwrap();
        assert_eq!(resolve_inputs(&path, "*.gz").unwrap(), vec![path]);
    }

    #[test]
    fn empty_directory_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            input: dir.path().to_path_buf(),
            ..Config::default()
        };
        let index = oaidex_core::MemoryIndex::new();
        let summary = run(
            &config,
            &index,
            &crate::driver::NoopObserver,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(summary.total_files, 0);
        assert!(!summary.has_failures());
    }
}
