//! `oaidex index` - decode batch files and index their records

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Cell;
use indicatif::ProgressBar;
use rustc_hash::FxHashMap;

use oaidex_core::{IndexClient, MemoryIndex, SharedProgress, fmt_num};
use oaidex_oai::{
    BatchObserver, BatchSummary, FailureReason, RunSummary, SubmissionResult, paper_mapping,
};

use super::{clip, print_summary, table};
use crate::config::Config;

/// Failures listed individually before the rest are summarized
const FAILURE_ROWS: usize = 20;

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Batch file, or directory of batch files
    pub path: PathBuf,

    /// Index into an in-memory index instead of the configured endpoint
    #[arg(long)]
    pub dry_run: bool,

    /// Create the index with the paper mapping first if absent
    #[arg(long)]
    pub create_index: bool,

    /// File name pattern for directory input
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Number of batch files processed in parallel
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Maximum submissions in flight
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Maximum number of files to process
    #[arg(short = 'l', long)]
    pub limit: Option<usize>,
}

pub fn run(args: IndexArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let run_config = oaidex_oai::Config {
        input: args.path,
        index: config.index.name.clone(),
        pattern: args
            .pattern
            .unwrap_or_else(|| config.input.pattern.clone()),
        workers: args.workers.unwrap_or(config.workers.batches),
        max_in_flight: args.max_in_flight.unwrap_or(config.workers.max_in_flight),
        max_files: args.limit,
        retry: config.retry_policy(),
    };

    let client: Box<dyn IndexClient> = if args.dry_run {
        log::info!("Dry run: indexing into memory");
        Box::new(MemoryIndex::new())
    } else {
        Box::new(super::connect(config)?)
    };

    if args.create_index {
        let mapping = paper_mapping(config.index.shards, config.index.replicas);
        client
            .ensure_index(&run_config.index, &mapping)
            .with_context(|| format!("Failed to create index {}", run_config.index))?;
    }

    log::info!("Indexing {}", run_config.input.display());
    log::info!("  Index: {}", run_config.index);
    if !args.dry_run {
        log::info!("  Endpoint: {}", config.index.endpoint);
    }

    let observer = ProgressObserver::new(progress.clone());
    let summary = oaidex_oai::run(
        &run_config,
        client.as_ref(),
        &observer,
        oaidex_core::shutdown_token(),
    )?;

    report(&summary);

    if summary.cancelled {
        anyhow::bail!("Interrupted; {} records not attempted", summary.skipped_records);
    }
    if summary.has_failures() {
        anyhow::bail!(
            "{} files and {} records failed",
            summary.failed_files,
            summary.rejected + summary.transport_failed
        );
    }
    Ok(())
}

fn report(summary: &RunSummary) {
    print_summary(
        "Indexing",
        &[
            (
                "Files",
                format!(
                    "{}/{} ({} failed)",
                    summary.completed_files, summary.total_files, summary.failed_files
                ),
            ),
            (
                "Records",
                format!(
                    "{} indexed of {}",
                    fmt_num(summary.indexed),
                    fmt_num(summary.total_records)
                ),
            ),
            ("Rejected", fmt_num(summary.rejected)),
            ("Transport failures", fmt_num(summary.transport_failed)),
            ("Undated", fmt_num(summary.undated)),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ],
    );

    let failures = summary.file_failures.len() + summary.record_failures.len();
    if failures == 0 {
        return;
    }

    // File failures first, then record failures in batch order
    let file_rows = summary.file_failures.iter().map(|f| {
        (
            oaidex_oai::worker::batch_label(&f.path),
            "-".to_string(),
            f.error.to_string(),
        )
    });
    let record_rows = summary.record_failures.iter().map(|f| {
        let reason = match &f.failure.reason {
            FailureReason::Rejected(e) => format!("rejected: {e}"),
            FailureReason::Transport { error, .. } => format!("{}: {error}", error.kind_label()),
        };
        (f.batch.clone(), f.failure.record_id.clone(), reason)
    });

    let mut rows = table(&["Batch", "Record", "Failure"]);
    for (batch, record, reason) in file_rows.chain(record_rows).take(FAILURE_ROWS) {
        rows.add_row(vec![
            Cell::new(batch),
            Cell::new(record),
            Cell::new(clip(&reason, 80)),
        ]);
    }
    eprintln!("\n{rows}");
    if failures > FAILURE_ROWS {
        eprintln!("... and {} more", failures - FAILURE_ROWS);
    }
}

/// One progress bar per batch, advanced as records finish
struct ProgressObserver {
    progress: SharedProgress,
    bars: Mutex<FxHashMap<String, ProgressBar>>,
}

impl ProgressObserver {
    fn new(progress: SharedProgress) -> Self {
        Self {
            progress,
            bars: Mutex::new(FxHashMap::default()),
        }
    }

    fn with_bar(&self, label: &str, f: impl FnOnce(&ProgressBar)) {
        let bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pb) = bars.get(label) {
            f(pb);
        }
    }
}

impl BatchObserver for ProgressObserver {
    fn batch_started(&self, label: &str, records: usize) {
        let pb = self.progress.batch_bar(label, records as u64);
        self.bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(label.to_string(), pb);
    }

    fn record_done(&self, label: &str, _record_id: &str, result: &SubmissionResult) {
        self.with_bar(label, |pb| {
            pb.inc(1);
            if !result.is_indexed() {
                pb.set_message("with failures");
            }
        });
    }

    fn batch_finished(&self, label: &str, summary: &BatchSummary) {
        let pb = self
            .bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(label);
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        if summary.rejected + summary.transport_failed > 0 {
            self.progress.println(format!(
                "{label}: {} of {} records failed",
                summary.rejected + summary.transport_failed,
                summary.total
            ));
        }
    }
}
