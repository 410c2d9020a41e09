//! Batch driver: normalize and submit every record of one batch
//!
//! Records are independent. A rejected or failed record is counted and
//! reported; it never stops the others. Only the decoder can fail a file.

use oaidex_core::{CancelToken, RetryPolicy, Semaphore, TransportError};
use rayon::prelude::*;

use crate::parser::{Batch, Record};
use crate::retry::retry_transient;
use crate::submit::{SubmissionResult, Submitter};
use crate::transform::{IndexDocument, ValidationError, normalize};

/// Progress callbacks. All methods default to no-ops.
///
/// `record_done` is called from worker threads, possibly concurrently.
pub trait BatchObserver: Sync {
    fn batch_started(&self, _label: &str, _records: usize) {}

    fn record_done(&self, _label: &str, _record_id: &str, _result: &SubmissionResult) {}

    fn batch_finished(&self, _label: &str, _summary: &BatchSummary) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Shared state a batch runs under
pub struct BatchContext<'a> {
    /// Name used in logs and observer calls (usually the file name)
    pub label: &'a str,
    pub cancel: &'a CancelToken,
    /// Bounds in-flight submissions across all batches sharing it
    pub gate: &'a Semaphore,
    pub observer: &'a dyn BatchObserver,
    pub retry: RetryPolicy,
}

/// Why one record did not end up in the index
#[derive(Debug)]
pub enum FailureReason {
    Rejected(ValidationError),
    /// The document is kept so the failed subset can be re-submitted
    Transport {
        doc_id: String,
        error: TransportError,
        document: Box<IndexDocument>,
    },
}

#[derive(Debug)]
pub struct RecordFailure {
    pub record_id: String,
    pub reason: FailureReason,
}

impl RecordFailure {
    pub fn is_retryable(&self) -> bool {
        matches!(&self.reason, FailureReason::Transport { error, .. } if error.is_retryable())
    }
}

impl std::fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            FailureReason::Rejected(e) => write!(f, "{}: rejected: {e}", self.record_id),
            FailureReason::Transport { error, .. } => write!(
                f,
                "{}: {} transport failure: {error}",
                self.record_id,
                error.kind_label()
            ),
        }
    }
}

/// Aggregated outcome of one batch.
///
/// `total == indexed + rejected + transport_failed + skipped` always holds;
/// `skipped` is non-zero only when the batch was cancelled.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub indexed: usize,
    pub rejected: usize,
    pub transport_failed: usize,
    pub skipped: usize,
    /// Indexed without a submitted date
    pub undated: usize,
    pub failures: Vec<RecordFailure>,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn is_balanced(&self) -> bool {
        self.total == self.indexed + self.rejected + self.transport_failed + self.skipped
    }

    pub fn retryable_failures(&self) -> usize {
        self.failures.iter().filter(|f| f.is_retryable()).count()
    }

    pub fn log(&self, label: &str) {
        log::info!(
            "{label}: {} records, {} indexed, {} rejected, {} transport failures{}",
            self.total,
            self.indexed,
            self.rejected,
            self.transport_failed,
            if self.cancelled {
                format!(", {} skipped (cancelled)", self.skipped)
            } else {
                String::new()
            }
        );
    }
}

/// Per-record result before aggregation; `None` means cancelled before submission.
struct Processed {
    record_id: String,
    result: SubmissionResult,
    document: Option<IndexDocument>,
}

fn process_record(record: Record, submitter: &Submitter<'_>, ctx: &BatchContext<'_>) -> Option<Processed> {
    if ctx.cancel.is_cancelled() {
        return None;
    }
    let normalized = normalize(&record);
    let record_id = record.header.identifier;

    let processed = match normalized {
        Err(e) => {
            log::debug!("{}: rejecting {record_id}: {e}", ctx.label);
            Processed {
                record_id,
                result: SubmissionResult::Rejected(e),
                document: None,
            }
        }
        Ok(document) => {
            let _permit = ctx.gate.acquire();
            // Cancellation may have been raised while waiting for a permit
            if ctx.cancel.is_cancelled() {
                return None;
            }
            let result = submitter.submit(&record_id, &document);
            Processed {
                record_id,
                result,
                document: Some(document),
            }
        }
    };
    ctx.observer
        .record_done(ctx.label, &processed.record_id, &processed.result);
    Some(processed)
}

/// Process one batch end-to-end and return its summary.
///
/// Records are normalized and submitted in parallel on the current rayon
/// pool; at most as many submissions as `ctx.gate` has permits are in flight. Retryable
/// transport failures are re-submitted per `ctx.retry` before returning.
pub fn process_batch(batch: Batch, submitter: &Submitter<'_>, ctx: &BatchContext<'_>) -> BatchSummary {
    let total = batch.len();
    ctx.observer.batch_started(ctx.label, total);

    let outcomes: Vec<Option<Processed>> = batch
        .records
        .into_par_iter()
        .map(|record| process_record(record, submitter, ctx))
        .collect();

    let mut summary = BatchSummary {
        total,
        ..BatchSummary::default()
    };

    for outcome in outcomes {
        let Some(processed) = outcome else {
            summary.skipped += 1;
            continue;
        };
        match processed.result {
            SubmissionResult::Indexed { .. } => {
                summary.indexed += 1;
                if processed.document.is_some_and(|d| d.submitted.is_none()) {
                    summary.undated += 1;
                }
            }
            SubmissionResult::Rejected(e) => {
                summary.rejected += 1;
                summary.failures.push(RecordFailure {
                    record_id: processed.record_id,
                    reason: FailureReason::Rejected(e),
                });
            }
            SubmissionResult::TransportFailed { doc_id, error } => {
                summary.transport_failed += 1;
                // A transport failure always comes from a normalized document
                if let Some(document) = processed.document {
                    summary.failures.push(RecordFailure {
                        record_id: processed.record_id,
                        reason: FailureReason::Transport {
                            doc_id,
                            error,
                            document: Box::new(document),
                        },
                    });
                }
            }
        }
    }
    summary.cancelled = summary.skipped > 0;

    if summary.transport_failed > 0 && !summary.cancelled {
        let recovered = retry_transient(submitter, &mut summary, ctx);
        if recovered > 0 {
            log::info!("{}: recovered {recovered} records on retry", ctx.label);
        }
    }

    ctx.observer.batch_finished(ctx.label, &summary);
    summary
}
