//! Caller-side re-submission of transiently failed records

use std::thread;

use crate::driver::{BatchContext, BatchSummary, FailureReason, RecordFailure};
use crate::submit::{SubmissionResult, Submitter};

/// Re-submit retryable transport failures in `summary` according to
/// `ctx.retry`, updating the counts in place. Returns how many recovered.
///
/// Rejected records and permanent failures are left untouched. Stops early
/// once nothing retryable remains or cancellation is requested.
pub fn retry_transient(
    submitter: &Submitter<'_>,
    summary: &mut BatchSummary,
    ctx: &BatchContext<'_>,
) -> usize {
    let mut recovered = 0;

    for attempt in 1..=ctx.retry.max_retries {
        let pending = summary.retryable_failures();
        if pending == 0 || ctx.cancel.is_cancelled() {
            break;
        }
        let delay = ctx.retry.backoff(attempt);
        log::info!(
            "{}: retrying {pending} records in {delay:?} (attempt {attempt}/{})",
            ctx.label,
            ctx.retry.max_retries
        );
        thread::sleep(delay);

        let failures = std::mem::take(&mut summary.failures);
        for failure in failures {
            if !failure.is_retryable() || ctx.cancel.is_cancelled() {
                summary.failures.push(failure);
                continue;
            }
            let RecordFailure { record_id, reason } = failure;
            let document = match reason {
                FailureReason::Transport { document, .. } => document,
                reason => {
                    summary.failures.push(RecordFailure { record_id, reason });
                    continue;
                }
            };

            let result = {
                let _permit = ctx.gate.acquire();
                submitter.submit(&record_id, &document)
            };
            match result {
                SubmissionResult::Indexed { .. } => {
                    summary.transport_failed -= 1;
                    summary.indexed += 1;
                    if document.submitted.is_none() {
                        summary.undated += 1;
                    }
                    recovered += 1;
                }
                SubmissionResult::TransportFailed { doc_id, error } => {
                    summary.failures.push(RecordFailure {
                        record_id,
                        reason: FailureReason::Transport {
                            doc_id,
                            error,
                            document,
                        },
                    });
                }
                // submit() never validates
                SubmissionResult::Rejected(e) => {
                    summary.transport_failed -= 1;
                    summary.rejected += 1;
                    summary.failures.push(RecordFailure {
                        record_id,
                        reason: FailureReason::Rejected(e),
                    });
                }
            }
        }
    }
    recovered
}
