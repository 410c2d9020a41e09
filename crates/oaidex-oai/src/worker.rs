//! Worker for processing one OAI-PMH batch file

use std::path::Path;

use crate::driver::{BatchContext, BatchSummary, process_batch};
use crate::parser::{DecodeError, decode_file};
use crate::submit::Submitter;

/// Decode `path` and index every record in it.
///
/// On a decode failure nothing from the file has been submitted.
pub fn process_file(
    path: &Path,
    submitter: &Submitter<'_>,
    ctx: &BatchContext<'_>,
) -> Result<BatchSummary, DecodeError> {
    let batch = decode_file(path)?;
    log::debug!("{}: decoded {} records", ctx.label, batch.len());

    let summary = process_batch(batch, submitter, ctx);
    summary.log(ctx.label);
    Ok(summary)
}

/// Display label for a batch file: its file name, or the full path if it has none.
pub fn batch_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
