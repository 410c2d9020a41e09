//! `oaidex parse` - decode batch files and list their records

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::Cell;

use oaidex_core::fmt_num;
use oaidex_oai::{decode_file, resolve_inputs};

use super::{clip, table};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Batch file, or directory of batch files
    pub path: PathBuf,

    /// File name pattern for directory input
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Maximum number of records to list
    #[arg(short = 'l', long, default_value_t = 50)]
    pub limit: usize,
}

pub fn run(args: ParseArgs, config: &Config) -> Result<()> {
    let pattern = args.pattern.as_deref().unwrap_or(&config.input.pattern);
    let files = resolve_inputs(&args.path, pattern)?;

    let mut rows = table(&["Identifier", "Title", "Authors", "Date"]);
    let mut listed = 0usize;
    let mut total = 0usize;
    let mut failed = 0usize;

    for path in &files {
        let batch = match decode_file(path) {
            Ok(batch) => batch,
            Err(e) => {
                log::error!("{}: {e}", path.display());
                failed += 1;
                continue;
            }
        };
        total += batch.len();
        for record in batch.iter().take(args.limit.saturating_sub(listed)) {
            rows.add_row(vec![
                Cell::new(record.identifier()),
                Cell::new(clip(&record.metadata.title, 60)),
                Cell::new(clip(&record.metadata.creators.join("; "), 40)),
                Cell::new(&record.metadata.date),
            ]);
            listed += 1;
        }
    }

    println!("{rows}");
    eprintln!(
        "{} records in {} files ({} listed, {} files failed)",
        fmt_num(total),
        files.len(),
        listed,
        failed
    );

    if failed > 0 {
        anyhow::bail!("{failed} files could not be decoded");
    }
    Ok(())
}
