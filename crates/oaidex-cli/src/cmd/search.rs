//! `oaidex search` - exact term query on one field

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Cell;

use oaidex_core::IndexClient;
use serde_json::Value;

use super::{clip, table};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Term to match exactly
    pub term: String,

    /// Field to query
    #[arg(short, long, default_value = "title")]
    pub field: String,

    /// Number of hits to show
    #[arg(short, long, default_value_t = 10)]
    pub size: usize,

    /// Offset of the first hit
    #[arg(long, default_value_t = 0)]
    pub from: usize,
}

pub fn run(args: SearchArgs, config: &Config) -> Result<()> {
    let client = super::connect(config)?;
    let hits = client
        .search_term(&config.index.name, &args.field, &args.term, args.from, args.size)
        .with_context(|| format!("Search on {} failed", config.index.name))?;

    let mut rows = table(&["Title", "Submitted", "Identifier"]);
    for hit in &hits.hits {
        rows.add_row(vec![
            Cell::new(clip(text(&hit.source, "title"), 70)),
            Cell::new(text(&hit.source, "submitted")),
            Cell::new(text(&hit.source, "identifier")),
        ]);
    }

    println!("{rows}");
    eprintln!(
        "{} of {} hits for {}:{:?}",
        hits.hits.len(),
        hits.total,
        args.field,
        args.term
    );
    Ok(())
}

fn text<'a>(source: &'a Value, field: &str) -> &'a str {
    source.get(field).and_then(Value::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_missing_fields_are_empty() {
        let source = serde_json::json!({ "title": "Partial cubes", "authors": ["A"] });
        assert_eq!(text(&source, "title"), "Partial cubes");
        assert_eq!(text(&source, "submitted"), "");
        assert_eq!(text(&source, "authors"), "");
    }
}
