//! `oaidex get` - fetch one indexed document

use anyhow::{Context, Result};
use clap::Args;

use oaidex_core::IndexClient;
use oaidex_oai::document_id;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// OAI record identifier, e.g. oai:arXiv.org:0704.0004
    pub record_id: String,
}

pub fn run(args: GetArgs, config: &Config) -> Result<()> {
    let client = super::connect(config)?;
    let doc_id = document_id(&args.record_id);

    let doc = client
        .get_document(&config.index.name, &doc_id)
        .with_context(|| format!("Failed to fetch {}", args.record_id))?
        .with_context(|| format!("{} not found in {}", args.record_id, config.index.name))?;

    println!("{}", serde_json::to_string_pretty(&doc.source)?);
    Ok(())
}
