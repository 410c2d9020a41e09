//! `oaidex setup` - provision the index

use anyhow::{Context, Result};
use clap::Args;

use oaidex_core::IndexClient;
use oaidex_oai::paper_mapping;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Primary shards (default from config)
    #[arg(long)]
    pub shards: Option<u32>,

    /// Replicas per shard (default from config)
    #[arg(long)]
    pub replicas: Option<u32>,
}

pub fn run(args: SetupArgs, config: &Config) -> Result<()> {
    let client = super::connect(config)?;
    let mapping = paper_mapping(
        args.shards.unwrap_or(config.index.shards),
        args.replicas.unwrap_or(config.index.replicas),
    );

    let created = client
        .ensure_index(&config.index.name, &mapping)
        .with_context(|| format!("Failed to create index {}", config.index.name))?;

    if created {
        eprintln!("Created index {}", config.index.name);
    } else {
        eprintln!("Index {} already exists", config.index.name);
    }
    Ok(())
}
