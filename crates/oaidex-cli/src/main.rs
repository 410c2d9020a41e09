//! oaidex - index OAI-PMH harvests into a search index
//!
//! Decodes Dublin Core records from OAI-PMH batch files and indexes them
//! into Elasticsearch/OpenSearch, with commands to provision and query
//! the index.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "oaidex")]
#[command(about = "Index OAI-PMH Dublin Core harvests into Elasticsearch")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./oaidex.toml or ~/.config/oaidex/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Index endpoint URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Index name
    #[arg(long = "index-name", global = true)]
    index_name: Option<String>,

    /// Maximum retry rounds for transient failures
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Index a batch file or a directory of batch files
    Index(cmd::index::IndexArgs),
    /// Decode batch files and list their records without indexing
    Parse(cmd::parse::ParseArgs),
    /// Create the index with the paper mapping if absent
    Setup(cmd::setup::SetupArgs),
    /// Fetch one document by record identifier
    Get(cmd::get::GetArgs),
    /// Exact term search on one field
    Search(cmd::search::SearchArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(oaidex_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, progress bars show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    oaidex_core::init_logging(quiet, cli.debug, multi)?;

    let mut config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };
    if let Some(endpoint) = cli.endpoint {
        config.index.endpoint = endpoint;
    }
    if let Some(name) = cli.index_name {
        config.index.name = name;
    }
    if let Some(max_retries) = cli.max_retries {
        config.retry.max_retries = max_retries;
    }

    match cli.command {
        Command::Index(args) => {
            setup_signal_handler()?;
            cmd::index::run(args, &config, &progress)
        }
        Command::Parse(args) => cmd::parse::run(args, &config),
        Command::Setup(args) => cmd::setup::run(args, &config),
        Command::Get(args) => cmd::get::run(args, &config),
        Command::Search(args) => cmd::search::run(args, &config),
        Command::Config => {
            cmd::print_config(&config);
            Ok(())
        }
    }
}

/// First SIGINT/SIGTERM raises the shutdown token; the second exits at once.
fn setup_signal_handler() -> Result<()> {
    // Initialize before any handler can run
    let _ = oaidex_core::shutdown_token();

    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        // SAFETY: AtomicBool::swap and process::exit are async-signal-safe
        unsafe {
            signal_hook::low_level::register(signal, || {
                if oaidex_core::shutdown_token().cancel_again() {
                    std::process::exit(130);
                }
            })
        }
        .map_err(|e| anyhow::anyhow!("Failed to register handler for signal {signal}: {e}"))?;
    }
    Ok(())
}
