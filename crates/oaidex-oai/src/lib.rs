//! oaidex OAI - OAI-PMH Dublin Core indexing pipeline
//!
//! Decodes OAI-PMH `ListRecords` responses (plain or gzip), normalizes each
//! record into a search document and submits it to an index.
//!
//! # Features
//!
//! - Structural header/metadata pairing per `record`, validated per batch
//! - Stable document ids derived from the record identifier (BLAKE3)
//! - Parallel batches and records with rayon, bounded in-flight submissions
//! - Per-record failure isolation, caller-side retry of transient failures
//!
//! # Example
//!
//! ```ignore
//! use oaidex_core::{CancelToken, MemoryIndex};
//! use oaidex_oai::{Config, NoopObserver, run};
//!
//! let config = Config {
//!     input: "harvest/".into(),
//!     max_files: Some(1),
//!     ..Default::default()
//! };
//!
//! let index = MemoryIndex::new();
//! let summary = run(&config, &index, &NoopObserver, &CancelToken::new())?;
//! println!("Indexed {} records", summary.indexed);
//! ```

pub mod config;
pub mod driver;
pub mod parser;
pub mod retry;
pub mod runner;
pub mod schema;
pub mod submit;
pub mod transform;
pub mod worker;

#[cfg(test)]
mod testing;

// Re-exports
pub use config::Config;
pub use driver::{
    BatchContext, BatchObserver, BatchSummary, FailureReason, NoopObserver, RecordFailure,
    process_batch,
};
pub use parser::{Batch, DecodeError, Header, Metadata, Record, decode_batch, decode_file};
pub use retry::retry_transient;
pub use runner::{BatchFailure, FileFailure, RunSummary, resolve_inputs, run};
pub use schema::{DEFAULT_INDEX, paper_mapping};
pub use submit::{SubmissionResult, Submitter, document_id};
pub use transform::{IndexDocument, ValidationError, normalize};
