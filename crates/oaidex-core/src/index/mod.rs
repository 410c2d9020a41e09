//! Search index client seam.
//!
//! The pipeline only ever talks to [`IndexClient`]. [`ElasticClient`] speaks
//! the Elasticsearch/OpenSearch REST API; [`MemoryIndex`] keeps documents in
//! process for dry runs and tests.

mod elastic;
mod memory;

pub use elastic::{ElasticClient, ElasticSettings};
pub use memory::MemoryIndex;

use serde_json::Value;

use crate::error::TransportError;

/// Acknowledgement for one indexed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedDocument {
    pub id: String,
    pub index: String,
    /// `created` or `updated`
    pub result: String,
}

/// A stored document as returned by get/search
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub source: Value,
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub total: u64,
    pub hits: Vec<StoredDocument>,
}

/// Server identity reported by a successful ping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Operations the pipeline and the read-side commands need from an index.
///
/// Implementations must be safe to share between batch workers.
pub trait IndexClient: Send + Sync {
    /// Confirm the endpoint answers
    fn ping(&self) -> Result<ServerInfo, TransportError>;

    /// Create `index` with `mapping` unless it already exists.
    /// Returns whether it was created.
    fn ensure_index(&self, index: &str, mapping: &Value) -> Result<bool, TransportError>;

    /// Create or overwrite document `id`
    fn index_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
    ) -> Result<IndexedDocument, TransportError>;

    fn document_exists(&self, index: &str, id: &str) -> Result<bool, TransportError>;

    fn get_document(&self, index: &str, id: &str) -> Result<Option<StoredDocument>, TransportError>;

    /// Exact term query on one field
    fn search_term(
        &self,
        index: &str,
        field: &str,
        value: &str,
        from: usize,
        size: usize,
    ) -> Result<SearchHits, TransportError>;
}
