//! oaidex Core - shared infrastructure for the indexing pipeline
//!
//! Logging, progress bars, cancellation, admission control, input
//! decompression, and the search index client seam.

pub mod error;
pub mod index;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod semaphore;
pub mod shutdown;
pub mod stream;
pub mod work_queue;

// Re-exports for convenience
pub use error::TransportError;
pub use index::{
    ElasticClient, ElasticSettings, IndexClient, IndexedDocument, MemoryIndex, SearchHits,
    ServerInfo, StoredDocument,
};
pub use logging::{ProgressLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use retry::RetryPolicy;
pub use semaphore::{Permit, Semaphore};
pub use shutdown::{CancelToken, shutdown_token};
pub use stream::{HttpTimeouts, SHARED_RUNTIME, gunzip_if_needed};
pub use work_queue::WorkQueue;
