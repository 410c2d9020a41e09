//! Index clients with scripted failures, for unit tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use oaidex_core::{
    CancelToken, IndexClient, IndexedDocument, MemoryIndex, SearchHits, ServerInfo,
    StoredDocument, TransportError,
};
use serde_json::Value;

/// Wraps a [`MemoryIndex`]; fails the first `failures` writes with `status`,
/// and records the highest number of concurrent writes.
pub struct ScriptedIndex {
    pub inner: MemoryIndex,
    failures: Mutex<usize>,
    status: u16,
    delay: Duration,
    /// Raised from inside the first write, while it holds its permit
    cancel_on_write: Option<CancelToken>,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl ScriptedIndex {
    pub fn failing(failures: usize, status: u16) -> Self {
        Self {
            inner: MemoryIndex::new(),
            failures: Mutex::new(failures),
            status,
            delay: Duration::ZERO,
            cancel_on_write: None,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::failing(0, 503)
        }
    }

    pub fn cancel_on_write(mut self, cancel: CancelToken) -> Self {
        self.cancel_on_write = Some(cancel);
        self
    }

    pub fn writes(&self) -> usize {
        self.inner.writes()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl IndexClient for ScriptedIndex {
    fn ping(&self) -> Result<ServerInfo, TransportError> {
        self.inner.ping()
    }

    fn ensure_index(&self, index: &str, mapping: &Value) -> Result<bool, TransportError> {
        self.inner.ensure_index(index, mapping)
    }

    fn index_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
    ) -> Result<IndexedDocument, TransportError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if let Some(cancel) = &self.cancel_on_write {
            cancel.cancel();
        }
        let fail = {
            let mut left = self.failures.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                true
            } else {
                false
            }
        };
        let result = if fail {
            Err(TransportError::Http {
                status: Some(self.status),
                message: "scripted failure".to_string(),
            })
        } else {
            self.inner.index_document(index, id, body)
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn document_exists(&self, index: &str, id: &str) -> Result<bool, TransportError> {
        self.inner.document_exists(index, id)
    }

    fn get_document(&self, index: &str, id: &str) -> Result<Option<StoredDocument>, TransportError> {
        self.inner.get_document(index, id)
    }

    fn search_term(
        &self,
        index: &str,
        field: &str,
        value: &str,
        from: usize,
        size: usize,
    ) -> Result<SearchHits, TransportError> {
        self.inner.search_term(index, field, value, from, size)
    }
}
