//! In-process index used for dry runs and tests

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::{IndexClient, IndexedDocument, SearchHits, ServerInfo, StoredDocument};
use crate::error::TransportError;

type Indices = BTreeMap<String, BTreeMap<String, Value>>;

/// Documents keyed by index then id; writes overwrite in place.
#[derive(Default)]
pub struct MemoryIndex {
    indices: Mutex<Indices>,
    writes: AtomicUsize,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Indices> {
        self.indices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Documents currently stored in `index`
    pub fn len(&self, index: &str) -> usize {
        self.lock().get(index).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, index: &str) -> bool {
        self.len(index) == 0
    }

    /// Total `index_document` calls, including overwrites
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

/// Term match: exact on strings, any element for arrays.
fn term_matches(field: Option<&Value>, value: &str) -> bool {
    match field {
        Some(Value::String(s)) => s == value,
        Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some(value)),
        _ => false,
    }
}

impl IndexClient for MemoryIndex {
    fn ping(&self) -> Result<ServerInfo, TransportError> {
        Ok(ServerInfo {
            name: "memory".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    fn ensure_index(&self, index: &str, _mapping: &Value) -> Result<bool, TransportError> {
        let mut indices = self.lock();
        if indices.contains_key(index) {
            return Ok(false);
        }
        indices.insert(index.to_string(), BTreeMap::new());
        Ok(true)
    }

    fn index_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
    ) -> Result<IndexedDocument, TransportError> {
        let previous = self
            .lock()
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), body.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(IndexedDocument {
            id: id.to_string(),
            index: index.to_string(),
            result: if previous.is_some() { "updated" } else { "created" }.to_string(),
        })
    }

    fn document_exists(&self, index: &str, id: &str) -> Result<bool, TransportError> {
        Ok(self
            .lock()
            .get(index)
            .is_some_and(|docs| docs.contains_key(id)))
    }

    fn get_document(&self, index: &str, id: &str) -> Result<Option<StoredDocument>, TransportError> {
        Ok(self
            .lock()
            .get(index)
            .and_then(|docs| docs.get(id))
            .map(|source| StoredDocument {
                id: id.to_string(),
                source: source.clone(),
            }))
    }

    fn search_term(
        &self,
        index: &str,
        field: &str,
        value: &str,
        from: usize,
        size: usize,
    ) -> Result<SearchHits, TransportError> {
        let indices = self.lock();
        let Some(docs) = indices.get(index) else {
            return Ok(SearchHits::default());
        };
        let matching: Vec<StoredDocument> = docs
            .iter()
            .filter(|(_, doc)| term_matches(doc.get(field), value))
            .map(|(id, doc)| StoredDocument {
                id: id.clone(),
                source: doc.clone(),
            })
            .collect();
        Ok(SearchHits {
            total: matching.len() as u64,
            hits: matching.into_iter().skip(from).take(size).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overwrite_keeps_one_document() {
        let idx = MemoryIndex::new();
        let first = idx.index_document("papers", "a", &json!({"title": "v1"})).unwrap();
        let second = idx.index_document("papers", "a", &json!({"title": "v2"})).unwrap();
        assert_eq!(first.result, "created");
        assert_eq!(second.result, "updated");
        assert_eq!(idx.len("papers"), 1);
        assert_eq!(idx.writes(), 2);
        let doc = idx.get_document("papers", "a").unwrap().unwrap();
        assert_eq!(doc.source["title"], "v2");
    }

    #[test]
    fn exists_and_missing() {
        let idx = MemoryIndex::new();
        idx.index_document("papers", "a", &json!({})).unwrap();
        assert!(idx.document_exists("papers", "a").unwrap());
        assert!(!idx.document_exists("papers", "b").unwrap());
        assert!(!idx.document_exists("other", "a").unwrap());
        assert!(idx.get_document("papers", "b").unwrap().is_none());
    }

    #[test]
    fn ensure_index_once() {
        let idx = MemoryIndex::new();
        assert!(idx.ensure_index("papers", &json!({})).unwrap());
        assert!(!idx.ensure_index("papers", &json!({})).unwrap());
        assert!(idx.is_empty("papers"));
    }

    #[test]
    fn term_search_strings_and_arrays() {
        let idx = MemoryIndex::new();
        idx.index_document("papers", "1", &json!({"subjects": ["math", "05A15"]}))
            .unwrap();
        idx.index_document("papers", "2", &json!({"subjects": ["physics"]}))
            .unwrap();
        idx.index_document("papers", "3", &json!({"subjects": "math"}))
            .unwrap();

        let hits = idx.search_term("papers", "subjects", "math", 0, 10).unwrap();
        assert_eq!(hits.total, 2);
        let ids: Vec<_> = hits.hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        let page = idx.search_term("papers", "subjects", "math", 1, 10).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.hits.len(), 1);
    }
}
