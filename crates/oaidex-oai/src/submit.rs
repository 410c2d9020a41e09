//! Index submission with identity-derived document ids

use oaidex_core::{IndexClient, TransportError};

use crate::transform::{IndexDocument, ValidationError};

/// Document id for a record: hex BLAKE3 of its trimmed header identifier.
///
/// Depends only on record identity, so re-indexing a record overwrites its
/// previous document wherever it appears in whichever batch.
pub fn document_id(record_identifier: &str) -> String {
    blake3::hash(record_identifier.trim().as_bytes())
        .to_hex()
        .to_string()
}

/// Outcome of one record
#[derive(Debug)]
pub enum SubmissionResult {
    Indexed { doc_id: String, index: String },
    Rejected(ValidationError),
    TransportFailed {
        doc_id: String,
        error: TransportError,
    },
}

impl SubmissionResult {
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed { .. })
    }
}

/// Sends documents to one index. Never retries; see [`crate::retry`].
pub struct Submitter<'a> {
    client: &'a dyn IndexClient,
    index: String,
}

impl<'a> Submitter<'a> {
    pub fn new(client: &'a dyn IndexClient, index: impl Into<String>) -> Self {
        Self {
            client,
            index: index.into(),
        }
    }

    /// Submit one document under the id derived from `record_identifier`.
    pub fn submit(&self, record_identifier: &str, document: &IndexDocument) -> SubmissionResult {
        let doc_id = document_id(record_identifier);
        let body = match serde_json::to_value(document) {
            Ok(body) => body,
            Err(e) => {
                return SubmissionResult::TransportFailed {
                    doc_id,
                    error: e.into(),
                };
            }
        };
        match self.client.index_document(&self.index, &doc_id, &body) {
            Ok(ack) => {
                log::trace!("{record_identifier}: {} as {}", ack.result, ack.id);
                SubmissionResult::Indexed {
                    doc_id: ack.id,
                    index: ack.index,
                }
            }
            Err(error) => {
                log::debug!("{record_identifier}: submission failed: {error}");
                SubmissionResult::TransportFailed { doc_id, error }
            }
        }
    }
}
