//! Record → IndexDocument normalization

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::parser::Record;

/// Canonical document shape submitted to the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub title: String,
    pub authors: Vec<String>,
    pub subjects: BTreeSet<String>,
    pub descriptions: Vec<String>,
    /// Absent when the record date is missing or unparseable
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub submitted: Option<NaiveDate>,
    pub identifier: Url,
    /// Completion inputs for title type-ahead
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub suggest: Vec<String>,
}

/// Why a record cannot become a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Header identifier is blank, so no stable document id exists
    MissingRecordIdentity,
    /// Metadata carries no `identifier`
    MissingSourceIdentifier,
    /// Metadata `identifier` is not an absolute URI
    InvalidIdentifier { value: String, reason: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRecordIdentity => write!(f, "header identifier is empty"),
            Self::MissingSourceIdentifier => write!(f, "metadata identifier is empty"),
            Self::InvalidIdentifier { value, reason } => {
                write!(f, "identifier {value:?} is not a valid URI: {reason}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Map one record to its index document. Pure; never touches the index.
pub fn normalize(record: &Record) -> Result<IndexDocument, ValidationError> {
    if record.identifier().trim().is_empty() {
        return Err(ValidationError::MissingRecordIdentity);
    }
    let meta = &record.metadata;
    let identifier = parse_identifier(&meta.source_identifier)?;
    let submitted = parse_date(&meta.date);
    if submitted.is_none() && !meta.date.trim().is_empty() {
        log::debug!(
            "{}: unparseable date {:?}, leaving submitted empty",
            record.identifier(),
            meta.date
        );
    }

    Ok(IndexDocument {
        title: meta.title.clone(),
        authors: meta.creators.clone(),
        subjects: meta.subjects.iter().cloned().collect(),
        descriptions: meta.descriptions.clone(),
        submitted,
        identifier,
        suggest: if meta.title.trim().is_empty() {
            Vec::new()
        } else {
            vec![meta.title.clone()]
        },
    })
}

fn parse_identifier(raw: &str) -> Result<Url, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::MissingSourceIdentifier);
    }
    Url::parse(raw).map_err(|e| ValidationError::InvalidIdentifier {
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Calendar date from `YYYY-MM-DD`, an RFC 3339 timestamp, or `YYYY-MM`.
///
/// Anything else is `None`; no date is ever invented.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    // Year-month only: first day of the month
    NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Header, Metadata};

    fn record(id: &str, source: &str, date: &str) -> Record {
        Record {
            header: Header {
                identifier: id.to_string(),
                datestamp: "2007-05-23".to_string(),
                set_spec: "math".to_string(),
                status: None,
            },
            metadata: Metadata {
                title: "A determinant of Stirling cycle numbers".to_string(),
                creators: vec!["Callan, David".to_string(), "Another, Author".to_string()],
                subjects: vec![
                    "Mathematics - Combinatorics".to_string(),
                    "05A15".to_string(),
                    "05A15".to_string(),
                ],
                descriptions: vec!["We show ...".to_string(), "Comment: 11 pages".to_string()],
                date: date.to_string(),
                source_identifier: source.to_string(),
            },
        }
    }

    #[test]
    fn normalize_full_record() {
        let rec = record(
            "oai:arXiv.org:0704.0004",
            "http://arxiv.org/abs/0704.0004",
            "2007-03-30",
        );
        let doc = normalize(&rec).unwrap();
        assert_eq!(doc.title, "A determinant of Stirling cycle numbers");
        assert_eq!(doc.authors, vec!["Callan, David", "Another, Author"]);
        assert_eq!(doc.subjects.len(), 2);
        assert!(doc.subjects.contains("05A15"));
        assert_eq!(doc.descriptions[0], "We show ...");
        assert_eq!(doc.descriptions[1], "Comment: 11 pages");
        assert_eq!(doc.submitted, NaiveDate::from_ymd_opt(2007, 3, 30));
        assert_eq!(doc.identifier.as_str(), "http://arxiv.org/abs/0704.0004");
        assert_eq!(doc.suggest, vec![doc.title.clone()]);
    }

    #[test]
    fn bad_date_is_absent_not_invented() {
        let rec = record("oai:x:1", "http://arxiv.org/abs/1", "sometime in spring");
        let doc = normalize(&rec).unwrap();
        assert_eq!(doc.submitted, None);

        let rec = record("oai:x:1", "http://arxiv.org/abs/1", "");
        assert_eq!(normalize(&rec).unwrap().submitted, None);
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_date("2007-03-30"), NaiveDate::from_ymd_opt(2007, 3, 30));
        assert_eq!(
            parse_date("2007-03-30T12:00:00Z"),
            NaiveDate::from_ymd_opt(2007, 3, 30)
        );
        assert_eq!(parse_date("2007-03"), NaiveDate::from_ymd_opt(2007, 3, 1));
        assert_eq!(parse_date(" 2007-03-30 "), NaiveDate::from_ymd_opt(2007, 3, 30));
        assert_eq!(parse_date("2007-13-01"), None);
        assert_eq!(parse_date("2007"), None);
    }

    #[test]
    fn invalid_identifier_rejected() {
        let rec = record("oai:x:1", "arxiv 0704.0004", "2007-03-30");
        match normalize(&rec) {
            Err(ValidationError::InvalidIdentifier { value, .. }) => {
                assert_eq!(value, "arxiv 0704.0004")
            }
            other => panic!("expected invalid identifier, got {other:?}"),
        }
    }

    #[test]
    fn missing_identifier_rejected() {
        let rec = record("oai:x:1", "  ", "2007-03-30");
        assert_eq!(
            normalize(&rec),
            Err(ValidationError::MissingSourceIdentifier)
        );
    }

    #[test]
    fn blank_header_identity_rejected() {
        let rec = record(" ", "http://arxiv.org/abs/1", "2007-03-30");
        assert_eq!(normalize(&rec), Err(ValidationError::MissingRecordIdentity));
    }

    #[test]
    fn empty_title_has_no_suggest() {
        let mut rec = record("oai:x:1", "http://arxiv.org/abs/1", "2007-03-30");
        rec.metadata.title.clear();
        let doc = normalize(&rec).unwrap();
        assert!(doc.title.is_empty());
        assert!(doc.suggest.is_empty());
    }

    #[test]
    fn serialized_shape() {
        let rec = record("oai:x:1", "http://arxiv.org/abs/1", "2007-03-30");
        let json = serde_json::to_value(normalize(&rec).unwrap()).unwrap();
        assert_eq!(json["submitted"], "2007-03-30");
        assert_eq!(json["identifier"], "http://arxiv.org/abs/1");
        assert_eq!(json["authors"][0], "Callan, David");
        assert_eq!(json["subjects"].as_array().unwrap().len(), 2);
        assert_eq!(json["suggest"][0], "A determinant of Stirling cycle numbers");

        let mut rec = rec;
        rec.metadata.date = "n/a".to_string();
        let json = serde_json::to_value(normalize(&rec).unwrap()).unwrap();
        assert!(json.get("submitted").is_none());
    }

    #[test]
    fn serialized_document_reads_back() {
        let rec = record("oai:x:1", "http://arxiv.org/abs/1", "2007-03-30");
        let doc = normalize(&rec).unwrap();
        let back: IndexDocument =
            serde_json::from_value(serde_json::to_value(&doc).unwrap()).unwrap();
        assert_eq!(back, doc);
    }
}
