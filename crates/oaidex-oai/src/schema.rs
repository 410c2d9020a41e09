//! Index settings and field mapping for paper documents

use serde_json::{Value, json};

/// Default index name
pub const DEFAULT_INDEX: &str = "arxiv-papers";

/// Mapping matching the fields of [`IndexDocument`](crate::transform::IndexDocument)
pub fn paper_mapping(shards: u32, replicas: u32) -> Value {
    json!({
        "settings": {
            "number_of_shards": shards,
            "number_of_replicas": replicas
        },
        "mappings": {
            "properties": {
                "title": { "type": "text", "fielddata": true },
                "authors": { "type": "text", "store": true },
                "subjects": { "type": "keyword" },
                "descriptions": { "type": "text", "store": true },
                "submitted": { "type": "date", "format": "strict_date_optional_time" },
                "identifier": { "type": "keyword" },
                "suggest": { "type": "completion" }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Header, Metadata, Record};
    use crate::transform::normalize;

    #[test]
    fn field_types() {
        let mapping = paper_mapping(5, 1);
        let props = &mapping["mappings"]["properties"];
        assert_eq!(props["title"]["type"], "text");
        assert_eq!(props["title"]["fielddata"], true);
        assert_eq!(props["subjects"]["type"], "keyword");
        assert_eq!(props["identifier"]["type"], "keyword");
        assert_eq!(props["submitted"]["type"], "date");
        assert_eq!(props["suggest"]["type"], "completion");
        assert_eq!(mapping["settings"]["number_of_shards"], 5);
    }

    #[test]
    fn every_document_field_is_mapped() {
        let record = Record {
            header: Header {
                identifier: "oai:x:1".to_string(),
                ..Header::default()
            },
            metadata: Metadata {
                title: "T".to_string(),
                creators: vec!["A".to_string()],
                subjects: vec!["S".to_string()],
                descriptions: vec!["D".to_string()],
                date: "2001-01-01".to_string(),
                source_identifier: "http://arxiv.org/abs/1".to_string(),
            },
        };
        let doc = serde_json::to_value(normalize(&record).unwrap()).unwrap();
        let mapping = paper_mapping(1, 0);
        let props = mapping["mappings"]["properties"].as_object().unwrap();
        for field in doc.as_object().unwrap().keys() {
            assert!(props.contains_key(field), "unmapped field {field}");
        }
    }
}
