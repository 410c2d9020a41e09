//! Elasticsearch / OpenSearch REST client

use reqwest::{Method, StatusCode, Url};
use serde_json::{Value, json};

use super::{IndexClient, IndexedDocument, SearchHits, ServerInfo, StoredDocument};
use crate::error::TransportError;
use crate::stream::{HttpTimeouts, SHARED_RUNTIME, http_client};

/// Longest slice of an error body kept in a message
const MAX_ERROR_BODY: usize = 300;

/// Connection settings for one endpoint
#[derive(Debug, Clone)]
pub struct ElasticSettings {
    pub endpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeouts: HttpTimeouts,
}

impl Default for ElasticSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9200".to_string(),
            username: None,
            password: None,
            timeouts: HttpTimeouts::default(),
        }
    }
}

/// Blocking facade over async reqwest, shareable across rayon workers.
pub struct ElasticClient {
    client: reqwest::Client,
    endpoint: Url,
    credentials: Option<(String, Option<String>)>,
}

struct Reply {
    status: StatusCode,
    body: Vec<u8>,
}

impl ElasticClient {
    /// Build the client without touching the network.
    pub fn new(settings: &ElasticSettings) -> Result<Self, TransportError> {
        let endpoint = Url::parse(&settings.endpoint).map_err(|e| {
            TransportError::invalid_input(format!("invalid endpoint {:?}: {e}", settings.endpoint))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(TransportError::invalid_input(format!(
                "endpoint {:?} cannot carry a path",
                settings.endpoint
            )));
        }
        Ok(Self {
            client: http_client(settings.timeouts)?,
            endpoint,
            credentials: settings
                .username
                .clone()
                .map(|user| (user, settings.password.clone())),
        })
    }

    /// Build the client and confirm the endpoint answers.
    pub fn connect(settings: &ElasticSettings) -> Result<Self, TransportError> {
        let client = Self::new(settings)?;
        let info = client.ping()?;
        log::info!(
            "Connected to {} ({} {})",
            client.endpoint,
            info.name,
            info.version
        );
        Ok(client)
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn send(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Reply, TransportError> {
        let body = body.map(serde_json::to_vec).transpose()?;
        SHARED_RUNTIME.handle().block_on(async {
            let mut req = self.client.request(method, url);
            if let Some((user, pass)) = &self.credentials {
                req = req.basic_auth(user, pass.as_ref());
            }
            if let Some(body) = body {
                req = req
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body);
            }
            let resp = req.send().await.map_err(|e| TransportError::from_reqwest(&e))?;
            let status = resp.status();
            let body = resp
                .bytes()
                .await
                .map_err(|e| TransportError::from_reqwest(&e))?;
            Ok(Reply {
                status,
                body: body.to_vec(),
            })
        })
    }

    fn expect_json(reply: Reply) -> Result<Value, TransportError> {
        if !reply.status.is_success() {
            return Err(http_failure(&reply));
        }
        Ok(serde_json::from_slice(&reply.body)?)
    }
}

fn http_failure(reply: &Reply) -> TransportError {
    let text = String::from_utf8_lossy(&reply.body);
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| {
            v.pointer("/error/reason")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| text.chars().take(MAX_ERROR_BODY).collect());
    TransportError::Http {
        status: Some(reply.status.as_u16()),
        message,
    }
}

/// `hits.total` is a number before ES 7 and `{ "value": n }` after
fn parse_total(hits: &Value) -> u64 {
    match hits.get("total") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(obj) => obj.get("value").and_then(Value::as_u64).unwrap_or(0),
        None => 0,
    }
}

fn parse_hits(body: &Value) -> SearchHits {
    let Some(hits) = body.get("hits") else {
        return SearchHits::default();
    };
    let docs = hits
        .get("hits")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .map(|hit| StoredDocument {
                    id: hit
                        .get("_id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    source: hit.get("_source").cloned().unwrap_or(Value::Null),
                })
                .collect()
        })
        .unwrap_or_default();
    SearchHits {
        total: parse_total(hits),
        hits: docs,
    }
}

impl IndexClient for ElasticClient {
    fn ping(&self) -> Result<ServerInfo, TransportError> {
        let body = Self::expect_json(self.send(Method::GET, self.url(&[]), None)?)?;
        Ok(ServerInfo {
            name: body
                .get("cluster_name")
                .or_else(|| body.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            version: body
                .pointer("/version/number")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        })
    }

    fn ensure_index(&self, index: &str, mapping: &Value) -> Result<bool, TransportError> {
        let reply = self.send(Method::HEAD, self.url(&[index]), None)?;
        match reply.status {
            s if s.is_success() => Ok(false),
            StatusCode::NOT_FOUND => {
                Self::expect_json(self.send(Method::PUT, self.url(&[index]), Some(mapping))?)?;
                log::info!("Created index {index}");
                Ok(true)
            }
            _ => Err(http_failure(&reply)),
        }
    }

    fn index_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
    ) -> Result<IndexedDocument, TransportError> {
        let reply = self.send(Method::PUT, self.url(&[index, "_doc", id]), Some(body))?;
        let ack = Self::expect_json(reply)?;
        let field = |name: &str, fallback: &str| {
            ack.get(name)
                .and_then(Value::as_str)
                .unwrap_or(fallback)
                .to_string()
        };
        Ok(IndexedDocument {
            id: field("_id", id),
            index: field("_index", index),
            result: field("result", "unknown"),
        })
    }

    fn document_exists(&self, index: &str, id: &str) -> Result<bool, TransportError> {
        let reply = self.send(Method::HEAD, self.url(&[index, "_doc", id]), None)?;
        match reply.status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(http_failure(&reply)),
        }
    }

    fn get_document(&self, index: &str, id: &str) -> Result<Option<StoredDocument>, TransportError> {
        let reply = self.send(Method::GET, self.url(&[index, "_doc", id]), None)?;
        if reply.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = Self::expect_json(reply)?;
        if body.get("found").and_then(Value::as_bool) != Some(true) {
            return Ok(None);
        }
        Ok(Some(StoredDocument {
            id: id.to_string(),
            source: body.get("_source").cloned().unwrap_or(Value::Null),
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
        let query = json!({
            "query": { "term": { field: value } },
            "from": from,
            "size": size,
        });
        let reply = self.send(Method::POST, self.url(&[index, "_search"]), Some(&query))?;
        Ok(parse_hits(&Self::expect_json(reply)?))
    }
}
