//! Azure AI Search REST client.

use crate::{SearchHit, VectorStore};
use async_trait::async_trait;
use foundry_core::{
    ConfigError, FoundryError, FoundryResult, IndexSchema, ProjectLogEntry, SearchConfig,
    VECTOR_FIELD,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const SERVICE: &str = "search";

/// Every stored field except the vector.
const RESULT_FIELDS: &str = "id,title,type,customer_name,short_summary,context,project_name,\
tags,reference_url,architecture,creation_date,modified_date";

/// Search service client authenticated with an admin key.
pub struct AzureSearchClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    api_version: String,
}

impl AzureSearchClient {
    pub fn new(config: &SearchConfig, timeout: Duration) -> FoundryResult<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "AZURE_AI_SEARCH_ENDPOINT".to_string(),
                value: config.endpoint.clone(),
                reason: "not an absolute http(s) URL".to_string(),
            })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "http_client".to_string(),
                value: String::new(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
        })
    }

    /// `{endpoint}/{segments..}?api-version=..`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        url
    }

    async fn send(&self, request: RequestBuilder) -> FoundryResult<Response> {
        let request = match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        };
        request.send().await.map_err(send_error)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> FoundryResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(response).await);
    }
    response.json().await.map_err(|e| {
        FoundryError::invalid_response(SERVICE, format!("Failed to parse response: {}", e))
    })
}

async fn status_error(response: Response) -> FoundryError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    FoundryError::from_http_status(SERVICE, status, error_message(&text))
}

fn send_error(e: reqwest::Error) -> FoundryError {
    if e.is_timeout() {
        FoundryError::transient(SERVICE, format!("request timed out: {}", e))
    } else {
        FoundryError::transient(SERVICE, format!("HTTP request failed: {}", e))
    }
}

fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }
    #[derive(Deserialize)]
    struct Detail {
        message: String,
    }
    serde_json::from_str::<Envelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct IndexBatch<'a> {
    value: Vec<IndexAction<'a>>,
}

#[derive(Debug, Serialize)]
struct IndexAction<'a> {
    #[serde(rename = "@search.action")]
    action: &'static str,
    #[serde(flatten)]
    entry: &'a ProjectLogEntry,
}

#[derive(Debug, Deserialize)]
struct ValueList<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexingResult {
    key: String,
    status: bool,
    #[serde(default)]
    error_message: Option<String>,
    status_code: u16,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    select: &'static str,
    top: usize,
    vector_queries: Vec<VectorQuery<'a>>,
}

#[derive(Debug, Serialize)]
struct VectorQuery<'a> {
    kind: &'static str,
    vector: &'a [f32],
    fields: &'static str,
    k: usize,
}

#[derive(Debug, Deserialize)]
struct WireHit {
    #[serde(rename = "@search.score")]
    score: f32,
    #[serde(flatten)]
    entry: ProjectLogEntry,
}

impl From<WireHit> for SearchHit {
    fn from(hit: WireHit) -> Self {
        SearchHit {
            entry: hit.entry.without_vector(),
            score: hit.score,
        }
    }
}

fn check_indexing(results: Vec<IndexingResult>, id: &str) -> FoundryResult<()> {
    let result = results
        .into_iter()
        .find(|r| r.key == id)
        .ok_or_else(|| {
            FoundryError::invalid_response(SERVICE, format!("no indexing result for key {}", id))
        })?;
    if result.status {
        return Ok(());
    }
    Err(FoundryError::from_http_status(
        SERVICE,
        result.status_code,
        result
            .error_message
            .unwrap_or_else(|| format!("indexing of {} failed", id)),
    ))
}

// ============================================================================
// VECTOR STORE
// ============================================================================

#[async_trait]
impl VectorStore for AzureSearchClient {
    async fn get_index(&self, name: &str) -> FoundryResult<Option<IndexSchema>> {
        debug!(index = name, "GET search index");
        let response = self.send(self.client.get(self.url(&["indexes", name]))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(response).await.map(Some)
    }

    async fn create_index(&self, schema: &IndexSchema) -> FoundryResult<()> {
        let request = self
            .client
            .put(self.url(&["indexes", &schema.name]))
            .header("If-None-Match", "*")
            .json(schema);
        let response = self.send(request).await?;

        match response.status() {
            // Created by a concurrent caller between our check and this call.
            StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT => {
                debug!(index = %schema.name, "Search index already exists");
                Ok(())
            }
            status if status.is_success() => {
                info!(index = %schema.name, fields = schema.fields.len(), "Created search index");
                Ok(())
            }
            _ => Err(status_error(response).await),
        }
    }

    async fn upsert_document(&self, index: &str, entry: &ProjectLogEntry) -> FoundryResult<()> {
        let batch = IndexBatch {
            value: vec![IndexAction {
                action: "upload",
                entry,
            }],
        };
        let url = self.url(&["indexes", index, "docs", "index"]);
        let response = self.send(self.client.post(url).json(&batch)).await?;
        let results: ValueList<IndexingResult> = read_json(response).await?;
        check_indexing(results.value, &entry.id)
    }

    async fn get_document(&self, index: &str, id: &str) -> FoundryResult<Option<ProjectLogEntry>> {
        let url = self.url(&["indexes", index, "docs", id]);
        let response = self.send(self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(response).await.map(Some)
    }

    async fn vector_search(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
    ) -> FoundryResult<Vec<SearchHit>> {
        let body = SearchRequest {
            select: RESULT_FIELDS,
            top: top_k,
            vector_queries: vec![VectorQuery {
                kind: "vector",
                vector,
                fields: VECTOR_FIELD,
                k: top_k,
            }],
        };
        let url = self.url(&["indexes", index, "docs", "search"]);
        let response = self.send(self.client.post(url).json(&body)).await?;
        let hits: ValueList<WireHit> = read_json(response).await?;
        Ok(hits.value.into_iter().map(SearchHit::from).collect())
    }
}

impl std::fmt::Debug for AzureSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureSearchClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_version", &self.api_version)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use foundry_core::{EntryDraft, EntryType, Tags};
    use serde_json::json;

    fn client(endpoint: &str) -> FoundryResult<AzureSearchClient> {
        AzureSearchClient::new(
            &SearchConfig {
                endpoint: endpoint.to_string(),
                api_key: Some("admin-key".to_string()),
                index_name: "project-log-index".to_string(),
                api_version: "2024-07-01".to_string(),
            },
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_url_encodes_segments_and_adds_version() {
        let c = client("https://svc.search.windows.net/").unwrap();
        assert_eq!(
            c.url(&["indexes", "logs", "docs", "a b"]).as_str(),
            "https://svc.search.windows.net/indexes/logs/docs/a%20b?api-version=2024-07-01"
        );
        let c = client("https://svc.search.windows.net").unwrap();
        assert_eq!(
            c.url(&["indexes", "logs"]).as_str(),
            "https://svc.search.windows.net/indexes/logs?api-version=2024-07-01"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_config_error() {
        let err = client("not a url").unwrap_err();
        assert!(matches!(err, FoundryError::Config(_)));
    }

    #[test]
    fn test_index_batch_shape() {
        let when = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let mut draft = EntryDraft::new("AKS workshop", EntryType::Workshop, "body");
        draft.tags = Tags::parse("azure, aks");
        let entry = draft.into_entry("id-1".to_string(), vec![0.5, 0.5], when, when);

        let batch = IndexBatch {
            value: vec![IndexAction {
                action: "upload",
                entry: &entry,
            }],
        };
        let value = serde_json::to_value(&batch).unwrap();
        let doc = &value["value"][0];
        assert_eq!(doc["@search.action"], "upload");
        assert_eq!(doc["id"], "id-1");
        assert_eq!(doc["type"], "workshop");
        assert_eq!(doc["tags"], json!(["azure", "aks"]));
        assert_eq!(doc["context_vector"], json!([0.5, 0.5]));
    }

    #[test]
    fn test_search_request_shape() {
        let vector = [0.1f32, 0.2];
        let body = SearchRequest {
            select: RESULT_FIELDS,
            top: 5,
            vector_queries: vec![VectorQuery {
                kind: "vector",
                vector: &vector,
                fields: VECTOR_FIELD,
                k: 5,
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["top"], 5);
        assert_eq!(value["vectorQueries"][0]["fields"], "context_vector");
        assert_eq!(value["vectorQueries"][0]["k"], 5);
        assert!(!value["select"].as_str().unwrap().contains("context_vector"));
    }

    #[test]
    fn test_search_hit_mapping() {
        let hits: ValueList<WireHit> = serde_json::from_value(json!({
            "@odata.context": "ignored",
            "value": [{
                "@search.score": 0.87,
                "id": "id-1",
                "title": "AKS workshop",
                "type": "workshop",
                "customer_name": "Contoso",
                "short_summary": null,
                "tags": ["azure"],
                "creation_date": "2025-03-01T12:00:00Z",
                "modified_date": "2025-03-02T12:00:00Z"
            }]
        }))
        .unwrap();
        let hit = SearchHit::from(hits.value.into_iter().next().unwrap());
        assert!((hit.score - 0.87).abs() < 1e-6);
        assert_eq!(hit.entry.customer_name, "Contoso");
        assert_eq!(hit.entry.short_summary, "");
        assert!(hit.entry.tags.contains("azure"));
    }

    #[test]
    fn test_indexing_failure_is_classified() {
        let results: ValueList<IndexingResult> = serde_json::from_value(json!({
            "value": [{"key": "id-1", "status": false, "errorMessage": "throttled", "statusCode": 503}]
        }))
        .unwrap();
        let err = check_indexing(results.value, "id-1").unwrap_err();
        assert!(err.is_retryable());

        let ok = vec![IndexingResult {
            key: "id-2".to_string(),
            status: true,
            error_message: None,
            status_code: 201,
        }];
        assert!(check_indexing(ok, "id-2").is_ok());
    }

    #[test]
    fn test_debug_redacts_key() {
        let c = client("https://svc.search.windows.net").unwrap();
        let debug = format!("{:?}", c);
        assert!(!debug.contains("admin-key"));
        assert!(debug.contains("[REDACTED]"));
    }
}
