use super::{
    BackendError, BackendIndexStats, BackendResult, BackendSearchRequest, BackendSearchResponse,
    IndexDescriptor, SearchBackend, SettingsAck,
};
use crate::search::IndexSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// In-memory search backend (for MVP and testing).
///
/// Keyword matching is a case-insensitive substring test over string fields.
/// Filter and sort expressions are recorded but not evaluated.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    indexes: BTreeMap<String, MemoryIndex>,
    searches: Vec<BackendSearchRequest>,
    next_failure: Option<BackendError>,
    next_task_uid: u64,
}

struct MemoryIndex {
    documents: Vec<Value>,
    settings: Option<IndexSettings>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MemoryIndex {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            documents: Vec::new(),
            settings: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or extend) an index with documents
    pub fn with_documents(self, index: &str, documents: Vec<Value>) -> Self {
        self.add_documents(index, documents);
        self
    }

    pub fn add_documents(&self, index: &str, documents: Vec<Value>) {
        let mut state = self.state.lock();
        let entry = state
            .indexes
            .entry(index.to_string())
            .or_insert_with(MemoryIndex::new);
        entry.documents.extend(documents);
        entry.updated_at = Utc::now();
    }

    /// Store settings directly, bypassing task bookkeeping
    pub fn set_settings(&self, index: &str, settings: IndexSettings) {
        let mut state = self.state.lock();
        let entry = state
            .indexes
            .entry(index.to_string())
            .or_insert_with(MemoryIndex::new);
        entry.settings = Some(settings);
    }

    /// Settings last applied to an index
    pub fn settings(&self, index: &str) -> Option<IndexSettings> {
        self.state
            .lock()
            .indexes
            .get(index)
            .and_then(|entry| entry.settings.clone())
    }

    /// Every search request received, in order
    pub fn searches(&self) -> Vec<BackendSearchRequest> {
        self.state.lock().searches.clone()
    }

    pub fn search_count(&self) -> usize {
        self.state.lock().searches.len()
    }

    /// Make the next backend call fail with `error`
    pub fn fail_next(&self, error: BackendError) {
        self.state.lock().next_failure = Some(error);
    }

    fn take_failure(state: &mut MemoryState) -> BackendResult<()> {
        match state.next_failure.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn index_not_found(index: &str) -> BackendError {
    BackendError::Api {
        status: Some(404),
        code: "index_not_found".to_string(),
        error_type: Some("invalid_request".to_string()),
        message: format!("Index `{}` not found.", index),
        link: None,
    }
}

fn matches_keyword(document: &Value, keyword: &str) -> bool {
    match document {
        Value::String(s) => s.to_lowercase().contains(keyword),
        Value::Array(items) => items.iter().any(|item| matches_keyword(item, keyword)),
        Value::Object(fields) => fields.values().any(|value| matches_keyword(value, keyword)),
        _ => false,
    }
}

fn project(document: &Value, fields: Option<&Vec<String>>) -> Value {
    match (document, fields) {
        (Value::Object(map), Some(fields)) => {
            let projected: Map<String, Value> = fields
                .iter()
                .filter_map(|field| map.get(field).map(|value| (field.clone(), value.clone())))
                .collect();
            Value::Object(projected)
        }
        _ => document.clone(),
    }
}

#[async_trait]
impl SearchBackend for InMemoryBackend {
    async fn search(&self, request: &BackendSearchRequest) -> BackendResult<BackendSearchResponse> {
        let mut state = self.state.lock();
        state.searches.push(request.clone());
        Self::take_failure(&mut state)?;

        let index = state
            .indexes
            .get(&request.index)
            .ok_or_else(|| index_not_found(&request.index))?;

        let keyword = request.query.trim().to_lowercase();
        let matched: Vec<&Value> = index
            .documents
            .iter()
            .filter(|doc| keyword.is_empty() || matches_keyword(doc, &keyword))
            .collect();

        let hits = matched
            .iter()
            .skip(request.offset)
            .take(request.limit)
            .map(|doc| project(doc, request.attributes_to_retrieve.as_ref()))
            .collect();

        Ok(BackendSearchResponse {
            hits,
            estimated_total_hits: Some(matched.len() as u64),
            total_hits: None,
            processing_time_ms: Some(0),
        })
    }

    async fn apply_settings(&self, index: &str, settings: &IndexSettings) -> BackendResult<SettingsAck> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        state.next_task_uid += 1;
        let task_uid = state.next_task_uid;

        let entry = state
            .indexes
            .entry(index.to_string())
            .or_insert_with(MemoryIndex::new);
        entry.settings = Some(settings.clone());
        entry.updated_at = Utc::now();

        tracing::debug!(index = %index, task_uid, "Settings stored");
        Ok(SettingsAck {
            task_uid: Some(task_uid),
        })
    }

    async fn get_stats(&self, index: &str) -> BackendResult<BackendIndexStats> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        let entry = state.indexes.get(index).ok_or_else(|| index_not_found(index))?;

        let mut field_distribution = BTreeMap::new();
        for document in &entry.documents {
            if let Value::Object(fields) = document {
                for field in fields.keys() {
                    *field_distribution.entry(field.clone()).or_insert(0u64) += 1;
                }
            }
        }

        Ok(BackendIndexStats {
            number_of_documents: entry.documents.len() as u64,
            is_indexing: false,
            field_distribution,
        })
    }

    async fn list_indexes(&self) -> BackendResult<Vec<IndexDescriptor>> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        Ok(state
            .indexes
            .iter()
            .map(|(uid, entry)| IndexDescriptor {
                uid: uid.clone(),
                primary_key: entry
                    .documents
                    .iter()
                    .any(|doc| doc.get("id").is_some())
                    .then(|| "id".to_string()),
                created_at: Some(entry.created_at),
                updated_at: Some(entry.updated_at),
            })
            .collect())
    }

    async fn health(&self) -> BackendResult<()> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)
    }

    fn sortable_attributes(&self, index: &str) -> Option<BTreeSet<String>> {
        self.state
            .lock()
            .indexes
            .get(index)
            .and_then(|entry| entry.settings.as_ref())
            .map(|settings| settings.sortable_attributes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(index: &str, query: &str) -> BackendSearchRequest {
        BackendSearchRequest {
            index: index.to_string(),
            query: query.to_string(),
            filter: None,
            sort: None,
            limit: 20,
            offset: 0,
            attributes_to_retrieve: None,
        }
    }

    #[tokio::test]
    async fn test_keyword_pagination_and_projection() {
        let backend = InMemoryBackend::new().with_documents(
            "products",
            vec![
                json!({"id": 1, "title": "Corrugated Box"}),
                json!({"id": 2, "title": "Paper bag"}),
                json!({"id": 3, "title": "Gift box", "tags": ["holiday"]}),
            ],
        );

        let response = backend.search(&request("products", "BOX")).await.unwrap();
        assert_eq!(response.estimated_total_hits, Some(2));

        let mut paged = request("products", "box");
        paged.offset = 1;
        paged.limit = 1;
        paged.attributes_to_retrieve = Some(vec!["id".to_string()]);
        let response = backend.search(&paged).await.unwrap();
        assert_eq!(response.hits, vec![json!({"id": 3})]);
    }

    #[tokio::test]
    async fn test_failure_is_one_shot() {
        let backend = InMemoryBackend::new().with_documents("products", vec![]);
        backend.fail_next(BackendError::Timeout("slow".into()));

        assert!(backend.search(&request("products", "")).await.unwrap_err().is_timeout());
        assert!(backend.search(&request("products", "")).await.is_ok());
        assert_eq!(backend.search_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_index() {
        let backend = InMemoryBackend::new();
        let err = backend.search(&request("missing", "")).await.unwrap_err();
        assert!(err.is_index_not_found());
    }
}
