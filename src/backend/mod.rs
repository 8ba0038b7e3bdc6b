//! Search backend abstraction
//!
//! The search core only talks to [`SearchBackend`]. Two implementations ship
//! with the crate:
//!
//! - [`MeilisearchClient`]: HTTP client for a Meilisearch instance
//! - [`InMemoryBackend`]: recording backend for tests and local development

mod error;
pub mod meilisearch;
pub mod memory;

pub use error::{BackendError, BackendErrorDetails, BackendResult};
pub use meilisearch::MeilisearchClient;
pub use memory::InMemoryBackend;

use crate::search::IndexSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Backend-ready search call; serializes to the Meilisearch search body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSearchRequest {
    #[serde(skip)]
    pub index: String,

    #[serde(rename = "q")]
    pub query: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<String>>,

    pub limit: usize,

    pub offset: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes_to_retrieve: Option<Vec<String>>,
}

/// Raw search response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSearchResponse {
    #[serde(default)]
    pub hits: Vec<Value>,

    #[serde(default)]
    pub estimated_total_hits: Option<u64>,

    /// Exact total, only reported in page-based pagination
    #[serde(default)]
    pub total_hits: Option<u64>,

    #[serde(default)]
    pub processing_time_ms: Option<u64>,
}

/// Acknowledgement of an applied settings update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsAck {
    /// Backend task that carried the update, when the backend is asynchronous
    pub task_uid: Option<u64>,
}

/// Raw index statistics
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendIndexStats {
    pub number_of_documents: u64,

    #[serde(default)]
    pub is_indexing: bool,

    #[serde(default)]
    pub field_distribution: BTreeMap<String, u64>,
}

/// Index listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDescriptor {
    pub uid: String,

    #[serde(default)]
    pub primary_key: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A document index service reachable by the gateway
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Execute one search
    async fn search(&self, request: &BackendSearchRequest) -> BackendResult<BackendSearchResponse>;

    /// Replace every settings category of an index with the given document
    async fn apply_settings(&self, index: &str, settings: &IndexSettings) -> BackendResult<SettingsAck>;

    /// Fetch statistics for one index
    async fn get_stats(&self, index: &str) -> BackendResult<BackendIndexStats>;

    /// List every index
    async fn list_indexes(&self) -> BackendResult<Vec<IndexDescriptor>>;

    /// Check that the backend is reachable
    async fn health(&self) -> BackendResult<()>;

    /// Sortable attributes the backend advertises for an index without a
    /// network call; `None` when unknown
    fn sortable_attributes(&self, _index: &str) -> Option<BTreeSet<String>> {
        None
    }
}
