//! Index statistics and listing

use crate::backend::{BackendIndexStats, IndexDescriptor, SearchBackend};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized statistics for one index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    /// Number of documents in the index
    pub document_count: u64,

    /// Whether the backend is still processing updates for this index
    pub is_indexing: bool,

    /// Field name → number of documents containing it
    pub field_distribution: BTreeMap<String, u64>,
}

impl From<BackendIndexStats> for IndexStats {
    fn from(stats: BackendIndexStats) -> Self {
        Self {
            document_count: stats.number_of_documents,
            is_indexing: stats.is_indexing,
            field_distribution: stats.field_distribution,
        }
    }
}

/// Fetch statistics for an index.
///
/// A missing index is an error, never a zero-valued stats object.
pub async fn fetch_index_stats(index: &str, backend: &dyn SearchBackend) -> Result<IndexStats> {
    if index.trim().is_empty() {
        return Err(AppError::Validation("index must not be empty".to_string()));
    }

    match backend.get_stats(index).await {
        Ok(stats) => Ok(stats.into()),
        Err(e) if e.is_index_not_found() => {
            tracing::debug!(index = %index, "Stats requested for unknown index");
            Err(AppError::IndexNotFound(index.to_string()))
        }
        Err(e) => {
            tracing::warn!(index = %index, error_code = %e.code(), "Failed to fetch index stats");
            Err(AppError::SearchBackend(e))
        }
    }
}

/// List every index known to the backend, ordered by uid
pub async fn list_indexes(backend: &dyn SearchBackend) -> Result<Vec<IndexDescriptor>> {
    let mut indexes = backend.list_indexes().await.map_err(|e| {
        tracing::warn!(error_code = %e.code(), "Failed to list indexes");
        AppError::SearchBackend(e)
    })?;
    indexes.sort_by(|a, b| a.uid.cmp(&b.uid));
    Ok(indexes)
}
