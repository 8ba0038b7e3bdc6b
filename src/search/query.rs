//! Search request and result shapes

use crate::backend::BackendSearchResponse;
use crate::error::{AppError, Result};
use crate::search::filter::FilterDescription;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default number of hits per call
pub const DEFAULT_LIMIT: usize = 20;

/// One search against one index
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Keyword query; may be empty to browse by filter only
    pub keyword: String,

    /// Target index
    pub index: String,

    /// Field conditions, AND-combined
    pub filter: FilterDescription,

    /// `field:direction` tokens, primary key first
    pub sort: Vec<String>,

    /// Number of hits to return
    pub limit: usize,

    /// Offset for pagination
    pub offset: usize,

    /// Fields to return per hit; empty means all displayed fields
    pub projection: Vec<String>,
}

impl SearchRequest {
    /// Create a new search request
    pub fn new(index: impl Into<String>, keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            index: index.into(),
            filter: FilterDescription::default(),
            sort: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            projection: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: FilterDescription) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sort(mut self, sort: Vec<impl Into<String>>) -> Self {
        self.sort = sort.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_projection(mut self, fields: Vec<impl Into<String>>) -> Self {
        self.projection = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Check the request-level invariants
    pub fn validate(&self) -> Result<()> {
        if self.index.trim().is_empty() {
            return Err(AppError::Validation("index must not be empty".to_string()));
        }
        if self.limit == 0 {
            return Err(AppError::Validation("limit must be greater than 0".to_string()));
        }
        if let Some(field) = self.projection.iter().find(|f| f.is_empty()) {
            return Err(AppError::Validation(format!(
                "projection contains an empty field name: {:?}",
                field
            )));
        }
        Ok(())
    }

    /// Projection with duplicates removed, or `None` for "all fields"
    pub fn projected_fields(&self) -> Option<Vec<String>> {
        if self.projection.is_empty() {
            return None;
        }
        let mut fields: Vec<String> = Vec::with_capacity(self.projection.len());
        for field in &self.projection {
            if !fields.contains(field) {
                fields.push(field.clone());
            }
        }
        Some(fields)
    }
}

/// Normalized search outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Matching documents, in backend ranking order
    pub hits: Vec<Value>,

    /// Estimated number of matches before pagination
    pub total_estimated: u64,

    /// Backend processing time, when reported
    pub processing_time_ms: Option<u64>,
}

impl From<BackendSearchResponse> for SearchResult {
    fn from(response: BackendSearchResponse) -> Self {
        let total_estimated = response
            .estimated_total_hits
            .or(response.total_hits)
            .unwrap_or(response.hits.len() as u64);

        Self {
            hits: response.hits,
            total_estimated,
            processing_time_ms: response.processing_time_ms,
        }
    }
}
