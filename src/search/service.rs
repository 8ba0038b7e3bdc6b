//! Search request orchestration

use crate::backend::{BackendSearchRequest, SearchBackend};
use crate::error::{AppError, Result};
use crate::search::filter::FilterCompiler;
use crate::search::query::{SearchRequest, SearchResult};
use crate::search::sort::validate_sort;
use std::time::Instant;

/// Default upper bound on hits per call
pub const DEFAULT_MAX_LIMIT: usize = 1000;

/// Turns a [`SearchRequest`] into exactly one backend search call.
///
/// Stateless between calls; safe to share across tasks.
#[derive(Debug, Clone)]
pub struct SearchService {
    compiler: FilterCompiler,
    max_limit: usize,
}

impl Default for SearchService {
    fn default() -> Self {
        Self::new(FilterCompiler::default(), DEFAULT_MAX_LIMIT)
    }
}

impl SearchService {
    pub fn new(compiler: FilterCompiler, max_limit: usize) -> Self {
        Self {
            compiler,
            max_limit: max_limit.max(1),
        }
    }

    pub fn max_limit(&self) -> usize {
        self.max_limit
    }

    /// Build the backend call for a request without executing it.
    ///
    /// All local validation happens here, before any network traffic.
    pub fn prepare(&self, request: &SearchRequest, backend: &dyn SearchBackend) -> Result<BackendSearchRequest> {
        request.validate()?;

        let filter = self.compiler.compile(&request.filter)?;
        let allowed = backend.sortable_attributes(&request.index);
        let sort = validate_sort(&request.sort, allowed.as_ref())?;

        let limit = request.limit.min(self.max_limit);
        if limit < request.limit {
            tracing::debug!(
                index = %request.index,
                requested = request.limit,
                limit,
                "Limit clamped to maximum"
            );
        }

        Ok(BackendSearchRequest {
            index: request.index.clone(),
            query: request.keyword.clone(),
            filter: (!filter.is_empty()).then(|| filter.into_string()),
            sort: (!sort.is_empty()).then_some(sort),
            limit,
            offset: request.offset,
            attributes_to_retrieve: request.projected_fields(),
        })
    }

    /// Execute a search. The backend is invoked exactly once; failures are
    /// returned unchanged inside [`AppError::SearchBackend`].
    pub async fn execute(&self, request: &SearchRequest, backend: &dyn SearchBackend) -> Result<SearchResult> {
        let call = self.prepare(request, backend).map_err(|e| {
            tracing::debug!(index = %request.index, error_code = e.error_code(), error = %e, "Search rejected");
            e
        })?;

        tracing::debug!(
            index = %call.index,
            filter = call.filter.as_deref().unwrap_or(""),
            limit = call.limit,
            offset = call.offset,
            "Executing search"
        );

        let start = Instant::now();
        let response = backend.search(&call).await.map_err(|e| {
            tracing::warn!(index = %call.index, error_code = %e.code(), error = %e, "Search backend call failed");
            AppError::SearchBackend(e)
        })?;

        let result = SearchResult::from(response);
        tracing::debug!(
            index = %call.index,
            hits = result.hits.len(),
            total_estimated = result.total_estimated,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, InMemoryBackend};
    use crate::search::filter::FilterDescription;
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_filter_and_sort_are_omitted() {
        let backend = InMemoryBackend::new().with_documents("products", vec![json!({"id": 1})]);
        let service = SearchService::default();

        service
            .execute(&SearchRequest::new("products", ""), &backend)
            .await
            .unwrap();

        let calls = backend.searches();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].filter, None);
        assert_eq!(calls[0].sort, None);
        assert_eq!(calls[0].attributes_to_retrieve, None);
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let backend = InMemoryBackend::new().with_documents("products", vec![]);
        let service = SearchService::new(FilterCompiler::default(), 50);

        service
            .execute(&SearchRequest::new("products", "").with_limit(500), &backend)
            .await
            .unwrap();

        assert_eq!(backend.searches()[0].limit, 50);
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_backend() {
        let backend = InMemoryBackend::new().with_documents("products", vec![]);
        let service = SearchService::default();

        let bad_filter = SearchRequest::new("products", "")
            .with_filter(FilterDescription::from_value(&json!({"price": {"gte": 1}})).unwrap())
            .with_sort(vec!["price:ascending"]);
        assert!(matches!(
            service.execute(&bad_filter, &backend).await,
            Err(AppError::InvalidSort { .. })
        ));
        assert_eq!(backend.search_count(), 0);
    }

    #[tokio::test]
    async fn test_sort_checked_against_advertised_attributes() {
        let backend = InMemoryBackend::new().with_documents("products", vec![]);
        backend.set_settings(
            "products",
            crate::search::IndexSettings {
                sortable_attributes: ["createdAt".to_string()].into(),
                ..Default::default()
            },
        );
        let service = SearchService::default();

        let request = SearchRequest::new("products", "").with_sort(vec!["price:asc"]);
        assert!(matches!(
            service.execute(&request, &backend).await,
            Err(AppError::InvalidSort { ref token, .. }) if token == "price:asc"
        ));

        let request = SearchRequest::new("products", "").with_sort(vec!["createdAt:desc"]);
        assert!(service.execute(&request, &backend).await.is_ok());
    }

    #[tokio::test]
    async fn test_backend_error_passed_through_unchanged() {
        let backend = InMemoryBackend::new().with_documents("products", vec![]);
        let failure = BackendError::api(Some(400), "invalid_search_filter", "Attribute `x` is not filterable.");
        backend.fail_next(failure.clone());

        let err = SearchService::default()
            .execute(&SearchRequest::new("products", "box"), &backend)
            .await
            .unwrap_err();
        match err {
            AppError::SearchBackend(inner) => assert_eq!(inner, failure),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(backend.search_count(), 1);
    }
}
