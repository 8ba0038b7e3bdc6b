//! Meilisearch adapter tests against a mock HTTP server

use mockito::{Matcher, Server};
use search_gateway::backend::{BackendSearchRequest, MeilisearchClient, SearchBackend};
use search_gateway::config::{Config, IndexDefinition};
use search_gateway::error::AppError;
use search_gateway::search::{
    apply_index_settings, fetch_index_stats, IndexSettings, SearchRequest, SearchService,
    SettingsCategory,
};
use serde_json::json;

fn client(url: &str, api_key: Option<&str>) -> MeilisearchClient {
    let mut config = Config::default();
    config.backend.url = url.to_string();
    config.backend.api_key = api_key.map(str::to_string);
    config.backend.task_poll_interval_ms = 1;
    MeilisearchClient::new(&config).unwrap()
}

fn settings() -> IndexSettings {
    serde_json::from_value(json!({
        "searchableAttributes": ["title"],
        "filterableAttributes": ["category"],
        "sortableAttributes": ["createdAt"],
        "displayedAttributes": ["*"],
        "synonyms": {}
    }))
    .unwrap()
}

#[tokio::test]
async fn test_search_sends_meilisearch_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/indexes/supply_demands/search")
        .match_header("authorization", "Bearer secret")
        .match_body(Matcher::Json(json!({
            "q": "纸箱",
            "filter": "category = \"Box\" AND quantity >= 1000",
            "sort": ["createdAt:desc"],
            "limit": 10,
            "offset": 0
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "hits": [{"id": "sd-1"}],
                "query": "纸箱",
                "processingTimeMs": 2,
                "limit": 10,
                "offset": 0,
                "estimatedTotalHits": 57
            })
            .to_string(),
        )
        .create_async()
        .await;

    let backend = client(&server.url(), Some("secret"));
    let request = SearchRequest::new("supply_demands", "纸箱")
        .with_filter(
            search_gateway::search::FilterDescription::from_value(&json!({
                "category": "Box",
                "quantity": {"gte": 1000}
            }))
            .unwrap(),
        )
        .with_sort(vec!["createdAt:desc"])
        .with_limit(10);

    let result = SearchService::default().execute(&request, &backend).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.total_estimated, 57);
    assert_eq!(result.processing_time_ms, Some(2));
    assert_eq!(result.hits, vec![json!({"id": "sd-1"})]);
}

#[tokio::test]
async fn test_search_error_body_is_preserved() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/indexes/products/search")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "message": "Attribute `price` is not filterable.",
                "code": "invalid_search_filter",
                "type": "invalid_request",
                "link": "https://docs.meilisearch.com/errors#invalid_search_filter"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let backend = client(&server.url(), None);
    let err = SearchService::default()
        .execute(&SearchRequest::new("products", ""), &backend)
        .await
        .unwrap_err();

    match err {
        AppError::SearchBackend(inner) => {
            assert_eq!(inner.code(), "invalid_search_filter");
            assert_eq!(inner.status(), Some(400));
            assert!(inner.to_string().contains("not filterable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_apply_settings_waits_for_task() {
    let mut server = Server::new_async().await;
    let patch = server
        .mock("PATCH", "/indexes/products/settings")
        .match_body(Matcher::Json(json!({
            "searchableAttributes": ["title"],
            "filterableAttributes": ["category"],
            "sortableAttributes": ["createdAt"],
            "displayedAttributes": ["*"],
            "synonyms": {}
        })))
        .with_status(202)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "taskUid": 7,
                "indexUid": "products",
                "status": "enqueued",
                "type": "settingsUpdate",
                "enqueuedAt": "2025-09-09T07:43:16.910Z"
            })
            .to_string(),
        )
        .create_async()
        .await;
    let task = server
        .mock("GET", "/tasks/7")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"uid": 7, "status": "succeeded", "type": "settingsUpdate"}).to_string())
        .create_async()
        .await;

    let backend = client(&server.url(), None);
    let applied = apply_index_settings("products", &settings(), &backend).await.unwrap();

    patch.assert_async().await;
    task.assert_async().await;
    assert_eq!(applied.task_uid, Some(7));
    assert_eq!(applied.applied_categories.len(), 5);
}

#[tokio::test]
async fn test_failed_settings_task_names_category() {
    let mut server = Server::new_async().await;
    let _patch = server
        .mock("PATCH", "/indexes/products/settings")
        .with_status(202)
        .with_header("content-type", "application/json")
        .with_body(json!({"taskUid": 8, "indexUid": "products", "status": "enqueued"}).to_string())
        .create_async()
        .await;
    let _task = server
        .mock("GET", "/tasks/8")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "uid": 8,
                "status": "failed",
                "error": {
                    "message": "Invalid value for `filterableAttributes`",
                    "code": "invalid_settings_filterable_attributes",
                    "type": "invalid_request",
                    "link": "https://docs.meilisearch.com/errors#invalid_settings_filterable_attributes"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let backend = client(&server.url(), None);
    let err = apply_index_settings("products", &settings(), &backend)
        .await
        .unwrap_err();

    match err {
        AppError::IndexConfiguration { index, category, source } => {
            assert_eq!(index, "products");
            assert_eq!(category, Some(SettingsCategory::FilterableAttributes));
            assert_eq!(source.status(), None);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_canceled_task_is_cancelled_kind() {
    let mut server = Server::new_async().await;
    let _patch = server
        .mock("PATCH", "/indexes/products/settings")
        .with_status(202)
        .with_body(json!({"taskUid": 9}).to_string())
        .create_async()
        .await;
    let _task = server
        .mock("GET", "/tasks/9")
        .with_status(200)
        .with_body(json!({"uid": 9, "status": "canceled"}).to_string())
        .create_async()
        .await;

    let backend = client(&server.url(), None);
    let err = apply_index_settings("products", &settings(), &backend)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::IndexConfiguration { ref source, .. } if source.is_cancelled()));
}

#[tokio::test]
async fn test_task_wait_times_out() {
    let mut server = Server::new_async().await;
    let _patch = server
        .mock("PATCH", "/indexes/products/settings")
        .with_status(202)
        .with_body(json!({"taskUid": 10}).to_string())
        .create_async()
        .await;
    let _task = server
        .mock("GET", "/tasks/10")
        .with_status(200)
        .with_body(json!({"uid": 10, "status": "processing"}).to_string())
        .create_async()
        .await;

    let mut config = Config::default();
    config.backend.url = server.url();
    config.backend.task_timeout_secs = 0;
    let backend = MeilisearchClient::new(&config).unwrap();

    let err = backend.apply_settings("products", &settings()).await.unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_stats_and_missing_index() {
    let mut server = Server::new_async().await;
    let _stats = server
        .mock("GET", "/indexes/products/stats")
        .with_status(200)
        .with_body(
            json!({
                "numberOfDocuments": 42,
                "isIndexing": true,
                "fieldDistribution": {"id": 42, "title": 40}
            })
            .to_string(),
        )
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/indexes/missing/stats")
        .with_status(404)
        .with_body(
            json!({
                "message": "Index `missing` not found.",
                "code": "index_not_found",
                "type": "invalid_request",
                "link": "https://docs.meilisearch.com/errors#index_not_found"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let backend = client(&server.url(), None);

    let stats = fetch_index_stats("products", &backend).await.unwrap();
    assert_eq!(stats.document_count, 42);
    assert!(stats.is_indexing);
    assert_eq!(stats.field_distribution["title"], 40);

    assert!(matches!(
        fetch_index_stats("missing", &backend).await,
        Err(AppError::IndexNotFound(ref index)) if index == "missing"
    ));
}

#[tokio::test]
async fn test_list_indexes_pages_until_total() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/indexes")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("limit".into(), "100".into()),
            Matcher::UrlEncoded("offset".into(), "0".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "results": [
                    {"uid": "policies", "primaryKey": "id", "createdAt": "2025-09-01T00:00:00Z", "updatedAt": "2025-09-02T00:00:00Z"},
                    {"uid": "supply_demands", "primaryKey": "id", "createdAt": "2025-09-01T00:00:00Z", "updatedAt": "2025-09-09T07:43:16.910Z"}
                ],
                "offset": 0,
                "limit": 100,
                "total": 2
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let backend = client(&server.url(), None);
    let indexes = backend.list_indexes().await.unwrap();

    first.assert_async().await;
    assert_eq!(indexes.len(), 2);
    assert_eq!(indexes[1].uid, "supply_demands");
    assert_eq!(indexes[1].primary_key.as_deref(), Some("id"));
    assert!(indexes[1].updated_at.is_some());
}

#[tokio::test]
async fn test_health_and_unreachable_backend() {
    let mut server = Server::new_async().await;
    let _health = server
        .mock("GET", "/health")
        .with_status(200)
        .with_body(r#"{"status":"available"}"#)
        .create_async()
        .await;

    assert!(client(&server.url(), None).health().await.is_ok());

    // Nothing listens on port 9 (discard) in the test environment
    let unreachable = client("http://127.0.0.1:9", None);
    let err = unreachable
        .search(&BackendSearchRequest {
            index: "products".into(),
            query: String::new(),
            filter: None,
            sort: None,
            limit: 1,
            offset: 0,
            attributes_to_retrieve: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "communication_error");
}

#[tokio::test]
async fn test_declared_sortable_attributes_are_advertised() {
    let mut config = Config::default();
    config.indexes.push(IndexDefinition {
        uid: "products".to_string(),
        searchable_attributes: vec!["title".to_string()],
        filterable_attributes: vec![],
        sortable_attributes: vec!["createdAt".to_string()],
        displayed_attributes: vec!["*".to_string()],
        synonyms: vec![],
    });
    let backend = MeilisearchClient::new(&config).unwrap();

    assert!(backend
        .sortable_attributes("products")
        .unwrap()
        .contains("createdAt"));
    assert!(backend.sortable_attributes("other").is_none());

    let err = SearchService::default()
        .execute(
            &SearchRequest::new("products", "").with_sort(vec!["price:asc"]),
            &backend,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidSort { .. }));
}

#[tokio::test]
async fn test_applied_settings_replace_advertised_sortable_attributes() {
    let mut server = Server::new_async().await;
    let _patch = server
        .mock("PATCH", "/indexes/products/settings")
        .with_status(202)
        .with_body(json!({"taskUid": 11}).to_string())
        .create_async()
        .await;
    let _task = server
        .mock("GET", "/tasks/11")
        .with_status(200)
        .with_body(json!({"uid": 11, "status": "succeeded"}).to_string())
        .create_async()
        .await;
    let search = server
        .mock("POST", "/indexes/products/search")
        .match_body(Matcher::PartialJson(json!({"sort": ["price:asc"]})))
        .with_status(200)
        .with_body(json!({"hits": [], "processingTimeMs": 0, "estimatedTotalHits": 0}).to_string())
        .create_async()
        .await;

    let mut config = Config::default();
    config.backend.url = server.url();
    config.backend.task_poll_interval_ms = 1;
    config.indexes.push(IndexDefinition {
        uid: "products".to_string(),
        searchable_attributes: vec!["title".to_string()],
        filterable_attributes: vec![],
        sortable_attributes: vec!["createdAt".to_string()],
        displayed_attributes: vec!["*".to_string()],
        synonyms: vec![],
    });
    let backend = MeilisearchClient::new(&config).unwrap();

    let mut updated = settings();
    updated.sortable_attributes = ["price".to_string()].into_iter().collect();
    apply_index_settings("products", &updated, &backend).await.unwrap();

    let allowed = backend.sortable_attributes("products").unwrap();
    assert!(allowed.contains("price"));
    assert!(!allowed.contains("createdAt"));

    SearchService::default()
        .execute(
            &SearchRequest::new("products", "").with_sort(vec!["price:asc"]),
            &backend,
        )
        .await
        .unwrap();
    search.assert_async().await;
}
