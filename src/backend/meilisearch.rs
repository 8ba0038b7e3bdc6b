//! Meilisearch HTTP adapter

use super::{
    BackendError, BackendIndexStats, BackendResult, BackendSearchRequest, BackendSearchResponse,
    IndexDescriptor, SearchBackend, SettingsAck,
};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::search::IndexSettings;
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const INDEX_PAGE_SIZE: usize = 100;

/// Meilisearch client
#[derive(Clone)]
pub struct MeilisearchClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    timeout_secs: u64,
    task_poll_interval: Duration,
    task_timeout: Duration,
    /// Sortable attributes per index: declared at startup, replaced after each applied settings task
    sortable: Arc<RwLock<HashMap<String, BTreeSet<String>>>>,
}

/// Error body returned by Meilisearch on non-2xx responses and failed tasks
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    code: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

impl ErrorBody {
    fn into_error(self, status: Option<u16>) -> BackendError {
        BackendError::Api {
            status,
            code: self.code,
            error_type: self.error_type,
            message: self.message,
            link: self.link,
        }
    }
}

/// Summary returned when an asynchronous task is enqueued
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskInfo {
    task_uid: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

#[derive(Debug, Deserialize)]
struct Task {
    uid: u64,
    status: TaskStatus,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct IndexPage {
    results: Vec<IndexDescriptor>,
    total: usize,
}

impl MeilisearchClient {
    /// Create a client from the backend section of the configuration.
    ///
    /// Sortable attributes of declared indexes are advertised to the search core.
    pub fn new(config: &Config) -> Result<Self> {
        let backend = &config.backend;

        let base_url = Url::parse(&backend.url).map_err(|e| {
            AppError::Configuration(format!("Invalid backend URL '{}': {}", backend.url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Configuration(format!(
                "Backend URL '{}' cannot carry a path",
                backend.url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(backend.timeout_secs))
            .user_agent(concat!("search-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let sortable: HashMap<String, BTreeSet<String>> = config
            .indexes
            .iter()
            .map(|index| {
                (
                    index.uid.clone(),
                    index.sortable_attributes.iter().cloned().collect(),
                )
            })
            .collect();

        Ok(Self {
            client,
            base_url,
            api_key: backend.api_key.clone().filter(|key| !key.is_empty()),
            timeout_secs: backend.timeout_secs,
            task_poll_interval: Duration::from_millis(backend.task_poll_interval_ms.max(1)),
            task_timeout: Duration::from_secs(backend.task_timeout_secs),
            sortable: Arc::new(RwLock::new(sortable)),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request and decode a JSON success body, recording metrics
    async fn send<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> BackendResult<T> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = self.transport_error(e);
                metrics::record_backend_request(operation, err.code(), started);
                return Err(err);
            }
        };

        let status = response.status();
        metrics::record_backend_request(operation, status.as_str(), started);

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let err = decode_error(status, &body);
            debug!(operation, status = status.as_u16(), error_code = %err.code(), "Meilisearch returned an error");
            return Err(err);
        }

        serde_json::from_slice(&body).map_err(|e| {
            BackendError::InvalidResponse(format!("Failed to decode {} response: {}", operation, e))
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(format!(
                "Meilisearch request timed out after {} seconds",
                self.timeout_secs
            ))
        } else if e.is_connect() {
            BackendError::Communication(format!("Failed to connect to Meilisearch: {}", e))
        } else {
            BackendError::Communication(format!("Meilisearch request failed: {}", e))
        }
    }

    /// Poll a task until it reaches a terminal status or the task timeout elapses
    async fn wait_for_task(&self, task_uid: u64) -> BackendResult<()> {
        let deadline = Instant::now() + self.task_timeout;
        let uid = task_uid.to_string();

        loop {
            let request = self.client.get(self.endpoint(&["tasks", &uid]));
            let task: Task = self.send("get_task", request).await?;

            match task.status {
                TaskStatus::Succeeded => return Ok(()),
                TaskStatus::Failed => {
                    return Err(match task.error {
                        Some(body) => body.into_error(None),
                        None => BackendError::api(None, "task_failed", format!("Task {} failed", task.uid)),
                    })
                }
                TaskStatus::Canceled => {
                    return Err(BackendError::Cancelled(format!("Task {} was canceled", task.uid)))
                }
                TaskStatus::Enqueued | TaskStatus::Processing => {}
            }

            if Instant::now() >= deadline {
                return Err(BackendError::Timeout(format!(
                    "Task {} did not finish within {} seconds",
                    task_uid,
                    self.task_timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.task_poll_interval).await;
        }
    }
}

fn decode_error(status: StatusCode, body: &[u8]) -> BackendError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(error) => error.into_error(Some(status.as_u16())),
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            let message = if text.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("No response body")
                    .to_string()
            } else {
                text.into_owned()
            };
            BackendError::api(Some(status.as_u16()), format!("http_{}", status.as_u16()), message)
        }
    }
}

#[async_trait]
impl SearchBackend for MeilisearchClient {
    async fn search(&self, request: &BackendSearchRequest) -> BackendResult<BackendSearchResponse> {
        let url = self.endpoint(&["indexes", &request.index, "search"]);
        self.send("search", self.client.post(url).json(request)).await
    }

    async fn apply_settings(&self, index: &str, settings: &IndexSettings) -> BackendResult<SettingsAck> {
        let url = self.endpoint(&["indexes", index, "settings"]);
        let task: TaskInfo = self
            .send("update_settings", self.client.patch(url).json(settings))
            .await?;

        debug!(index = %index, task_uid = task.task_uid, "Settings update enqueued");
        self.wait_for_task(task.task_uid).await.map_err(|e| {
            warn!(index = %index, task_uid = task.task_uid, error = %e, "Settings task did not succeed");
            e
        })?;
        info!(index = %index, task_uid = task.task_uid, "Settings task succeeded");

        self.sortable
            .write()
            .insert(index.to_string(), settings.sortable_attributes.clone());

        Ok(SettingsAck {
            task_uid: Some(task.task_uid),
        })
    }

    async fn get_stats(&self, index: &str) -> BackendResult<BackendIndexStats> {
        let url = self.endpoint(&["indexes", index, "stats"]);
        self.send("get_stats", self.client.get(url)).await
    }

    async fn list_indexes(&self) -> BackendResult<Vec<IndexDescriptor>> {
        let mut indexes = Vec::new();
        let mut offset = 0usize;

        loop {
            let request = self
                .client
                .get(self.endpoint(&["indexes"]))
                .query(&[("limit", INDEX_PAGE_SIZE), ("offset", offset)]);
            let page: IndexPage = self.send("list_indexes", request).await?;

            let received = page.results.len();
            indexes.extend(page.results);
            offset += received;

            if received == 0 || offset >= page.total {
                break;
            }
        }

        Ok(indexes)
    }

    async fn health(&self) -> BackendResult<()> {
        let _: serde_json::Value = self.send("health", self.client.get(self.endpoint(&["health"]))).await?;
        Ok(())
    }

    fn sortable_attributes(&self, index: &str) -> Option<BTreeSet<String>> {
        self.sortable.read().get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> MeilisearchClient {
        let mut config = Config::default();
        config.backend.url = url.to_string();
        MeilisearchClient::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = client("http://localhost:7700");
        assert_eq!(
            client.endpoint(&["indexes", "supply demands", "search"]).as_str(),
            "http://localhost:7700/indexes/supply%20demands/search"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client("http://proxy.local/meili/");
        assert_eq!(
            client.endpoint(&["health"]).as_str(),
            "http://proxy.local/meili/health"
        );
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut config = Config::default();
        config.backend.url = "not a url".to_string();
        assert!(matches!(
            MeilisearchClient::new(&config),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_decode_error_body() {
        let body = br#"{"message":"Index `x` not found.","code":"index_not_found","type":"invalid_request","link":"https://docs.meilisearch.com/errors#index_not_found"}"#;
        let err = decode_error(StatusCode::NOT_FOUND, body);
        assert!(err.is_index_not_found());
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_decode_error_without_body() {
        let err = decode_error(StatusCode::BAD_GATEWAY, b"");
        assert_eq!(err.code(), "http_502");
        assert_eq!(err.to_string(), "Bad Gateway (code: http_502)");
    }
}
