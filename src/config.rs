use crate::error::{AppError, Result};
use crate::search::IndexSettings;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Embedded defaults, always the lowest-priority layer
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Search backend connection
    #[serde(default)]
    pub backend: BackendConfig,

    /// Search behavior
    #[serde(default)]
    pub search: SearchConfig,

    /// Tool surface
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Declared index settings, used by `init_index` and to advertise sortable attributes
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from defaults, file and environment.
    ///
    /// Layers, lowest priority first: embedded defaults, the file named by
    /// `SEARCH_GATEWAY_CONFIG` (default `config/gateway.toml`, optional),
    /// `SEARCH_GATEWAY__*` variables, then the plain `MEILISEARCH_URL`,
    /// `MEILISEARCH_MASTER_KEY`, `SERVER_HOST` and `SERVER_PORT` variables.
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        let config_path = std::env::var("SEARCH_GATEWAY_CONFIG")
            .unwrap_or_else(|_| "config/gateway.toml".to_string());

        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.trim().parse::<i64>().ok());
        let api_key = std::env::var("MEILISEARCH_MASTER_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: SEARCH_GATEWAY__)
            .add_source(
                config::Environment::with_prefix("SEARCH_GATEWAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("backend.url", std::env::var("MEILISEARCH_URL").ok())?
            .set_override_option("backend.api_key", api_key)?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", port)?
            .build()?
            .try_deserialize()
    }

    /// Load embedded defaults overlaid with one required TOML file, ignoring the environment
    pub fn load_from_file(path: impl AsRef<Path>) -> std::result::Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path.as_ref()).required(true))
            .build()?
            .try_deserialize()
    }

    /// Check cross-field constraints the types cannot express
    pub fn validate(&self) -> Result<()> {
        if self.backend.url.trim().is_empty() {
            return Err(AppError::Configuration("backend.url must not be empty".to_string()));
        }
        if self.search.default_limit == 0 || self.search.max_limit == 0 {
            return Err(AppError::Configuration(
                "search.default_limit and search.max_limit must be greater than 0".to_string(),
            ));
        }
        if self.search.default_limit > self.search.max_limit {
            return Err(AppError::Configuration(format!(
                "search.default_limit ({}) exceeds search.max_limit ({})",
                self.search.default_limit, self.search.max_limit
            )));
        }

        let mut names = HashSet::new();
        for tool in &self.tools.pinned {
            if tool.name.trim().is_empty() || tool.index.trim().is_empty() {
                return Err(AppError::Configuration(
                    "pinned tools need a name and an index".to_string(),
                ));
            }
            if !names.insert(tool.name.as_str()) {
                return Err(AppError::Configuration(format!(
                    "duplicate tool name '{}'",
                    tool.name
                )));
            }
        }

        let mut uids = HashSet::new();
        for index in &self.indexes {
            if !uids.insert(index.uid.as_str()) {
                return Err(AppError::Configuration(format!(
                    "index '{}' is declared twice",
                    index.uid
                )));
            }
        }

        Ok(())
    }

    /// Declared settings for an index, if any
    pub fn index_definition(&self, uid: &str) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|index| index.uid == uid)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            backend: BackendConfig::default(),
            search: SearchConfig::default(),
            tools: ToolsConfig::default(),
            indexes: Vec::new(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Meilisearch base URL
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// HTTP request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Interval between task status polls (milliseconds)
    #[serde(default = "default_task_poll_interval")]
    pub task_poll_interval_ms: u64,

    /// Maximum wait for an asynchronous task (seconds)
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            api_key: None,
            timeout_secs: default_timeout(),
            task_poll_interval_ms: default_task_poll_interval(),
            task_timeout_secs: default_task_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Index used by the generic tools when the caller names none
    #[serde(default)]
    pub default_index: Option<String>,

    /// Hits per call when the caller gives no limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Upper bound on hits per call
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Fields whose numeric filter values are UNIX timestamps
    #[serde(default = "default_time_fields")]
    pub time_fields: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_index: None,
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            time_fields: default_time_fields(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Expose the generic `search` tool
    #[serde(default = "default_true")]
    pub generic_search: bool,

    /// Search tools bound to one index
    #[serde(default = "default_pinned_tools")]
    pub pinned: Vec<PinnedTool>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            generic_search: true,
            pinned: default_pinned_tools(),
        }
    }
}

/// A search tool bound to one index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinnedTool {
    pub name: String,
    pub index: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Declared settings for one index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub uid: String,

    #[serde(default)]
    pub searchable_attributes: Vec<String>,

    #[serde(default)]
    pub filterable_attributes: Vec<String>,

    #[serde(default)]
    pub sortable_attributes: Vec<String>,

    #[serde(default = "default_displayed_attributes")]
    pub displayed_attributes: Vec<String>,

    #[serde(default)]
    pub synonyms: Vec<SynonymGroup>,
}

/// One synonym entry; terms keep their case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymGroup {
    pub term: String,
    pub equivalents: Vec<String>,
}

impl IndexDefinition {
    /// Settings document for this index
    pub fn to_settings(&self) -> IndexSettings {
        let mut synonyms = BTreeMap::new();
        for group in &self.synonyms {
            synonyms
                .entry(group.term.clone())
                .or_insert_with(std::collections::BTreeSet::new)
                .extend(group.equivalents.iter().cloned());
        }

        IndexSettings {
            searchable_attributes: self.searchable_attributes.clone(),
            filterable_attributes: self.filterable_attributes.iter().cloned().collect(),
            sortable_attributes: self.sortable_attributes.iter().cloned().collect(),
            displayed_attributes: self.displayed_attributes.clone(),
            synonyms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
            metrics_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8800
}

fn default_backend_url() -> String {
    "http://localhost:7700".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_task_poll_interval() -> u64 {
    50
}

fn default_task_timeout() -> u64 {
    30
}

fn default_limit() -> usize {
    20
}

fn default_max_limit() -> usize {
    1000
}

fn default_time_fields() -> Vec<String> {
    vec!["createdAt".to_string(), "updatedAt".to_string(), "expiresAt".to_string()]
}

fn default_pinned_tools() -> Vec<PinnedTool> {
    vec![
        PinnedTool {
            name: "search_supply_demands".to_string(),
            index: "supply_demands".to_string(),
            description: Some("Search the supply_demands index (supply and demand listings)".to_string()),
        },
        PinnedTool {
            name: "search_policies".to_string(),
            index: "policies".to_string(),
            description: Some("Search the policies index (published policy documents)".to_string()),
        },
    ]
}

fn default_displayed_attributes() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "search-gateway".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8800);
        assert_eq!(config.backend.url, "http://localhost:7700");
        assert_eq!(config.search.default_limit, 20);
        assert_eq!(config.tools.pinned.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_embedded_defaults_match_default_impl() {
        let parsed: Config = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        let default = Config::default();

        assert_eq!(parsed.server.port, default.server.port);
        assert_eq!(parsed.backend.url, default.backend.url);
        assert_eq!(parsed.search.max_limit, default.search.max_limit);
        assert_eq!(parsed.search.time_fields, default.search.time_fields);
        assert_eq!(parsed.tools.pinned, default.tools.pinned);
    }

    #[test]
    fn test_file_layer_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[backend]
url = "http://meili.internal:7700"

[search]
default_index = "products"

[[indexes]]
uid = "products"
searchable_attributes = ["title"]
filterable_attributes = ["category"]
sortable_attributes = ["createdAt"]

[[indexes.synonyms]]
term = "Box"
equivalents = ["Carton", "Case"]
"#
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.backend.url, "http://meili.internal:7700");
        assert_eq!(config.backend.timeout_secs, 10);
        assert_eq!(config.search.default_index.as_deref(), Some("products"));

        let settings = config.index_definition("products").unwrap().to_settings();
        assert!(settings.sortable_attributes.contains("createdAt"));
        assert_eq!(settings.displayed_attributes, vec!["*".to_string()]);
        assert_eq!(settings.synonyms["Box"].len(), 2);
    }

    #[test]
    fn test_validation_rules() {
        let mut config = Config::default();
        config.search.default_limit = 2000;
        assert!(matches!(config.validate(), Err(AppError::Configuration(_))));

        let mut config = Config::default();
        config.tools.pinned.push(config.tools.pinned[0].clone());
        assert!(matches!(config.validate(), Err(AppError::Configuration(m)) if m.contains("duplicate")));

        let mut config = Config::default();
        config.backend.url = String::new();
        assert!(config.validate().is_err());
    }
}
