//! Tool registry: definitions, argument validation and dispatch into the search core

use crate::backend::SearchBackend;
use crate::config::Config;
use crate::error::{AppError, ErrorKind, Result};
use crate::mcp::protocol::ToolDefinition;
use crate::metrics;
use crate::search::{
    apply_index_settings, fetch_index_stats, list_indexes, FilterCompiler, FilterDescription,
    IndexSettings, SearchRequest, SearchService,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;
use validator::Validate;

pub const SEARCH_TOOL: &str = "search";
pub const INDEX_STATS_TOOL: &str = "get_index_stats";
pub const ALL_INDEXES_TOOL: &str = "get_all_indexes";
pub const INIT_INDEX_TOOL: &str = "init_index";

/// What a registered tool does
#[derive(Debug, Clone, PartialEq)]
pub enum ToolKind {
    /// Keyword search; pinned tools always target one index
    Search { pinned_index: Option<String> },
    IndexStats,
    AllIndexes,
    InitIndex,
}

#[derive(Debug, Clone)]
struct RegisteredTool {
    definition: ToolDefinition,
    kind: ToolKind,
}

/// Arguments of the search tools
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SearchArgs {
    /// Keyword query; empty browses by filter only
    pub query: String,

    #[serde(default)]
    #[validate(length(min = 1))]
    pub index: Option<String>,

    #[serde(default)]
    pub filter_conditions: Option<Value>,

    #[serde(default)]
    #[validate(range(min = 1))]
    pub limit: Option<usize>,

    #[serde(default)]
    pub offset: usize,

    #[serde(default)]
    pub attributes_to_retrieve: Option<Vec<String>>,

    #[serde(default)]
    pub sort: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct IndexStatsArgs {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub index: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct InitIndexArgs {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub index: Option<String>,

    /// Full settings document; falls back to the declared settings of the index
    #[serde(default)]
    pub settings: Option<IndexSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoArgs {}

/// Registered tools plus everything needed to run them
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    backend: Arc<dyn SearchBackend>,
    service: SearchService,
    default_index: Option<String>,
    default_limit: usize,
    declared_settings: HashMap<String, IndexSettings>,
}

impl ToolRegistry {
    pub fn new(config: &Config, backend: Arc<dyn SearchBackend>) -> Self {
        let compiler = FilterCompiler::new().with_time_fields(config.search.time_fields.iter().cloned());
        let service = SearchService::new(compiler, config.search.max_limit);

        let mut tools = Vec::new();
        if config.tools.generic_search {
            tools.push(RegisteredTool {
                definition: ToolDefinition {
                    name: SEARCH_TOOL.to_string(),
                    description: "Search any index by keyword, with optional field filters, sort, \
                                  pagination and field projection."
                        .to_string(),
                    input_schema: search_schema(true),
                },
                kind: ToolKind::Search { pinned_index: None },
            });
        }

        for pinned in &config.tools.pinned {
            let description = pinned
                .description
                .clone()
                .unwrap_or_else(|| format!("Search the {} index", pinned.index));
            tools.push(RegisteredTool {
                definition: ToolDefinition {
                    name: pinned.name.clone(),
                    description,
                    input_schema: search_schema(false),
                },
                kind: ToolKind::Search {
                    pinned_index: Some(pinned.index.clone()),
                },
            });
        }

        tools.push(RegisteredTool {
            definition: ToolDefinition {
                name: INDEX_STATS_TOOL.to_string(),
                description: "Document count, indexing status and field distribution of an index."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": { "index": { "type": "string", "description": "Index uid" } },
                    "additionalProperties": false
                }),
            },
            kind: ToolKind::IndexStats,
        });
        tools.push(RegisteredTool {
            definition: ToolDefinition {
                name: ALL_INDEXES_TOOL.to_string(),
                description: "List every index with its primary key and timestamps.".to_string(),
                input_schema: json!({ "type": "object", "properties": {}, "additionalProperties": false }),
            },
            kind: ToolKind::AllIndexes,
        });
        tools.push(RegisteredTool {
            definition: ToolDefinition {
                name: INIT_INDEX_TOOL.to_string(),
                description: "Apply searchable, filterable, sortable and displayed attributes and \
                              synonyms to an index. Every category is replaced."
                    .to_string(),
                input_schema: init_index_schema(),
            },
            kind: ToolKind::InitIndex,
        });

        let declared_settings = config
            .indexes
            .iter()
            .map(|index| (index.uid.clone(), index.to_settings()))
            .collect();

        Self {
            tools,
            backend,
            service,
            default_index: config.search.default_index.clone(),
            default_limit: config.search.default_limit,
            declared_settings,
        }
    }

    /// Definitions in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    fn find(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|tool| tool.definition.name == name)
    }

    /// Run a tool and return its success payload.
    ///
    /// `arguments` may be `null` for tools without required arguments.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value> {
        let tool = self
            .find(name)
            .ok_or_else(|| AppError::ToolNotFound(name.to_string()))?;

        let started = Instant::now();
        let span = tracing::info_span!("tool_call", tool = %name, call_id = %Uuid::new_v4());
        let result = async move {
            match &tool.kind {
                ToolKind::Search { pinned_index } => self.search(pinned_index.as_deref(), arguments).await,
                ToolKind::IndexStats => self.index_stats(arguments).await,
                ToolKind::AllIndexes => self.all_indexes(arguments).await,
                ToolKind::InitIndex => self.init_index(arguments).await,
            }
        }
        .instrument(span)
        .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => {
                match e.kind() {
                    ErrorKind::Validation => {
                        tracing::debug!(tool = %name, error_code = e.error_code(), error = %e, "Tool call rejected")
                    }
                    _ => tracing::warn!(tool = %name, error_code = e.error_code(), error = %e, "Tool call failed"),
                }
                match e.kind() {
                    ErrorKind::Validation => "validation_error",
                    ErrorKind::Backend => "backend_error",
                    ErrorKind::Internal => "internal_error",
                }
            }
        };
        metrics::record_tool_call(name, outcome, started);

        result
    }

    async fn search(&self, pinned_index: Option<&str>, arguments: Value) -> Result<Value> {
        let args: SearchArgs = parse_args(arguments)?;

        let index = match (pinned_index, args.index) {
            (Some(pinned), None) => pinned.to_string(),
            (Some(pinned), Some(requested)) => {
                return Err(AppError::Validation(format!(
                    "this tool always searches '{}' and does not accept index '{}'",
                    pinned, requested
                )))
            }
            (None, requested) => self.resolve_index(requested)?,
        };

        let filter = match &args.filter_conditions {
            Some(value) => FilterDescription::from_value(value)?,
            None => FilterDescription::new(),
        };

        let limit = args.limit.unwrap_or(self.default_limit);
        let request = SearchRequest::new(index.clone(), args.query)
            .with_filter(filter)
            .with_sort(args.sort.unwrap_or_default())
            .with_limit(limit)
            .with_offset(args.offset)
            .with_projection(args.attributes_to_retrieve.unwrap_or_default());

        let result = self.service.execute(&request, self.backend.as_ref()).await?;
        let count = result.hits.len();

        Ok(json!({
            "success": true,
            "index": index,
            "data": result.hits,
            "count": count,
            "limitApplied": limit.min(self.service.max_limit()),
            "totalEstimated": result.total_estimated,
            "processingTimeMs": result.processing_time_ms,
            "message": format!("Found {} documents in '{}'", count, index),
        }))
    }

    async fn index_stats(&self, arguments: Value) -> Result<Value> {
        let args: IndexStatsArgs = parse_args(arguments)?;
        let index = self.resolve_index(args.index)?;

        let stats = fetch_index_stats(&index, self.backend.as_ref()).await?;
        Ok(json!({
            "success": true,
            "index": index,
            "data": stats,
            "message": format!("Index '{}' holds {} documents", index, stats.document_count),
        }))
    }

    async fn all_indexes(&self, arguments: Value) -> Result<Value> {
        let _: NoArgs = parse_args(arguments)?;

        let indexes = list_indexes(self.backend.as_ref()).await?;
        let count = indexes.len();
        Ok(json!({
            "success": true,
            "data": indexes,
            "count": count,
            "message": format!("Found {} indexes", count),
        }))
    }

    async fn init_index(&self, arguments: Value) -> Result<Value> {
        let args: InitIndexArgs = parse_args(arguments)?;
        let index = self.resolve_index(args.index)?;

        let settings = match args.settings {
            Some(settings) => settings,
            None => self.declared_settings.get(&index).cloned().ok_or_else(|| {
                AppError::Validation(format!(
                    "no settings given and none declared for index '{}'",
                    index
                ))
            })?,
        };

        let applied = apply_index_settings(&index, &settings, self.backend.as_ref()).await?;
        Ok(json!({
            "success": true,
            "index": index,
            "data": applied,
            "message": format!("Applied settings to index '{}'", index),
        }))
    }

    fn resolve_index(&self, requested: Option<String>) -> Result<String> {
        requested
            .or_else(|| self.default_index.clone())
            .ok_or_else(|| {
                AppError::Validation("index is required (no default index configured)".to_string())
            })
    }
}

/// Failure payload returned to tool callers
pub fn error_payload(error: &AppError) -> Value {
    json!({
        "success": false,
        "error": error.to_payload(),
    })
}

/// Decode and validate tool arguments; `null` means "no arguments"
fn parse_args<T>(arguments: Value) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    let args: T = serde_json::from_value(arguments)
        .map_err(|e| AppError::Validation(format!("invalid arguments: {}", e)))?;
    args.validate()?;
    Ok(args)
}

impl Validate for NoArgs {
    fn validate(&self) -> std::result::Result<(), validator::ValidationErrors> {
        Ok(())
    }
}

fn search_schema(with_index: bool) -> Value {
    let mut properties = json!({
        "query": {
            "type": "string",
            "description": "Keyword query; may be empty to browse by filter only"
        },
        "filter_conditions": {
            "type": "object",
            "description": "Field conditions, AND-combined. A scalar means equality, an array means \
                            membership, an object maps operators (eq, ne, gt, gte, lt, lte) to values. \
                            Time fields accept ISO 8601 strings or UNIX seconds.",
            "additionalProperties": true
        },
        "limit": { "type": "integer", "minimum": 1, "default": 20 },
        "offset": { "type": "integer", "minimum": 0, "default": 0 },
        "attributes_to_retrieve": {
            "type": "array",
            "items": { "type": "string" },
            "description": "Fields to return per hit"
        },
        "sort": {
            "type": "array",
            "items": { "type": "string", "pattern": "^.+:(asc|desc)$" },
            "description": "Sort rules such as createdAt:desc, highest priority first"
        }
    });
    if with_index {
        properties["index"] = json!({ "type": "string", "description": "Index uid" });
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": ["query"],
        "additionalProperties": false
    })
}

fn init_index_schema() -> Value {
    let string_list = json!({ "type": "array", "items": { "type": "string" } });
    json!({
        "type": "object",
        "properties": {
            "index": { "type": "string", "description": "Index uid" },
            "settings": {
                "type": "object",
                "properties": {
                    "searchableAttributes": string_list,
                    "filterableAttributes": string_list,
                    "sortableAttributes": string_list,
                    "displayedAttributes": string_list,
                    "synonyms": {
                        "type": "object",
                        "additionalProperties": string_list
                    }
                },
                "required": [
                    "searchableAttributes",
                    "filterableAttributes",
                    "sortableAttributes",
                    "displayedAttributes",
                    "synonyms"
                ]
            }
        },
        "additionalProperties": false
    })
}
