//! Backend-agnostic search core
//!
//! Translates structured tool input into Meilisearch calls:
//!
//! - **Filters**: `{"category": ["Box", "Carton"], "quantity": {"gte": 1000}}`
//!   compiles to `category IN ["Box", "Carton"] AND quantity >= 1000`
//! - **Sort**: `field:asc|desc` tokens, checked against the index's sortable attributes
//! - **Search**: one backend call per request, with pagination and field projection
//! - **Settings**: wholesale, idempotent application of index settings
//! - **Stats**: document counts and field distribution per index
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 SearchService                    │
//! │  validate → compile filter → validate sort       │
//! │  → clamp limit → one backend call → normalize    │
//! └─────────────────────────────────────────────────┘
//!            │                         │
//!            ▼                         ▼
//! ┌──────────────────────┐  ┌──────────────────────┐
//! │   FilterCompiler     │  │    validate_sort     │
//! │   (literal escaping) │  │                      │
//! └──────────────────────┘  └──────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │        SearchBackend (Meilisearch, memory)       │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use search_gateway::backend::MeilisearchClient;
//! use search_gateway::config::Config;
//! use search_gateway::search::{FilterDescription, SearchRequest, SearchService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let backend = MeilisearchClient::new(&config)?;
//!     let service = SearchService::default();
//!
//!     let filter = FilterDescription::from_value(&json!({"category": "Box"}))?;
//!     let request = SearchRequest::new("supply_demands", "纸箱")
//!         .with_filter(filter)
//!         .with_sort(vec!["createdAt:desc"])
//!         .with_limit(10);
//!
//!     let result = service.execute(&request, &backend).await?;
//!     println!("Found ~{} documents", result.total_estimated);
//!
//!     Ok(())
//! }
//! ```

pub mod filter;
pub mod literal;
mod query;
mod service;
mod settings;
mod sort;
mod stats;

pub use filter::{compile_filter, CompiledFilter, Condition, FilterCompiler, FilterDescription, RelationalOp, Scalar};
pub use query::{SearchRequest, SearchResult, DEFAULT_LIMIT};
pub use service::{SearchService, DEFAULT_MAX_LIMIT};
pub use settings::{apply_index_settings, ApplyResult, IndexSettings, SettingsCategory};
pub use sort::{validate_sort, SortDirection, SortKey};
pub use stats::{fetch_index_stats, list_indexes, IndexStats};
