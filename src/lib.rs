//! Search gateway
//!
//! Exposes a Meilisearch instance as a small set of agent tools over MCP
//! (JSON-RPC 2.0 on `POST /mcp`) with a REST mirror under `/v1/tools`.
//!
//! The [`search`] module holds the backend-agnostic core: filter compilation,
//! sort validation, search orchestration, index settings and stats. It talks
//! to the outside world only through [`backend::SearchBackend`].

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod metrics;
pub mod search;

pub use error::{AppError, Result};
