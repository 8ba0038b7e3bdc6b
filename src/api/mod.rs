pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::backend::SearchBackend;
use crate::config::Config;
use crate::mcp::ToolRegistry;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub tools: Arc<ToolRegistry>,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn SearchBackend>) -> Self {
        let tools = Arc::new(ToolRegistry::new(&config, backend));
        Self {
            tools,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        self.tools.backend()
    }
}
