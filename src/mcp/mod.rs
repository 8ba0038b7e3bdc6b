//! Model Context Protocol surface
//!
//! - [`protocol`]: JSON-RPC 2.0 envelopes and MCP payloads
//! - [`tools`]: tool definitions and dispatch into the search core
//! - [`server`]: the `POST /mcp` handler

pub mod protocol;
pub mod server;
pub mod tools;

pub use protocol::{CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolDefinition};
pub use server::handle_mcp;
pub use tools::{error_payload, ToolKind, ToolRegistry};
