//! `POST /mcp`: JSON-RPC 2.0 over HTTP

use crate::api::AppState;
use crate::error::AppError;
use crate::mcp::protocol::*;
use crate::mcp::tools::error_payload;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// Handle one JSON-RPC message. Notifications get `202 Accepted` with no body.
pub async fn handle_mcp(State(state): State<AppState>, body: Bytes) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable JSON-RPC message");
            return rpc_error(Value::Null, JsonRpcError::parse_error(format!("Parse error: {}", e)));
        }
    };

    let id = message.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = match serde_json::from_value(message) {
        Ok(request) => request,
        Err(e) => {
            return rpc_error(id, JsonRpcError::invalid_request(format!("Invalid request: {}", e)))
        }
    };
    if request.jsonrpc != JSONRPC_VERSION {
        return rpc_error(id, JsonRpcError::invalid_request("jsonrpc must be \"2.0\""));
    }

    let outcome = dispatch(&state, &request).await;

    if request.is_notification() {
        return StatusCode::ACCEPTED.into_response();
    }

    let response = match outcome {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => JsonRpcResponse::failure(id, error),
    };
    Json(response).into_response()
}

async fn dispatch(state: &AppState, request: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
    let method = request
        .method
        .parse::<McpMethod>()
        .map_err(|_| JsonRpcError::method_not_found(&request.method))?;

    tracing::debug!(method = %method, "Handling MCP request");

    match method {
        McpMethod::Initialize => to_result(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: state.config.observability.service_name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }),
        McpMethod::Initialized | McpMethod::Ping => Ok(json!({})),
        McpMethod::ListTools => to_result(ListToolsResult {
            tools: state.tools.definitions(),
        }),
        McpMethod::CallTool => {
            let params: CallToolParams = request
                .params
                .clone()
                .ok_or_else(|| JsonRpcError::invalid_params("tools/call requires params"))
                .and_then(|params| {
                    serde_json::from_value(params)
                        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
                })?;

            if !state.tools.contains(&params.name) {
                return Err(JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name))
                    .with_data(error_payload(&AppError::ToolNotFound(params.name.clone()))));
            }

            let result = match state
                .tools
                .call(&params.name, params.arguments.unwrap_or(Value::Null))
                .await
            {
                Ok(payload) => CallToolResult::from_payload(payload, false),
                Err(e) => CallToolResult::from_payload(error_payload(&e), true),
            };
            to_result(result)
        }
    }
}

fn to_result<T: serde::Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal(e.to_string()))
}

fn rpc_error(id: Value, error: JsonRpcError) -> Response {
    Json(JsonRpcResponse::failure(id, error)).into_response()
}
