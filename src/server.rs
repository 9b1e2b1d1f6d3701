//! MCP-compatible HTTP tool server.
//!
//! Exposes the extraction, lookup, retrieval, and validation operations as
//! tools over a JSON HTTP API suitable for Cursor, Claude, and other
//! MCP-compatible chat clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all tools with parameter schemas |
//! | `POST` | `/tools/{name}` | Call a tool by name |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Tools
//!
//! | Tool | Behavior |
//! |------|----------|
//! | `extract_tables` | Extract a report PDF's tables to `<base>_tables.json` |
//! | `get_table_data` | Look up a table title across every log date |
//! | `retrieve_chunks` | Retrieve relevant report chunks for a query |
//! | `validate_report` | Retrieve context and ask the LLM for a validation verdict |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `embeddings_disabled`
//! (400), `tool_error` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients and cross-origin tool calls.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::db;
use crate::extract;
use crate::lookup;
use crate::search;
use crate::validate;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
}

/// Starts the MCP-compatible HTTP server on `[server].bind`.
///
/// Runs until the process is terminated. This is the entry point used by
/// the `rods serve mcp` command.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
    };

    println!("Registered {} tools:", tool_list().len());
    for t in tool_list() {
        println!("  POST /tools/{} — {}", t.name, t.description);
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("MCP server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn tool_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "tool_error".to_string(),
        message: message.into(),
    }
}

/// Map tool execution errors to the most appropriate HTTP status without
/// threading a custom error type through every operation.
fn classify_tool_error(tool_name: &str, err: anyhow::Error) -> AppError {
    let msg = err.to_string();

    if msg.contains("not found") || msg.contains("does not exist") {
        not_found(format!("{}: {}", tool_name, msg))
    } else if msg.contains("must not be empty")
        || msg.contains("required")
        || msg.contains("embeddings")
        || msg.contains("disabled")
        || msg.contains("Unknown")
    {
        let mut e = bad_request(format!("{}: {}", tool_name, msg));
        if msg.contains("embeddings") || msg.contains("Embedding") {
            e.code = "embeddings_disabled".to_string();
        }
        e
    } else {
        tool_error(format!("{}: {}", tool_name, msg))
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize, Clone)]
struct ToolInfo {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

fn tool_list() -> Vec<ToolInfo> {
    vec![
        ToolInfo {
            name: "extract_tables".to_string(),
            description: "Extract a report PDF's tables into <base>_tables.json".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "pdf_path": { "type": "string", "description": "Path to the report PDF" }
                },
                "required": ["pdf_path"]
            }),
        },
        ToolInfo {
            name: "get_table_data".to_string(),
            description: "Look up a table title across every log date in an extracted document"
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "data_file_path": { "type": "string", "description": "Path to a _tables.json file" },
                    "table_id": { "type": "string", "description": "Normalized table title key" }
                },
                "required": ["data_file_path", "table_id"]
            }),
        },
        ToolInfo {
            name: "retrieve_chunks".to_string(),
            description: "Retrieve relevant report chunks for a free-text query".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Free-text query" },
                    "chunks": { "type": "integer", "description": "Number of chunks to return" },
                    "mode": { "type": "string", "description": "keyword, semantic, or hybrid" }
                },
                "required": ["query"]
            }),
        },
        ToolInfo {
            name: "validate_report".to_string(),
            description: "Retrieve context for a query and ask the LLM to validate the segment"
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Report segment to validate" },
                    "chunks": { "type": "integer", "description": "Context chunks to retrieve" }
                },
                "required": ["query"]
            }),
        },
    ]
}

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools() -> Json<ToolListResponse> {
    Json(ToolListResponse { tools: tool_list() })
}

// ============ POST /tools/{name} ============

fn require_str<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, AppError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| bad_request(format!("parameter '{}' is required and must not be empty", key)))
}

async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = match name.as_str() {
        "extract_tables" => {
            let pdf_path = require_str(&params, "pdf_path")?.to_string();
            // PDF parsing is CPU-bound; keep it off the async workers.
            let (output, doc) = tokio::task::spawn_blocking(move || {
                extract::create_retrieval_data(std::path::Path::new(&pdf_path))
            })
            .await
            .map_err(|e| tool_error(e.to_string()))?
            .map_err(|e| classify_tool_error(&name, e))?;

            serde_json::json!({
                "output_file": output.display().to_string(),
                "dates": doc.date_count(),
                "row_groups": doc.group_count(),
            })
        }
        "get_table_data" => {
            let data_file = require_str(&params, "data_file_path")?.to_string();
            let table_id = require_str(&params, "table_id")?.to_string();
            let matches = tokio::task::spawn_blocking(move || {
                lookup::lookup_tables(std::path::Path::new(&data_file), &table_id)
            })
            .await
            .map_err(|e| tool_error(e.to_string()))?
            .map_err(|e| classify_tool_error(&name, e))?;

            serde_json::json!({ "data": matches })
        }
        "retrieve_chunks" => {
            let query = require_str(&params, "query")?;
            let chunks_n = params
                .get("chunks")
                .and_then(|v| v.as_i64())
                .unwrap_or(state.config.retrieval.chunks);
            let mode = params
                .get("mode")
                .and_then(|v| v.as_str())
                .unwrap_or("keyword");

            let pool = db::connect(&state.config)
                .await
                .map_err(|e| tool_error(e.to_string()))?;
            let hits = search::search_chunks(&state.config, &pool, query, mode, chunks_n)
                .await
                .map_err(|e| classify_tool_error(&name, e))?;
            pool.close().await;

            serde_json::json!({ "chunks": hits })
        }
        "validate_report" => {
            let query = require_str(&params, "query")?;
            let chunks_n = params
                .get("chunks")
                .and_then(|v| v.as_i64())
                .unwrap_or(state.config.retrieval.chunks);

            let validation = validate::validate_report(&state.config, query, chunks_n)
                .await
                .map_err(|e| classify_tool_error(&name, e))?;

            serde_json::json!({
                "context_pages": validation.context_pages,
                "verdict": validation.verdict,
            })
        }
        _ => {
            return Err(not_found(format!("no tool registered with name: {}", name)));
        }
    };

    Ok(Json(serde_json::json!({ "result": result })))
}
