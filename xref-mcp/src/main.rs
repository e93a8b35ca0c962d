//! xref MCP Server - code reference search and import analysis over stdio

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;
use xref_core::report;
use xref_core::{
    AnalysisOptions, Config, ListingCache, SearchEngine, SearchQuery, TextQuery, XrefError,
};

const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let root = match server_root() {
        Ok(root) => root,
        Err(e) => {
            tracing::error!(error = %e, "cannot determine project root");
            std::process::exit(1);
        }
    };
    let config = Config::for_root(&root).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring invalid config, using defaults");
        Config::default()
    });
    tracing::info!(root = %root.display(), "xref-mcp ready");

    let server = Arc::new(McpServer::new(root, config));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "failed to read request");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let id = request_id(&line);
        let handler = Arc::clone(&server);
        let response = match tokio::task::spawn_blocking(move || handler.handle_request(&line)).await
        {
            Ok(response) => response,
            Err(e) => Some(error_response(
                id,
                INTERNAL_ERROR,
                "Internal error".to_string(),
                Some(json!(format!("request handler failed: {}", e))),
            )),
        };

        if let Some(resp) = response {
            let written = async {
                stdout.write_all(resp.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await
            };
            if let Err(e) = written.await {
                tracing::error!(error = %e, "failed to write response");
                break;
            }
        }
    }
}

/// `XREF_ROOT` when set, the working directory otherwise
fn server_root() -> std::io::Result<PathBuf> {
    match std::env::var_os("XREF_ROOT") {
        Some(root) if !root.is_empty() => Ok(PathBuf::from(root)),
        _ => std::env::current_dir(),
    }
}

/// Best-effort request id, for replies that cannot come from the handler
fn request_id(line: &str) -> Value {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|v| v.get("id").cloned())
        .unwrap_or(Value::Null)
}

fn error_response(id: Value, code: i32, message: String, data: Option<Value>) -> String {
    let response = JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message,
            data,
        }),
    };
    serde_json::to_string(&response).unwrap_or_else(|_| {
        r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#
            .to_string()
    })
}

struct McpServer {
    root: PathBuf,
    engine: SearchEngine,
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

#[derive(Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl McpServer {
    fn new(root: PathBuf, config: Config) -> Self {
        let cache = Arc::new(ListingCache::new(config.cache_ttl()));
        Self {
            root,
            engine: SearchEngine::new(config).with_cache(cache),
        }
    }

    fn handle_request(&self, line: &str) -> Option<String> {
        let req: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                return Some(error_response(
                    Value::Null,
                    -32700,
                    format!("Parse error: {}", e),
                    None,
                ));
            }
        };

        let id = req.id.clone().unwrap_or(Value::Null);

        let result = match req.method.as_str() {
            "initialize" => self.handle_initialize(&req.params),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(&req.params),
            "code_reference_search" => {
                let params = req.params.clone().unwrap_or(json!({}));
                self.code_reference_search(&params).map(Value::String)
            }
            method if method.starts_with("notifications/") => return None,
            _ => Err((-32601, format!("Method not found: {}", req.method))),
        };

        let response = match result {
            Ok(value) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id,
                result: Some(value),
                error: None,
            },
            Err((INTERNAL_ERROR, detail)) => {
                tracing::warn!(method = %req.method, error = %detail, "request failed");
                return Some(error_response(
                    id,
                    INTERNAL_ERROR,
                    "Internal error".to_string(),
                    Some(json!(detail)),
                ));
            }
            Err((code, message)) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id,
                result: None,
                error: Some(JsonRpcError {
                    code,
                    message,
                    data: None,
                }),
            },
        };

        Some(serde_json::to_string(&response).unwrap_or_else(|e| {
            error_response(
                Value::Null,
                INTERNAL_ERROR,
                "Internal error".to_string(),
                Some(json!(e.to_string())),
            )
        }))
    }

    fn handle_initialize(&self, _params: &Option<Value>) -> Result<Value, (i32, String)> {
        Ok(json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": "xref-mcp",
                "version": env!("CARGO_PKG_VERSION")
            }
        }))
    }

    fn handle_tools_list(&self) -> Result<Value, (i32, String)> {
        Ok(json!({
            "tools": [
                {
                    "name": "code_reference_search",
                    "description": "Find definitions, references, usages and importers of a symbol, with confidence scores and optional dependency analysis",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "symbol": {
                                "type": "string",
                                "description": "Identifier to search for (e.g., 'getUser')"
                            },
                            "searchType": {
                                "type": "string",
                                "enum": ["definition", "references", "usage", "dependencies", "reverse-dependencies", "all"],
                                "description": "Category of occurrences to report (default: all)"
                            },
                            "basePath": {
                                "type": "string",
                                "description": "Directory to search, relative to the project root (default: '.')"
                            },
                            "includeComments": {
                                "type": "boolean",
                                "description": "Also match lines that are only comments (default: false)"
                            },
                            "fuzzyMatch": {
                                "type": "boolean",
                                "description": "Tolerate typos and casing differences (default: false)"
                            },
                            "maxResults": {
                                "type": "integer",
                                "minimum": 1,
                                "maximum": 200,
                                "description": "Maximum matches to return (default: 50)"
                            },
                            "includeDependencies": {
                                "type": "boolean",
                                "description": "List transitive imports of the top result files"
                            },
                            "includeReverseDependencies": {
                                "type": "boolean",
                                "description": "List files importing the top result files"
                            },
                            "analyzeImports": {
                                "type": "boolean",
                                "description": "List imports and exports of the top result files"
                            },
                            "depthLevel": {
                                "type": "integer",
                                "minimum": 1,
                                "maximum": 3,
                                "description": "Transitive dependency depth (default: 2)"
                            }
                        },
                        "required": ["symbol"]
                    }
                },
                {
                    "name": "text_search",
                    "description": "Search file contents line by line for a literal string or regular expression",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "pattern": {
                                "type": "string",
                                "description": "Text or regular expression to find"
                            },
                            "basePath": {
                                "type": "string",
                                "description": "Directory to search, relative to the project root (default: '.')"
                            },
                            "regex": {
                                "type": "boolean",
                                "description": "Treat pattern as a regular expression (default: false)"
                            },
                            "caseSensitive": {
                                "type": "boolean",
                                "description": "Match case exactly (default: false)"
                            },
                            "maxResults": {
                                "type": "integer",
                                "minimum": 1,
                                "maximum": 200,
                                "description": "Maximum lines to return (default: 50)"
                            }
                        },
                        "required": ["pattern"]
                    }
                },
                {
                    "name": "analyze_imports",
                    "description": "List the imports of a file with their resolved paths, its exports and optionally its dependencies",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "file": {
                                "type": "string",
                                "description": "File to analyze, relative to the project root"
                            },
                            "includeDependencies": {
                                "type": "boolean",
                                "description": "Also list transitive dependencies"
                            },
                            "includeReverseDependencies": {
                                "type": "boolean",
                                "description": "Also list files importing this file"
                            },
                            "depthLevel": {
                                "type": "integer",
                                "minimum": 1,
                                "maximum": 3,
                                "description": "Transitive dependency depth (default: 2)"
                            }
                        },
                        "required": ["file"]
                    }
                },
                {
                    "name": "resolve_import",
                    "description": "Resolve an import source, as written in a file, to the file it refers to",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "source": {
                                "type": "string",
                                "description": "Import source (e.g., './user', '@/lib/db')"
                            },
                            "fromFile": {
                                "type": "string",
                                "description": "File containing the import, relative to the project root"
                            }
                        },
                        "required": ["source", "fromFile"]
                    }
                }
            ]
        }))
    }

    fn handle_tools_call(&self, params: &Option<Value>) -> Result<Value, (i32, String)> {
        let params = params
            .as_ref()
            .ok_or((INVALID_PARAMS, "Missing params".to_string()))?;
        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or((INVALID_PARAMS, "Missing tool name".to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        let text = match name {
            "code_reference_search" => self.code_reference_search(&arguments)?,
            "text_search" => self.tool_text_search(&arguments)?,
            "analyze_imports" => self.tool_analyze_imports(&arguments)?,
            "resolve_import" => self.tool_resolve_import(&arguments)?,
            _ => return Err((INVALID_PARAMS, format!("Unknown tool: {}", name))),
        };

        Ok(json!({
            "content": [{
                "type": "text",
                "text": text
            }]
        }))
    }

    /// Markdown report for a symbol search
    fn code_reference_search(&self, args: &Value) -> Result<String, (i32, String)> {
        let mut args = object_args(args)?;
        if !args.get("symbol").is_some_and(Value::is_string) {
            return Err((INVALID_PARAMS, "Missing 'symbol' parameter".to_string()));
        }
        let defaults = &self.engine.config().search;
        args.entry("maxResults")
            .or_insert_with(|| json!(defaults.default_max_results));
        args.entry("depthLevel")
            .or_insert_with(|| json!(defaults.default_depth));

        let query: SearchQuery = serde_json::from_value(Value::Object(args))
            .map_err(|e| (INVALID_PARAMS, format!("Invalid params: {}", e)))?;

        match self.engine.search(query, &self.root) {
            Ok(outcome) => Ok(report::search_report(&outcome)),
            Err(e) => render_error(e),
        }
    }

    fn tool_text_search(&self, args: &Value) -> Result<String, (i32, String)> {
        let mut args = object_args(args)?;
        if !args.get("pattern").is_some_and(Value::is_string) {
            return Err((INVALID_PARAMS, "Missing 'pattern' parameter".to_string()));
        }
        let default_max = self.engine.config().search.default_max_results;
        args.entry("maxResults").or_insert_with(|| json!(default_max));

        let query: TextQuery = serde_json::from_value(Value::Object(args))
            .map_err(|e| (INVALID_PARAMS, format!("Invalid params: {}", e)))?;

        match self.engine.text_search(query, &self.root) {
            Ok(outcome) => Ok(report::text_search_report(&outcome)),
            Err(e) => render_error(e),
        }
    }

    fn tool_analyze_imports(&self, args: &Value) -> Result<String, (i32, String)> {
        let file = required_str(args, "file")?;
        let depth = args
            .get("depthLevel")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(self.engine.config().search.default_depth);
        let options = AnalysisOptions {
            imports: true,
            dependency_depth: flag(args, "includeDependencies").then_some(depth.clamp(1, 3)),
            reverse_dependencies: flag(args, "includeReverseDependencies"),
        };

        match self.engine.analyze_file(file, &self.root, options) {
            Ok(analysis) => Ok(report::analysis_report(&analysis)),
            Err(e) => render_error(e),
        }
    }

    fn tool_resolve_import(&self, args: &Value) -> Result<String, (i32, String)> {
        let source = required_str(args, "source")?;
        let from_file = required_str(args, "fromFile")?;

        match self.engine.resolve_import(source, from_file, &self.root) {
            Ok(resolved) => Ok(report::resolve_report(source, from_file, resolved.as_deref())),
            Err(e) => render_error(e),
        }
    }
}

/// Recoverable conditions become explanatory text; the rest map to protocol errors.
fn render_error(err: XrefError) -> Result<String, (i32, String)> {
    match err {
        e if e.is_recoverable() => Ok(report::recoverable_error(&e)),
        XrefError::InvalidQuery(message) => Err((INVALID_PARAMS, message)),
        e @ XrefError::Regex(_) => Err((INVALID_PARAMS, e.to_string())),
        e => Err((INTERNAL_ERROR, e.to_string())),
    }
}

fn object_args(args: &Value) -> Result<serde_json::Map<String, Value>, (i32, String)> {
    args.as_object()
        .cloned()
        .ok_or((INVALID_PARAMS, "Params must be an object".to_string()))
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, (i32, String)> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| (INVALID_PARAMS, format!("Missing '{}' parameter", key)))
}

fn flag(args: &Value, key: &str) -> bool {
    args.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn server() -> (TempDir, McpServer) {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("user.ts"), "export function getUser() {}\n").unwrap();
        fs::write(src.join("app.ts"), "import { getUser } from './user'\n\ngetUser();\n").unwrap();
        let server = McpServer::new(dir.path().to_path_buf(), Config::default());
        (dir, server)
    }

    fn call(server: &McpServer, request: Value) -> Value {
        let response = server.handle_request(&request.to_string()).unwrap();
        serde_json::from_str(&response).unwrap()
    }

    #[test]
    fn test_initialize() {
        let (_dir, server) = server();
        let resp = call(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}));
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["serverInfo"]["name"], "xref-mcp");
    }

    #[test]
    fn test_tools_list() {
        let (_dir, server) = server();
        let resp = call(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}));
        let names: Vec<&str> = resp["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["code_reference_search", "text_search", "analyze_imports", "resolve_import"]
        );
    }

    #[test]
    fn test_direct_search_returns_markdown() {
        let (_dir, server) = server();
        let resp = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "code_reference_search",
                "params": {"symbol": "getUser", "searchType": "definition"}
            }),
        );
        let text = resp["result"].as_str().unwrap();
        assert!(text.contains("## src/user.ts"));
        assert!(text.contains("[definition, 1.00]"));
    }

    #[test]
    fn test_tools_call_wraps_text_content() {
        let (_dir, server) = server();
        let resp = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "tools/call",
                "params": {"name": "resolve_import", "arguments": {"source": "./user", "fromFile": "src/app.ts"}}
            }),
        );
        assert_eq!(resp["result"]["content"][0]["type"], "text");
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("resolves to src/user.ts"));
    }

    #[test]
    fn test_missing_symbol_is_invalid_params() {
        let (_dir, server) = server();
        let resp = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 5, "method": "code_reference_search", "params": {}}),
        );
        assert_eq!(resp["error"]["code"], -32602);
    }

    #[test]
    fn test_bad_search_type_is_invalid_params() {
        let (_dir, server) = server();
        let resp = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 6,
                "method": "code_reference_search",
                "params": {"symbol": "getUser", "searchType": "callers"}
            }),
        );
        assert_eq!(resp["error"]["code"], -32602);
    }

    #[test]
    fn test_missing_base_path_is_successful_text() {
        let (_dir, server) = server();
        let resp = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "code_reference_search",
                "params": {"symbol": "getUser", "basePath": "missing"}
            }),
        );
        assert!(resp.get("error").is_none());
        assert!(resp["result"].as_str().unwrap().contains("`missing` does not exist"));
    }

    #[test]
    fn test_no_matches_is_successful_text() {
        let (_dir, server) = server();
        let resp = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 8,
                "method": "tools/call",
                "params": {"name": "code_reference_search", "arguments": {"symbol": "nowhereToBeFound"}}
            }),
        );
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("No matches found"));
    }

    #[test]
    fn test_text_search_tool() {
        let (_dir, server) = server();
        let resp = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 9,
                "method": "tools/call",
                "params": {"name": "text_search", "arguments": {"pattern": "getuser\\(\\)", "regex": true}}
            }),
        );
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("## src/app.ts"));
    }

    #[test]
    fn test_analyze_imports_tool() {
        let (_dir, server) = server();
        let resp = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 10,
                "method": "tools/call",
                "params": {"name": "analyze_imports", "arguments": {"file": "src/app.ts"}}
            }),
        );
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("`./user` {getUser}"));
        assert!(text.contains("-> src/user.ts"));
    }

    #[test]
    fn test_protocol_errors() {
        let (_dir, server) = server();
        let parse: Value = serde_json::from_str(&server.handle_request("{not json").unwrap()).unwrap();
        assert_eq!(parse["error"]["code"], -32700);

        let unknown = call(&server, json!({"jsonrpc": "2.0", "id": 11, "method": "frobnicate"}));
        assert_eq!(unknown["error"]["code"], -32601);

        let tool = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 12, "method": "tools/call", "params": {"name": "nope"}}),
        );
        assert_eq!(tool["error"]["code"], -32602);
    }

    #[test]
    fn test_notifications_have_no_response() {
        let (_dir, server) = server();
        let line = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
        assert!(server.handle_request(&line).is_none());
    }

    #[test]
    fn test_render_error_taxonomy() {
        assert!(render_error(XrefError::PathNotFound(PathBuf::from("x"))).is_ok());
        assert_eq!(
            render_error(XrefError::InvalidQuery("bad".to_string())).unwrap_err().0,
            INVALID_PARAMS
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(render_error(XrefError::Io(io)).unwrap_err().0, INTERNAL_ERROR);
    }

    #[test]
    fn test_request_id_recovery() {
        assert_eq!(request_id(r#"{"id": 42, "method": "x"}"#), json!(42));
        assert_eq!(request_id("garbage"), Value::Null);
    }
}
