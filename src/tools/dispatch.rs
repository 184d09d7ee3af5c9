use rmcp::model::{CallToolResult, Content, JsonObject};
use serde::Deserialize;
use serde_json::Value;

use crate::core::error::DispatchError;
use crate::domain::{SearchQuery, DEFAULT_MAX_RESULTS};
use crate::search::SearchAdapter;
use crate::tools::registry::{ToolRegistry, WEB_SEARCH};

/// Names accepted for the search tool. Only the first is advertised.
pub const SEARCH_ALIASES: &[&str] = &[WEB_SEARCH, "search"];

/// One `tools/call`, owned by the dispatcher for the duration of the call.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub tool_name: String,
    pub arguments: JsonObject,
}

/// Typed arguments of the search tool. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct SearchArgs {
    #[serde(default)]
    query: Option<String>,
    #[serde(default, alias = "maxResults")]
    max_results: Option<Value>,
}

/// Routes tool calls to the search adapter and turns every rejection into text.
///
/// Failures travel only in the text; the result is never flagged as an error.
#[derive(Clone)]
pub struct Dispatcher {
    registry: ToolRegistry,
    adapter: SearchAdapter,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry, adapter: SearchAdapter) -> Self {
        Self { registry, adapter }
    }

    pub async fn invoke(&self, name: &str, arguments: JsonObject) -> CallToolResult {
        tracing::info!(tool = name, arguments = ?arguments, "tool call");
        let request = InvocationRequest {
            tool_name: name.to_owned(),
            arguments,
        };

        match self.validate(request) {
            Ok(query) => {
                tracing::info!(query = %query.query, max_results = query.max_results, "executing search");
                let reply = self.adapter.run(&query.query, query.max_results).await;
                tracing::info!(chars = reply.text.len(), failed = reply.is_error, "search result");
                CallToolResult::success(vec![Content::text(reply.text)])
            }
            Err(e) => {
                tracing::error!(tool = name, "{e}");
                CallToolResult::success(vec![Content::text(e.to_string())])
            }
        }
    }

    /// Resolve the tool name and check arguments without touching the provider.
    pub fn validate(&self, request: InvocationRequest) -> Result<SearchQuery, DispatchError> {
        if !SEARCH_ALIASES.contains(&request.tool_name.as_str()) {
            return Err(DispatchError::UnknownTool {
                name: request.tool_name,
                available: self.registry.names().join(", "),
            });
        }

        let args: SearchArgs = serde_json::from_value(Value::Object(request.arguments)).map_err(
            |e| DispatchError::InvalidArguments {
                tool: WEB_SEARCH.to_string(),
                detail: e.to_string(),
            },
        )?;

        let query = args.query.unwrap_or_default();
        if query.is_empty() {
            return Err(DispatchError::MissingQuery);
        }

        let max_results = match args.max_results {
            None => DEFAULT_MAX_RESULTS,
            Some(v) => match result_limit(&v) {
                Some(n) if n >= 1 => n,
                _ => {
                    return Err(DispatchError::InvalidArguments {
                        tool: WEB_SEARCH.to_string(),
                        detail: format!("max_results must be a positive integer, got {v}"),
                    })
                }
            },
        };

        Ok(SearchQuery { query, max_results })
    }
}

/// Integer limits, including integral floats like `2.0` that some clients emit.
fn result_limit(v: &Value) -> Option<u32> {
    let n = match v.as_u64() {
        Some(n) => n,
        None => {
            let f = v.as_f64()?;
            if f.fract() != 0.0 || f < 0.0 || f > f64::from(u32::MAX) {
                return None;
            }
            f as u64
        }
    };
    u32::try_from(n).ok()
}
