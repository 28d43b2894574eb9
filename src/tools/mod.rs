//! Tool registry and dispatch.
//!
//! The dispatcher is the single exception boundary between model-issued
//! arguments and handler code: whatever shape the arguments arrive in,
//! `dispatch` returns a JSON value — a structured `{"error": ...}` for
//! anything it cannot route or normalize.

pub mod command;
pub mod file;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

/// Tool metadata exposed to the model, in the tool-calling protocol shape.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub version: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    #[serde(rename = "outputSchema")]
    pub output_schema: Value,
    pub examples: Value,
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Execute with normalized arguments. Handlers return structured result
    /// values for every failure mode; they never error.
    async fn invoke(&self, args: &Map<String, Value>) -> Value;
}

#[derive(Default)]
pub struct ToolDispatcher {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.definition().name;
        info!("registering tool: {}", name);
        self.handlers.insert(name, handler);
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.handlers.values().map(|h| h.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Route a named invocation to its handler. `raw_args` may be a JSON
    /// object or a JSON-encoded string; aliases and loose shapes are
    /// normalized before the handler sees them.
    pub async fn dispatch(&self, name: &str, raw_args: &Value) -> Value {
        let Some(handler) = self.handlers.get(name) else {
            warn!("unknown tool requested: {}", name);
            return json!({"error": format!("Unknown tool: {}", name)});
        };

        let args = match normalize_arguments(raw_args) {
            Ok(args) => args,
            Err(reason) => {
                warn!("argument normalization failed for {}: {}", name, reason);
                return json!({"error": reason});
            }
        };

        handler.invoke(&args).await
    }
}

/// Accepts a mapping or a JSON-encoded string, resolves key aliases, recovers
/// a file path from a free-text `description` field, and coerces structured
/// `content` values to strings.
fn normalize_arguments(raw: &Value) -> Result<Map<String, Value>, String> {
    let mut args = match raw {
        Value::Object(map) => map.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(format!("Tool arguments must be a JSON object, got: {}", other));
            }
            Err(e) => return Err(format!("Tool arguments are not valid JSON: {}", e)),
        },
        Value::Null => Map::new(),
        other => {
            return Err(format!("Tool arguments must be a JSON object, got: {}", other));
        }
    };

    if !args.contains_key("file_path")
        && let Some(path) = args.remove("path")
    {
        args.insert("file_path".to_string(), path);
    }
    if !args.contains_key("command")
        && let Some(cmd) = args.remove("cmd")
    {
        args.insert("command".to_string(), cmd);
    }

    // Some models stuff the path into a description like "Read file: /x/y.md".
    if !args.contains_key("file_path")
        && let Some(Value::String(desc)) = args.get("description")
        && let Ok(re) = Regex::new(r"(?i)(?:read|write|delete)\s+file:\s*(\S+)")
        && let Some(captures) = re.captures(desc)
    {
        args.insert(
            "file_path".to_string(),
            Value::String(captures[1].to_string()),
        );
    }

    if let Some(content) = args.get("content")
        && (content.is_object() || content.is_array())
    {
        let coerced = serde_json::to_string(content)
            .map_err(|e| format!("Failed to coerce content to string: {}", e))?;
        args.insert("content".to_string(), Value::String(coerced));
    } else if let Some(content) = args.get("content")
        && !content.is_string()
        && !content.is_null()
    {
        let coerced = content.to_string();
        args.insert("content".to_string(), Value::String(coerced));
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".to_string(),
                version: "1.0.0".to_string(),
                description: "Echo arguments back".to_string(),
                category: "test".to_string(),
                input_schema: json!({"type": "object"}),
                output_schema: json!({"type": "object"}),
                examples: json!([]),
            }
        }

        async fn invoke(&self, args: &Map<String, Value>) -> Value {
            Value::Object(args.clone())
        }
    }

    fn dispatcher() -> ToolDispatcher {
        let mut d = ToolDispatcher::new();
        d.register(Arc::new(EchoHandler));
        d
    }

    #[tokio::test]
    async fn unknown_tool_returns_structured_error() {
        let d = dispatcher();
        let result = d.dispatch("no_such_tool", &json!({})).await;
        assert_eq!(result["error"], "Unknown tool: no_such_tool");
    }

    #[tokio::test]
    async fn accepts_json_encoded_string_arguments() {
        let d = dispatcher();
        let result = d
            .dispatch("echo", &Value::String(r#"{"k": "v"}"#.to_string()))
            .await;
        assert_eq!(result["k"], "v");
    }

    #[tokio::test]
    async fn invalid_json_string_fails_gracefully() {
        let d = dispatcher();
        let result = d
            .dispatch("echo", &Value::String("{not json".to_string()))
            .await;
        assert!(result["error"].as_str().unwrap().contains("not valid JSON"));
    }

    #[tokio::test]
    async fn non_object_arguments_fail_gracefully() {
        let d = dispatcher();
        let result = d.dispatch("echo", &json!([1, 2, 3])).await;
        assert!(result["error"].as_str().unwrap().contains("JSON object"));
        let result = d.dispatch("echo", &Value::String("[1,2]".to_string())).await;
        assert!(result["error"].as_str().unwrap().contains("JSON object"));
    }

    #[tokio::test]
    async fn null_arguments_become_empty_object() {
        let d = dispatcher();
        let result = d.dispatch("echo", &Value::Null).await;
        assert_eq!(result, json!({}));
    }

    #[tokio::test]
    async fn path_alias_is_normalized() {
        let d = dispatcher();
        let result = d.dispatch("echo", &json!({"path": "/tmp/a.txt"})).await;
        assert_eq!(result["file_path"], "/tmp/a.txt");
        assert!(result.get("path").is_none());
    }

    #[tokio::test]
    async fn file_path_wins_over_path_alias() {
        let d = dispatcher();
        let result = d
            .dispatch("echo", &json!({"file_path": "/a", "path": "/b"}))
            .await;
        assert_eq!(result["file_path"], "/a");
    }

    #[tokio::test]
    async fn cmd_alias_is_normalized() {
        let d = dispatcher();
        let result = d.dispatch("echo", &json!({"cmd": "ls"})).await;
        assert_eq!(result["command"], "ls");
    }

    #[tokio::test]
    async fn path_recovered_from_description_field() {
        let d = dispatcher();
        let result = d
            .dispatch("echo", &json!({"description": "Read file: /tmp/x.md"}))
            .await;
        assert_eq!(result["file_path"], "/tmp/x.md");
    }

    #[tokio::test]
    async fn object_content_is_coerced_to_json_string() {
        let d = dispatcher();
        let result = d
            .dispatch("echo", &json!({"content": {"a": 1}}))
            .await;
        assert_eq!(result["content"], r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn numeric_content_is_coerced_to_string() {
        let d = dispatcher();
        let result = d.dispatch("echo", &json!({"content": 42})).await;
        assert_eq!(result["content"], "42");
    }

    #[tokio::test]
    async fn string_content_passes_through() {
        let d = dispatcher();
        let result = d
            .dispatch("echo", &json!({"content": "plain text"}))
            .await;
        assert_eq!(result["content"], "plain text");
    }

    #[test]
    fn definitions_are_sorted_by_name() {
        let mut d = ToolDispatcher::new();
        d.register(Arc::new(command::CommandTool::new(300)));
        d.register(Arc::new(EchoHandler));
        let names: Vec<String> = d.definitions().into_iter().map(|x| x.name).collect();
        assert_eq!(names, vec!["command_executor", "echo"]);
    }

    #[test]
    fn definition_serializes_with_camel_case_schema_keys() {
        let def = EchoHandler.definition();
        let v = serde_json::to_value(&def).unwrap();
        assert!(v.get("inputSchema").is_some());
        assert!(v.get("outputSchema").is_some());
        assert!(v.get("input_schema").is_none());
    }
}
