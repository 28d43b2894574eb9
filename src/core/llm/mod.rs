//! Model client abstraction.
//!
//! The agent loop only depends on [`ModelClient`]: send a transcript and the
//! available tool definitions, get back text and zero or more tool-call
//! requests. One HTTP implementation lives in [`openai_compat`]; tests script
//! their own.

pub mod openai_compat;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolDefinition;

/// One turn of a conversation, in the shape persisted inside a message
/// record. `tool_calls` carries the raw requests on assistant turns so a
/// resumed transcript can be replayed to the model verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_results: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,
}

impl ChatTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            tool_call_name: None,
            tool_call_id: None,
            tool_call_results: None,
            tool_calls: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    /// A tool-result turn correlated with the request that produced it.
    pub fn tool_result(name: &str, call_id: &str, result: Value) -> Self {
        Self {
            role: "tool".to_string(),
            content: result.to_string(),
            tool_call_name: Some(name.to_string()),
            tool_call_id: Some(call_id.to_string()),
            tool_call_results: Some(result),
            tool_calls: None,
        }
    }
}

/// A model-issued request to invoke a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Identifier recorded on persisted messages (e.g. "deepseek-chat").
    fn model_id(&self) -> &str;

    async fn invoke(&self, messages: &[ChatTurn], tools: &[ToolDefinition])
    -> Result<ModelReply>;
}
