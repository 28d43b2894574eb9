//! OpenAI-compatible chat-completions client with tool calling.
//!
//! Works against any endpoint speaking the `/chat/completions` protocol
//! (DeepSeek, OpenAI, local gateways); base URL and model come from config.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::ModelConfig;
use crate::core::llm::{ChatTurn, ModelClient, ModelReply, ToolCallRequest};
use crate::tools::ToolDefinition;

pub struct OpenAiCompatClient {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiCompatClient {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client: Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

fn wire_message(turn: &ChatTurn) -> Value {
    match turn.role.as_str() {
        "tool" => json!({
            "role": "tool",
            "tool_call_id": turn.tool_call_id,
            "content": turn.content,
        }),
        "assistant" if turn.tool_calls.is_some() => json!({
            "role": "assistant",
            "content": turn.content,
            "tool_calls": turn.tool_calls,
        }),
        role => json!({"role": role, "content": turn.content}),
    }
}

fn wire_tool(def: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": def.name,
            "description": def.description,
            "parameters": def.input_schema,
        }
    })
}

#[async_trait]
impl ModelClient for OpenAiCompatClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn invoke(
        &self,
        messages: &[ChatTurn],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply> {
        let mut body = json!({
            "model": self.model,
            "messages": messages.iter().map(wire_message).collect::<Vec<_>>(),
            "temperature": 0,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(wire_tool).collect());
        }

        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(anyhow!(
                "model API error ({}): {}",
                res.status(),
                res.text().await.unwrap_or_default()
            ));
        }

        let parsed: ChatResponse = res.json().await?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| anyhow!("model API returned no choices"))?;

        let tool_calls = message
            .tool_calls
            .into_iter()
            .map(|tc| ToolCallRequest {
                id: tc.id,
                // Arguments arrive JSON-encoded; keep the raw string if it
                // does not parse so the dispatcher can report it.
                arguments: serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(Value::String(tc.function.arguments)),
                name: tc.function.name,
            })
            .collect();

        Ok(ModelReply {
            content: message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}
