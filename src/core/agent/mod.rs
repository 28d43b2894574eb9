//! The agent execution loop.
//!
//! An [`AgentRunner`] drives one role through a model/tool conversation:
//! call the model, execute any tool calls it requests, feed results back,
//! repeat until the model answers in plain text or a guard fires. Transient
//! model failures are retried with exponential backoff; tool failures are
//! structured results the model sees, never loop failures. The only error
//! `run` can raise is a persistence failure.

pub mod roles;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::StoreError;
use crate::core::llm::{ChatTurn, ModelClient, ToolCallRequest};
use crate::core::store::message_store::MessageStore;
use crate::core::store::records::{MessageRecord, extract_task_list};
use crate::core::store::task_store::TaskStore;
use crate::tools::ToolDispatcher;
use roles::AgentRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    AwaitingModel,
    ModelResponded,
    ToolRequested,
    ToolExecuted,
    Done,
    Failed,
}

/// What a run produced. `ref_id` is set only when the run completed and its
/// transcript was persisted.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub success: bool,
    pub content: String,
    pub transcript: Vec<ChatTurn>,
    pub ref_id: Option<String>,
    pub error: Option<String>,
    pub state: RunState,
}

impl RunOutcome {
    fn failed(error: impl Into<String>, transcript: Vec<ChatTurn>) -> Self {
        Self {
            success: false,
            content: String::new(),
            transcript,
            ref_id: None,
            error: Some(error.into()),
            state: RunState::Failed,
        }
    }
}

pub struct AgentRunner {
    role: AgentRole,
    model: Arc<dyn ModelClient>,
    dispatcher: Arc<ToolDispatcher>,
    tasks: TaskStore,
    messages: MessageStore,
    max_retries: u32,
    max_turns: u32,
}

impl AgentRunner {
    pub fn new(
        role: AgentRole,
        model: Arc<dyn ModelClient>,
        dispatcher: Arc<ToolDispatcher>,
        tasks: TaskStore,
        messages: MessageStore,
        max_retries: u32,
        max_turns: u32,
    ) -> Self {
        Self {
            role,
            model,
            dispatcher,
            tasks,
            messages,
            max_retries,
            max_turns,
        }
    }

    /// Run the loop on a fresh conversation seeded with the role's system
    /// prompt and the task text.
    pub async fn run(
        &self,
        task: &str,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, StoreError> {
        let transcript = vec![
            ChatTurn::system(self.role.system_prompt()),
            ChatTurn::user(task),
        ];
        self.drive(transcript, cancel).await
    }

    /// Continue from a persisted run: the latest transcript under `ref_id`
    /// plus a follow-up instruction.
    pub async fn resume(
        &self,
        ref_id: &str,
        follow_up: &str,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, StoreError> {
        let prior = self.messages.query_by_ref(ref_id).await?;
        let Some(last) = prior.last() else {
            return Ok(RunOutcome::failed(
                format!("no persisted run with ref_id {}", ref_id),
                Vec::new(),
            ));
        };
        let mut transcript = last.messages.clone();
        transcript.push(ChatTurn::user(follow_up));
        self.drive(transcript, cancel).await
    }

    async fn drive(
        &self,
        mut transcript: Vec<ChatTurn>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, StoreError> {
        let definitions = self.dispatcher.definitions();
        let mut retries: u32 = 0;
        let mut turns: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Ok(RunOutcome::failed("run cancelled", transcript));
            }
            if turns >= self.max_turns {
                warn!(role = %self.role, "run exceeded {} turns", self.max_turns);
                return Ok(RunOutcome::failed(
                    format!("run exceeded {} turns", self.max_turns),
                    transcript,
                ));
            }
            turns += 1;

            debug!(role = %self.role, turn = turns, state = ?RunState::AwaitingModel, "loop step");
            let reply = tokio::select! {
                _ = cancel.cancelled() => {
                    return Ok(RunOutcome::failed("run cancelled", transcript));
                }
                reply = self.model.invoke(&transcript, &definitions) => reply,
            };

            let reply = match reply {
                Ok(reply) => {
                    retries = 0;
                    debug!(role = %self.role, state = ?RunState::ModelResponded, "loop step");
                    reply
                }
                Err(e) => {
                    retries += 1;
                    if retries >= self.max_retries {
                        warn!(role = %self.role, "model failed after {} attempts: {}", retries, e);
                        return Ok(RunOutcome::failed(
                            format!("model failed after {} attempts: {}", retries, e),
                            transcript,
                        ));
                    }
                    let backoff = Duration::from_secs(2u64.saturating_pow(retries));
                    warn!(
                        role = %self.role,
                        "model call failed (attempt {}), retrying in {:?}: {}",
                        retries, backoff, e
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return Ok(RunOutcome::failed("run cancelled", transcript));
                        }
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    turns -= 1;
                    continue;
                }
            };

            let mut assistant = ChatTurn::assistant(reply.content.clone());
            if !reply.tool_calls.is_empty() {
                assistant.tool_calls = Some(wire_tool_calls(&reply.tool_calls));
            }
            transcript.push(assistant);

            if reply.tool_calls.is_empty() {
                return self.finish(reply.content, transcript).await;
            }

            debug!(role = %self.role, state = ?RunState::ToolRequested, "loop step");
            for call in &reply.tool_calls {
                if cancel.is_cancelled() {
                    return Ok(RunOutcome::failed("run cancelled", transcript));
                }
                info!(role = %self.role, tool = %call.name, "dispatching tool call");
                let result = tokio::select! {
                    _ = cancel.cancelled() => {
                        return Ok(RunOutcome::failed("run cancelled", transcript));
                    }
                    result = self.dispatcher.dispatch(&call.name, &call.arguments) => result,
                };
                transcript.push(ChatTurn::tool_result(&call.name, &call.id, result));
            }
            debug!(role = %self.role, state = ?RunState::ToolExecuted, "loop step");
        }
    }

    async fn finish(
        &self,
        content: String,
        transcript: Vec<ChatTurn>,
    ) -> Result<RunOutcome, StoreError> {
        // One id per run: the record id doubles as the correlation id.
        let run_id = Uuid::new_v4();
        let ref_id = run_id.to_string();
        let record = MessageRecord {
            id: run_id,
            name: self.role.display_name().to_string(),
            agent: self.role.tag().to_string(),
            content: content.clone(),
            messages: transcript.clone(),
            completed: true,
            llm_model: self.model.model_id().to_string(),
            ref_id: Some(ref_id.clone()),
            created_at: Utc::now(),
        };
        self.messages.save(&record).await?;

        if let Some(list) = extract_task_list(&content) {
            let saved = self.tasks.save_planned(&list).await?;
            info!(role = %self.role, "run produced {} task(s)", saved);
        }

        info!(role = %self.role, ref_id = %ref_id, "run complete");
        Ok(RunOutcome {
            success: true,
            content,
            transcript,
            ref_id: Some(ref_id),
            error: None,
            state: RunState::Done,
        })
    }
}

/// Tool-call requests in the wire shape expected on an assistant message.
fn wire_tool_calls(calls: &[ToolCallRequest]) -> Value {
    Value::Array(
        calls
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "type": "function",
                    "function": {
                        "name": c.name,
                        "arguments": c.arguments.to_string(),
                    }
                })
            })
            .collect(),
    )
}
