//! Shell command execution tool.
//!
//! Commands run either via direct spawn (whitespace-split argv) or through
//! `sh -c` when shell semantics are requested or detected. Every failure mode
//! is folded into a [`CommandOutcome`] with `success = false`; this handler
//! never returns an error to the dispatcher.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::process::Command;
use tracing::{info, warn};

use crate::tools::{ToolDefinition, ToolHandler};

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const MAX_TIMEOUT_SECS: u64 = 1800;

/// Operator tokens that plain argv splitting cannot express.
const SHELL_OPERATORS: [&str; 7] = ["&&", "||", "|", ">", "<", "&", "$"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub returncode: i64,
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutcome {
    fn failure(stderr: impl Into<String>) -> Self {
        Self {
            returncode: -1,
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        }
    }
}

pub struct CommandTool {
    timeout_secs: u64,
}

impl CommandTool {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout_secs: timeout_secs.clamp(1, MAX_TIMEOUT_SECS),
        }
    }

    /// True when the command contains an operator that requires shell
    /// interpretation (`&& || | > < & $`).
    pub fn needs_shell(command: &str) -> bool {
        SHELL_OPERATORS.iter().any(|op| command.contains(op))
    }

    /// Execute `command`, optionally in `cwd`. When `shell` is false but the
    /// command carries shell operators, the call is upgraded to shell mode.
    /// `timeout` overrides the configured bound, capped at [`MAX_TIMEOUT_SECS`].
    pub async fn execute(
        &self,
        command: &str,
        cwd: Option<&str>,
        shell: bool,
        timeout: Option<Duration>,
    ) -> CommandOutcome {
        if command.trim().is_empty() {
            return CommandOutcome::failure("Command must be a non-empty string");
        }

        let use_shell = shell || Self::needs_shell(command);
        if use_shell && !shell {
            info!("command contains shell operators, upgrading to shell mode");
        }

        let mut cmd = if use_shell {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        } else {
            let mut parts = command.split_whitespace();
            let Some(program) = parts.next() else {
                return CommandOutcome::failure("Command must be a non-empty string");
            };
            let mut c = Command::new(program);
            c.args(parts);
            c
        };

        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd.kill_on_drop(true);

        let bound = timeout
            .map(|t| t.min(Duration::from_secs(MAX_TIMEOUT_SECS)))
            .unwrap_or(Duration::from_secs(self.timeout_secs));

        match tokio::time::timeout(bound, cmd.output()).await {
            Ok(Ok(output)) => CommandOutcome {
                returncode: output.status.code().map(i64::from).unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                success: output.status.success(),
            },
            Ok(Err(e)) => {
                warn!("command spawn failed: {}", e);
                CommandOutcome::failure(e.to_string())
            }
            Err(_) => {
                warn!("command timed out after {:?}", bound);
                CommandOutcome::failure("Command execution timed out")
            }
        }
    }
}

#[async_trait]
impl ToolHandler for CommandTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "command_executor".to_string(),
            version: "1.0.0".to_string(),
            description: "Execute a shell command and return its exit code and output.".to_string(),
            category: "command_execution".to_string(),
            input_schema: json!({
                "type": "object",
                "title": "CommandInput",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The command to execute",
                        "examples": ["ls -la", "cargo build"]
                    },
                    "cwd": {
                        "type": ["string", "null"],
                        "description": "Working directory for the command"
                    },
                    "shell": {
                        "type": "boolean",
                        "description": "Run through the shell (auto-detected for piped commands)"
                    }
                },
                "required": ["command"]
            }),
            output_schema: json!({
                "type": "object",
                "title": "CommandOutput",
                "properties": {
                    "returncode": {"type": "integer"},
                    "stdout": {"type": "string"},
                    "stderr": {"type": "string"},
                    "success": {"type": "boolean"}
                },
                "required": ["returncode", "stdout", "stderr", "success"]
            }),
            examples: json!([
                {
                    "name": "List files",
                    "input": {"command": "ls -la", "cwd": null, "shell": false},
                    "output": {"returncode": 0, "stdout": "total 0\n", "stderr": "", "success": true}
                }
            ]),
        }
    }

    async fn invoke(&self, args: &Map<String, Value>) -> Value {
        let Some(command) = args.get("command").and_then(Value::as_str) else {
            return json!({"error": "Missing required field: command"});
        };
        let cwd = args.get("cwd").and_then(Value::as_str);
        let shell = args.get("shell").and_then(Value::as_bool).unwrap_or(false);

        let outcome = self.execute(command, cwd, shell, None).await;
        serde_json::to_value(&outcome)
            .unwrap_or_else(|e| json!({"error": format!("Failed to serialize result: {}", e)}))
    }
}
