mod config;
mod core;
mod logging;
mod tools;

use std::sync::Arc;

use anyhow::{Result, bail};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::AppConfig;
use crate::core::agent::AgentRunner;
use crate::core::agent::roles::AgentRole;
use crate::core::llm::openai_compat::OpenAiCompatClient;
use crate::core::store::SqliteStore;
use crate::core::store::message_store::MessageStore;
use crate::core::store::task_store::TaskStore;
use crate::tools::ToolDispatcher;
use crate::tools::command::CommandTool;
use crate::tools::file::{FileHandler, FileOp, FileTool};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    run().await
}

async fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let role = match args.next() {
        Some(tag) => match AgentRole::from_tag(&tag) {
            Some(role) => role,
            None => bail!("unknown agent role: {}", tag),
        },
        None => bail!("usage: foreman <role> <task text>"),
    };
    let task = args.collect::<Vec<_>>().join(" ");
    if task.is_empty() {
        bail!("usage: foreman <role> <task text>");
    }

    let config = AppConfig::load(None)?;
    if config.model.api_key.is_empty() {
        bail!("no API key: set FOREMAN_API_KEY or model.api_key in foreman.toml");
    }

    let store = SqliteStore::open(&config.store.db_path)?;
    let tasks = TaskStore::new(store.clone());
    let messages = MessageStore::new(store);

    let mut dispatcher = ToolDispatcher::new();
    dispatcher.register(Arc::new(CommandTool::new(config.tools.command_timeout_secs)));
    let file_tool = Arc::new(FileTool::new(&config.tools));
    for op in [FileOp::Write, FileOp::Read, FileOp::Delete] {
        dispatcher.register(Arc::new(FileHandler::new(file_tool.clone(), op)));
    }

    let runner = AgentRunner::new(
        role,
        Arc::new(OpenAiCompatClient::new(&config.model)),
        Arc::new(dispatcher),
        tasks,
        messages,
        config.agent.max_retries,
        config.agent.max_turns,
    );

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling run");
            ctrl_c_cancel.cancel();
        }
    });

    let outcome = runner.run(&task, &cancel).await?;
    if outcome.success {
        println!("{}", outcome.content);
        if let Some(ref_id) = outcome.ref_id {
            info!(ref_id = %ref_id, "transcript persisted");
        }
        Ok(())
    } else {
        bail!(
            "run failed: {}",
            outcome.error.unwrap_or_else(|| "unknown error".to_string())
        )
    }
}
