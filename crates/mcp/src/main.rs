//! Taskmate MCP Server Binary
//!
//! ## Usage
//!
//! ```bash
//! # Serve ./todos.json over stdio
//! taskmate-mcp
//!
//! # Serve a different file
//! TASKMATE_STORAGE_TODO_FILE=/tmp/todos.json taskmate-mcp
//! ```
//!
//! Stdout carries the MCP protocol, so all logging goes to stderr.

use anyhow::Result;
use taskmate_core::config::{AppConfig, LoadOptions, LogFormat};
use taskmate_core::store::TodoStore;
use taskmate_mcp::TodoMcpServer;
use tracing::{info, Level};

fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_ansi(false)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(LoadOptions { skip_llm_validation: true, ..LoadOptions::default() })?;
    init_logging(&config);

    info!(
        event_name = "mcp.server.config_loaded",
        todo_file = %config.storage.todo_file.display(),
        "starting taskmate MCP server"
    );

    TodoMcpServer::new(TodoStore::open(config.storage.todo_file.clone())).run_stdio().await
}
