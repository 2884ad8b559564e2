//! Taskmate MCP (Model Context Protocol) plumbing
//!
//! Both ends of the tool session live here:
//!
//! - `TodoMcpServer`: stdio MCP server exposing the todo file as six tools
//! - `McpToolSession`: client that spawns a tool server and implements
//!   `ToolInvoker` for the conversation runtime
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use taskmate_mcp::{McpToolSession, ServerLaunch};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let launch = ServerLaunch::infer("taskmate-mcp", &[]);
//!     let session = McpToolSession::connect(&launch, Duration::from_secs(10)).await?;
//!     println!("{} tools", session.list_tools().await?.len());
//!     session.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod client;
mod server;

pub use client::{McpToolSession, ServerLaunch};
pub use server::{StatusInput, TaskFieldsInput, TaskIdInput, TodoMcpServer};

use taskmate_core::errors::ApplicationError;
use thiserror::Error;

/// Errors raised while establishing or using a tool session
#[derive(Error, Debug)]
pub enum McpSessionError {
    #[error("failed to spawn tool server `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tool server did not complete the handshake within {0}s")]
    StartupTimeout(u64),

    #[error("tool server handshake failed: {0}")]
    Handshake(String),

    #[error("tool session request failed: {0}")]
    Request(String),

    #[error("tool session shutdown failed: {0}")]
    Shutdown(String),
}

impl From<McpSessionError> for ApplicationError {
    fn from(value: McpSessionError) -> Self {
        Self::Integration(value.to_string())
    }
}
