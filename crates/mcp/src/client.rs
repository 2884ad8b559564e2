//! Client side of the tool session: spawns the todo server as a child
//! process and speaks MCP to it over its stdio.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParam, RawContent, Tool},
    service::{Peer, RunningService},
    transport::{ConfigureCommandExt, TokioChildProcess},
    RoleClient, ServiceExt,
};
use serde_json::{Map, Value};
use taskmate_agent::{ToolContent, ToolDescriptor, ToolInvoker, ToolResult};
use taskmate_core::config::McpConfig;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::McpSessionError;

/// How to start the tool server. Script paths are run through their
/// interpreter; anything else is executed directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerLaunch {
    pub program: String,
    pub args: Vec<String>,
}

impl ServerLaunch {
    pub fn infer(command: &str, args: &[String]) -> Self {
        let interpreter = match Path::new(command).extension().and_then(|ext| ext.to_str()) {
            Some("py") => Some("python"),
            Some("js") => Some("node"),
            _ => None,
        };

        match interpreter {
            Some(interpreter) => Self {
                program: interpreter.to_string(),
                args: std::iter::once(command.to_string()).chain(args.iter().cloned()).collect(),
            },
            None => Self { program: command.to_string(), args: args.to_vec() },
        }
    }

    pub fn from_config(config: &McpConfig) -> Self {
        Self::infer(&config.command, &config.args)
    }
}

/// A live connection to the tool server. Requests go through a cloned peer
/// so the running service can be torn down from a shared reference.
pub struct McpToolSession {
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
}

impl McpToolSession {
    pub async fn connect(
        launch: &ServerLaunch,
        startup_timeout: Duration,
    ) -> Result<Self, McpSessionError> {
        info!(
            event_name = "mcp.session.connecting",
            program = %launch.program,
            args = ?launch.args,
            "starting tool server"
        );

        let transport = TokioChildProcess::new(Command::new(&launch.program).configure(|command| {
            command.args(&launch.args);
        }))
        .map_err(|source| McpSessionError::Spawn { program: launch.program.clone(), source })?;

        let service = tokio::time::timeout(startup_timeout, ().serve(transport))
            .await
            .map_err(|_| McpSessionError::StartupTimeout(startup_timeout.as_secs()))?
            .map_err(|error| McpSessionError::Handshake(error.to_string()))?;

        Ok(Self::from_service(service))
    }

    /// Wraps an already initialized client service, whatever its transport.
    pub fn from_service(service: RunningService<RoleClient, ()>) -> Self {
        info!(event_name = "mcp.session.connected", "tool session established");
        Self { peer: service.peer().clone(), service: Mutex::new(Some(service)) }
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpSessionError> {
        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(|error| McpSessionError::Request(error.to_string()))?;
        debug!(event_name = "mcp.session.tools_listed", tool_count = tools.len(), "tools listed");
        Ok(tools.into_iter().map(descriptor_from_tool).collect())
    }

    /// Cancels the session and reaps the child process. Later calls are no-ops.
    pub async fn shutdown(&self) -> Result<(), McpSessionError> {
        let Some(service) = self.service.lock().await.take() else {
            return Ok(());
        };
        service.cancel().await.map_err(|error| McpSessionError::Shutdown(error.to_string()))?;
        info!(event_name = "mcp.session.closed", "tool session closed");
        Ok(())
    }

    /// Teardown for paths that are already exiting; a failure is logged and
    /// reported as `false` instead of replacing the caller's own outcome.
    pub async fn close(&self, context: &'static str) -> bool {
        match self.shutdown().await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    event_name = "mcp.session.shutdown_failed",
                    context,
                    error = %error,
                    "tool session did not shut down cleanly"
                );
                false
            }
        }
    }
}

#[async_trait]
impl ToolInvoker for McpToolSession {
    async fn invoke(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolResult> {
        let result = self
            .peer
            .call_tool(CallToolRequestParam { name: name.to_string().into(), arguments: Some(arguments) })
            .await
            .map_err(|error| McpSessionError::Request(error.to_string()))?;

        Ok(ToolResult {
            parts: result
                .content
                .iter()
                .map(|part| match &part.raw {
                    RawContent::Text(text) => ToolContent::text(text.text.clone()),
                    _ => ToolContent::non_text(),
                })
                .collect(),
            is_error: result.is_error.unwrap_or(false),
        })
    }
}

fn descriptor_from_tool(tool: Tool) -> ToolDescriptor {
    ToolDescriptor {
        name: tool.name.to_string(),
        description: tool.description.as_deref().unwrap_or_default().to_string(),
        parameter_schema: Some(tool.input_schema.as_ref().clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::ServerLaunch;

    #[test]
    fn python_scripts_run_through_the_interpreter() {
        let launch = ServerLaunch::infer("mcp-server/server.py", &["--verbose".to_string()]);
        assert_eq!(launch.program, "python");
        assert_eq!(launch.args, vec!["mcp-server/server.py", "--verbose"]);
    }

    #[test]
    fn node_scripts_run_through_node() {
        let launch = ServerLaunch::infer("server.js", &[]);
        assert_eq!(launch.program, "node");
        assert_eq!(launch.args, vec!["server.js"]);
    }

    #[test]
    fn binaries_are_executed_directly() {
        let launch = ServerLaunch::infer("taskmate-mcp", &["--log-level".to_string(), "debug".to_string()]);
        assert_eq!(launch, ServerLaunch {
            program: "taskmate-mcp".to_string(),
            args: vec!["--log-level".to_string(), "debug".to_string()],
        });
    }
}
