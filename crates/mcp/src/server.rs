//! MCP Server Implementation
//!
//! Exposes the todo file as six MCP tools over stdio.

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router, ErrorData, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use taskmate_core::domain::todo::{TaskId, TodoCommand, TodoStatus};
use taskmate_core::store::{StoreError, TodoStore};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TaskFieldsInput {
    #[schemars(description = "Numeric task identifier")]
    pub task_id: i64,
    #[schemars(description = "Short task title")]
    pub task_name: String,
    #[schemars(description = "Free-text task details")]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TaskIdInput {
    #[schemars(description = "Numeric task identifier")]
    pub task_id: i64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusInput {
    #[schemars(description = "Numeric task identifier")]
    pub task_id: i64,
    #[schemars(description = "One of pending, in_progress, done")]
    pub status: String,
}

/// Todo tool server. Commands are serialized through one lock so each
/// read-modify-write of the file is atomic with respect to other calls.
#[derive(Clone)]
pub struct TodoMcpServer {
    store: Arc<Mutex<TodoStore>>,
    tool_router: ToolRouter<TodoMcpServer>,
}

impl TodoMcpServer {
    pub fn new(store: TodoStore) -> Self {
        info!(
            event_name = "mcp.server.init",
            todo_file = %store.path().display(),
            "initializing todo tool server"
        );
        Self { store: Arc::new(Mutex::new(store)), tool_router: Self::tool_router() }
    }

    /// Run the server with stdio transport
    pub async fn run_stdio(self) -> anyhow::Result<()> {
        info!(event_name = "mcp.server.start", "starting MCP server with stdio transport");

        let service = self.serve(rmcp::transport::stdio()).await?;
        service.waiting().await?;

        info!(event_name = "mcp.server.stopped", "MCP server shutdown complete");
        Ok(())
    }

    async fn execute(&self, command: TodoCommand) -> Result<CallToolResult, ErrorData> {
        let tool = command.tool_name();
        debug!(event_name = "mcp.tool.called", tool, "tool called");

        let outcome = self.store.lock().await.apply(command);
        match outcome {
            Ok(payload) => {
                let content = serde_json::to_string_pretty(&payload)
                    .map_err(|error| ErrorData::internal_error(error.to_string(), None))?;
                Ok(CallToolResult::success(vec![Content::text(content)]))
            }
            Err(StoreError::Domain(error)) => {
                warn!(event_name = "mcp.tool.rejected", tool, error = %error, "tool call rejected");
                Ok(CallToolResult::error(vec![Content::text(error.to_string())]))
            }
            Err(error @ StoreError::Decode { .. }) => {
                warn!(
                    event_name = "mcp.store.undecodable",
                    tool,
                    error = %error,
                    "todo file left untouched"
                );
                Ok(CallToolResult::error(vec![Content::text(error.to_string())]))
            }
            Err(error) => Err(ErrorData::internal_error(error.to_string(), None)),
        }
    }
}

#[tool_router]
impl TodoMcpServer {
    #[tool(description = "Add a new todo with an id, a name and a description")]
    async fn add_todo(
        &self,
        Parameters(input): Parameters<TaskFieldsInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.execute(TodoCommand::AddTodo {
            task_id: TaskId(input.task_id),
            task_name: input.task_name,
            description: input.description,
        })
        .await
    }

    #[tool(description = "Delete the todo with the given id")]
    async fn delete_todo(
        &self,
        Parameters(input): Parameters<TaskIdInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.execute(TodoCommand::DeleteTodo { task_id: TaskId(input.task_id) }).await
    }

    #[tool(description = "Replace the name and description of an existing todo")]
    async fn update_todo(
        &self,
        Parameters(input): Parameters<TaskFieldsInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.execute(TodoCommand::UpdateTodo {
            task_id: TaskId(input.task_id),
            task_name: input.task_name,
            description: input.description,
        })
        .await
    }

    #[tool(description = "Set the status of a todo (pending, in_progress or done)")]
    async fn update_status(
        &self,
        Parameters(input): Parameters<StatusInput>,
    ) -> Result<CallToolResult, ErrorData> {
        let status = match input.status.parse::<TodoStatus>() {
            Ok(status) => status,
            Err(error) => return Ok(CallToolResult::error(vec![Content::text(error.to_string())])),
        };
        self.execute(TodoCommand::UpdateStatus { task_id: TaskId(input.task_id), status }).await
    }

    #[tool(description = "Get a single todo by id")]
    async fn get_todo(
        &self,
        Parameters(input): Parameters<TaskIdInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.execute(TodoCommand::GetTodo { task_id: TaskId(input.task_id) }).await
    }

    #[tool(description = "List every todo")]
    async fn get_todos(&self) -> Result<CallToolResult, ErrorData> {
        self.execute(TodoCommand::GetTodos {}).await
    }
}

#[tool_handler]
impl ServerHandler for TodoMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Taskmate todo server. Add, update, inspect and delete tasks by numeric id."
                    .to_string(),
            ),
        }
    }
}
