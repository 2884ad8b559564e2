use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "pending" | "todo" => Ok(Self::Pending),
            "in_progress" | "started" => Ok(Self::InProgress),
            "done" | "completed" | "complete" => Ok(Self::Done),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for TodoStatus {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub task_id: TaskId,
    pub task_name: String,
    pub description: String,
    #[serde(default)]
    pub status: TodoStatus,
}

impl Todo {
    pub fn new(task_id: TaskId, task_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            task_id,
            task_name: task_name.into(),
            description: description.into(),
            status: TodoStatus::Pending,
        }
    }
}

/// Typed form of a todo tool invocation, keyed by the tool name the model sees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum TodoCommand {
    AddTodo { task_id: TaskId, task_name: String, description: String },
    DeleteTodo { task_id: TaskId },
    UpdateTodo { task_id: TaskId, task_name: String, description: String },
    UpdateStatus { task_id: TaskId, status: TodoStatus },
    GetTodo { task_id: TaskId },
    GetTodos {},
}

impl TodoCommand {
    pub const TOOL_NAMES: [&'static str; 6] =
        ["add_todo", "delete_todo", "update_todo", "update_status", "get_todo", "get_todos"];

    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::AddTodo { .. } => "add_todo",
            Self::DeleteTodo { .. } => "delete_todo",
            Self::UpdateTodo { .. } => "update_todo",
            Self::UpdateStatus { .. } => "update_status",
            Self::GetTodo { .. } => "get_todo",
            Self::GetTodos {} => "get_todos",
        }
    }

    /// Returns `None` when the name is not a todo tool or the arguments do not fit it.
    pub fn from_call(name: &str, arguments: &Map<String, Value>) -> Option<Self> {
        if !Self::TOOL_NAMES.contains(&name) {
            return None;
        }
        serde_json::from_value(json!({ "name": name, "arguments": arguments })).ok()
    }

    pub fn to_arguments(&self) -> Map<String, Value> {
        let value = match self {
            Self::AddTodo { task_id, task_name, description }
            | Self::UpdateTodo { task_id, task_name, description } => json!({
                "task_id": task_id.0,
                "task_name": task_name,
                "description": description,
            }),
            Self::UpdateStatus { task_id, status } => {
                json!({ "task_id": task_id.0, "status": status.as_str() })
            }
            Self::DeleteTodo { task_id } | Self::GetTodo { task_id } => {
                json!({ "task_id": task_id.0 })
            }
            Self::GetTodos {} => json!({}),
        };

        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}
