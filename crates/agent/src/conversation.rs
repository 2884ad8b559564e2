use std::sync::OnceLock;

use regex::Regex;
use taskmate_core::domain::todo::{TaskId, TodoCommand};
use tracing::debug;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub task_id: Option<TaskId>,
    pub task_name: Option<String>,
    pub description: Option<String>,
}

impl ExtractedFields {
    /// Only a fully populated extraction becomes a task-creation command.
    pub fn into_add_command(self) -> Option<TodoCommand> {
        match self {
            Self { task_id: Some(task_id), task_name: Some(task_name), description: Some(description) } => {
                Some(TodoCommand::AddTodo { task_id, task_name, description })
            }
            _ => None,
        }
    }
}

/// Model-independent scan for `task id`, `task name` and `description`
/// markers. Each field is found on its own; a missing marker leaves the field
/// empty.
#[derive(Clone, Debug, Default)]
pub struct TaskFieldExtractor;

impl TaskFieldExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str) -> ExtractedFields {
        ExtractedFields {
            task_id: extract_task_id(text),
            task_name: capture_trimmed(task_name_pattern(), text),
            description: capture_trimmed(description_pattern(), text),
        }
    }
}

fn task_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| compile(r"(?i)task ?id[:\s]*(\d+)"))
}

fn task_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| compile(r"(?i)task ?name[:\s]*([^\n,]+)"))
}

fn description_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| compile(r"(?is)description[:\s]*(.+)"))
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|error| panic!("invalid extractor pattern {pattern}: {error}"))
}

fn extract_task_id(text: &str) -> Option<TaskId> {
    let digits = task_id_pattern().captures(text)?.get(1)?.as_str();
    match digits.parse::<i64>() {
        Ok(value) => Some(TaskId(value)),
        Err(error) => {
            debug!(
                event_name = "agent.extract.task_id_out_of_range",
                digits,
                error = %error,
                "task id digits do not fit a task id; leaving it absent"
            );
            None
        }
    }
}

fn capture_trimmed(pattern: &Regex, text: &str) -> Option<String> {
    let value = pattern.captures(text)?.get(1)?.as_str().trim();
    (!value.is_empty()).then(|| value.to_string())
}
