use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::todo::{TaskId, Todo, TodoCommand, TodoStatus};
use crate::errors::{ApplicationError, DomainError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read todo file `{path}`: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write todo file `{path}`: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("todo file `{path}` does not hold a todo list: {source}")]
    Decode { path: PathBuf, source: serde_json::Error },
    #[error("could not encode todos: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Domain(error) => Self::Domain(error),
            other => Self::Persistence(other.to_string()),
        }
    }
}

/// Flat JSON-file todo list. Every operation reloads the file, so edits made
/// by other processes between calls are picked up.
#[derive(Clone, Debug)]
pub struct TodoStore {
    path: PathBuf,
}

impl TodoStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file or one that is not JSON at all reads as an empty list.
    /// Well-formed JSON that does not decode as todos is an error, so a later
    /// save cannot overwrite entries this build does not understand.
    pub fn load(&self) -> Result<Vec<Todo>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Read { path: self.path.clone(), source }),
        };

        let Ok(document) = serde_json::from_str::<Value>(&raw) else {
            return Ok(Vec::new());
        };
        serde_json::from_value(document)
            .map_err(|source| StoreError::Decode { path: self.path.clone(), source })
    }

    fn save(&self, todos: &[Todo]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| StoreError::Write { path: self.path.clone(), source })?;
        }
        let encoded = serde_json::to_string_pretty(todos)?;
        fs::write(&self.path, encoded)
            .map_err(|source| StoreError::Write { path: self.path.clone(), source })
    }

    pub fn add(&self, todo: Todo) -> Result<Todo, StoreError> {
        let mut todos = self.load()?;
        todos.push(todo.clone());
        self.save(&todos)?;
        Ok(todo)
    }

    /// Removes every entry carrying `task_id`; deleting an unknown id is not an error.
    pub fn delete(&self, task_id: TaskId) -> Result<TaskId, StoreError> {
        let mut todos = self.load()?;
        todos.retain(|todo| todo.task_id != task_id);
        self.save(&todos)?;
        Ok(task_id)
    }

    pub fn update(
        &self,
        task_id: TaskId,
        task_name: String,
        description: String,
    ) -> Result<Todo, StoreError> {
        self.modify(task_id, |todo| {
            todo.task_name = task_name;
            todo.description = description;
        })
    }

    pub fn update_status(&self, task_id: TaskId, status: TodoStatus) -> Result<Todo, StoreError> {
        self.modify(task_id, |todo| todo.status = status)
    }

    pub fn get(&self, task_id: TaskId) -> Result<Todo, StoreError> {
        self.load()?
            .into_iter()
            .find(|todo| todo.task_id == task_id)
            .ok_or(StoreError::Domain(DomainError::TodoNotFound(task_id)))
    }

    pub fn list(&self) -> Result<Vec<Todo>, StoreError> {
        self.load()
    }

    /// Runs a command and returns the JSON payload a tool caller sees.
    pub fn apply(&self, command: TodoCommand) -> Result<Value, StoreError> {
        let payload = match command {
            TodoCommand::AddTodo { task_id, task_name, description } => {
                serde_json::to_value(self.add(Todo::new(task_id, task_name, description))?)?
            }
            TodoCommand::DeleteTodo { task_id } => {
                json!({ "deleted_id": self.delete(task_id)?.0 })
            }
            TodoCommand::UpdateTodo { task_id, task_name, description } => {
                serde_json::to_value(self.update(task_id, task_name, description)?)?
            }
            TodoCommand::UpdateStatus { task_id, status } => {
                serde_json::to_value(self.update_status(task_id, status)?)?
            }
            TodoCommand::GetTodo { task_id } => serde_json::to_value(self.get(task_id)?)?,
            TodoCommand::GetTodos {} => serde_json::to_value(self.list()?)?,
        };
        Ok(payload)
    }

    fn modify(
        &self,
        task_id: TaskId,
        change: impl FnOnce(&mut Todo),
    ) -> Result<Todo, StoreError> {
        let mut todos = self.load()?;
        let todo = todos
            .iter_mut()
            .find(|todo| todo.task_id == task_id)
            .ok_or(StoreError::Domain(DomainError::TodoNotFound(task_id)))?;
        change(todo);
        let updated = todo.clone();
        self.save(&todos)?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::TempDir;

    use super::{StoreError, TodoStore};
    use crate::domain::todo::{TaskId, Todo, TodoCommand, TodoStatus};
    use crate::errors::DomainError;

    fn store() -> Result<(TempDir, TodoStore), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        let store = TodoStore::open(dir.path().join("todos.json"));
        Ok((dir, store))
    }

    #[test]
    fn missing_and_corrupt_files_read_as_empty() -> Result<(), String> {
        let (_dir, store) = store()?;
        assert!(store.list().map_err(|err| err.to_string())?.is_empty());

        fs::write(store.path(), "{not json").map_err(|err| err.to_string())?;
        assert!(store.list().map_err(|err| err.to_string())?.is_empty());
        Ok(())
    }

    #[test]
    fn unreadable_entries_block_writes_instead_of_truncating() -> Result<(), String> {
        let (_dir, store) = store()?;
        let original = r#"[
            {"task_id": 1, "task_name": "keep", "description": "me", "status": "pending"},
            {"task_id": 2, "task_name": "odd", "description": "status", "status": "blocked"}
        ]"#;
        fs::write(store.path(), original).map_err(|err| err.to_string())?;

        assert!(matches!(store.list(), Err(StoreError::Decode { .. })));
        let added = store.add(Todo::new(TaskId(3), "new", "one"));
        assert!(matches!(added, Err(StoreError::Decode { .. })));

        let on_disk = fs::read_to_string(store.path()).map_err(|err| err.to_string())?;
        assert_eq!(on_disk, original);
        Ok(())
    }

    #[test]
    fn add_appends_and_allows_duplicate_ids() -> Result<(), String> {
        let (_dir, store) = store()?;
        store.add(Todo::new(TaskId(1), "Buy milk", "2% low fat")).map_err(|err| err.to_string())?;
        store.add(Todo::new(TaskId(1), "Buy milk", "2% low fat")).map_err(|err| err.to_string())?;

        let todos = store.list().map_err(|err| err.to_string())?;
        assert_eq!(todos.len(), 2);
        assert!(todos.iter().all(|todo| todo.status == TodoStatus::Pending));
        Ok(())
    }

    #[test]
    fn update_and_status_change_touch_first_match() -> Result<(), String> {
        let (_dir, store) = store()?;
        store.add(Todo::new(TaskId(4), "Draft", "outline")).map_err(|err| err.to_string())?;

        let updated = store
            .update(TaskId(4), "Final".to_string(), "ship it".to_string())
            .map_err(|err| err.to_string())?;
        assert_eq!(updated.task_name, "Final");

        let done = store.update_status(TaskId(4), TodoStatus::Done).map_err(|err| err.to_string())?;
        assert_eq!(done.status, TodoStatus::Done);
        assert_eq!(done.description, "ship it");

        let reloaded = store.get(TaskId(4)).map_err(|err| err.to_string())?;
        assert_eq!(reloaded, done);
        Ok(())
    }

    #[test]
    fn unknown_ids_fail_with_not_found_except_delete() -> Result<(), String> {
        let (_dir, store) = store()?;

        let missing = store.get(TaskId(99));
        assert!(matches!(missing, Err(StoreError::Domain(DomainError::TodoNotFound(TaskId(99))))));

        let status = store.update_status(TaskId(99), TodoStatus::Done);
        assert!(matches!(status, Err(StoreError::Domain(DomainError::TodoNotFound(_)))));

        assert_eq!(store.delete(TaskId(99)).map_err(|err| err.to_string())?, TaskId(99));
        Ok(())
    }

    #[test]
    fn apply_returns_tool_payloads() -> Result<(), String> {
        let (_dir, store) = store()?;

        let added = store
            .apply(TodoCommand::AddTodo {
                task_id: TaskId(7),
                task_name: "Buy milk".to_string(),
                description: "2% low fat".to_string(),
            })
            .map_err(|err| err.to_string())?;
        assert_eq!(added["status"], "pending");

        let listed = store.apply(TodoCommand::GetTodos {}).map_err(|err| err.to_string())?;
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let deleted = store
            .apply(TodoCommand::DeleteTodo { task_id: TaskId(7) })
            .map_err(|err| err.to_string())?;
        assert_eq!(deleted, json!({"deleted_id": 7}));
        assert!(store.list().map_err(|err| err.to_string())?.is_empty());
        Ok(())
    }
}
