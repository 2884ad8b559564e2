//! End-to-end checks of the todo server through the client session, wired
//! together over an in-memory duplex stream.

use rmcp::ServiceExt;
use serde_json::{json, Map, Value};
use taskmate_agent::{ToolInvoker, ToolSchemaAdapter};
use taskmate_core::store::TodoStore;
use taskmate_mcp::{McpToolSession, TodoMcpServer};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

async fn connected(dir: &TempDir) -> Result<McpToolSession, Box<dyn std::error::Error>> {
    let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);
    let server = TodoMcpServer::new(TodoStore::open(dir.path().join("todos.json")));

    tokio::spawn(async move {
        if let Ok(service) = server.serve(server_stream).await {
            let _ = service.waiting().await;
        }
    });

    let client = ().serve(client_stream).await?;
    Ok(McpToolSession::from_service(client))
}

fn arguments(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[tokio::test]
async fn listed_tools_convert_into_model_schemas() -> TestResult {
    let dir = tempfile::tempdir()?;
    let session = connected(&dir).await?;

    let descriptors = session.list_tools().await?;
    let schemas = ToolSchemaAdapter::convert(&descriptors)?;

    assert_eq!(schemas.len(), 6);
    let add = schemas
        .iter()
        .find(|schema| schema.name == "add_todo")
        .ok_or("add_todo should be listed")?;
    let mut required = add.required();
    required.sort_unstable();
    assert_eq!(required, vec!["description", "task_id", "task_name"]);
    assert_eq!(add.property_type("task_id"), Some("integer"));

    let get_todos = schemas
        .iter()
        .find(|schema| schema.name == "get_todos")
        .ok_or("get_todos should be listed")?;
    assert!(get_todos.parameters.get("required").is_some_and(Value::is_array));

    session.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn invoked_tools_persist_to_the_todo_file() -> TestResult {
    let dir = tempfile::tempdir()?;
    let session = connected(&dir).await?;

    let added = session
        .invoke(
            "add_todo",
            arguments(json!({"task_id": 7, "task_name": "Buy milk", "description": "2% low fat"})),
        )
        .await?;
    assert!(!added.is_error);

    let listed = session.invoke("get_todos", Map::new()).await?;
    let todos: Value = serde_json::from_str(&listed.text())?;
    assert_eq!(todos[0]["task_name"], "Buy milk");

    let on_disk = std::fs::read_to_string(dir.path().join("todos.json"))?;
    assert!(on_disk.contains("\"task_id\": 7"));

    session.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn missing_task_comes_back_as_tool_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let session = connected(&dir).await?;

    let result = session.invoke("get_todo", arguments(json!({"task_id": 99}))).await?;

    assert!(result.is_error);
    assert!(result.text().contains("99"));
    session.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn shutdown_twice_is_harmless() -> TestResult {
    let dir = tempfile::tempdir()?;
    let session = connected(&dir).await?;

    session.shutdown().await?;
    session.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn close_reports_clean_teardown() -> TestResult {
    let dir = tempfile::tempdir()?;
    let session = connected(&dir).await?;

    assert!(session.close("test").await);
    assert!(session.close("test").await, "closing an already closed session stays clean");
    Ok(())
}
