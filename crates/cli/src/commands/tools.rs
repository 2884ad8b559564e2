use taskmate_agent::{ToolSchema, ToolSchemaAdapter};
use taskmate_core::config::{AppConfig, LoadOptions};

use super::{block_on, connect_tool_session, CommandResult, EXIT_CONFIG, EXIT_RUNTIME, EXIT_TOOL_SESSION};

pub fn run(json_output: bool) -> CommandResult {
    let options = LoadOptions { skip_llm_validation: true, ..LoadOptions::default() };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("tools", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };

    let schemas = match block_on(load_schemas(&config)) {
        Ok(Ok(schemas)) => schemas,
        Ok(Err(message)) => {
            return CommandResult::failure("tools", "tool_session", message, EXIT_TOOL_SESSION)
        }
        Err(error) => {
            return CommandResult::failure(
                "tools",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            )
        }
    };

    CommandResult { exit_code: 0, output: render(&schemas, json_output) }
}

async fn load_schemas(config: &AppConfig) -> Result<Vec<ToolSchema>, String> {
    let session = connect_tool_session(config).await.map_err(|error| error.to_string())?;
    let listed = session.list_tools().await.map_err(|error| error.to_string());
    session.close("tools").await;

    ToolSchemaAdapter::convert(&listed?).map_err(|error| error.to_string())
}

pub fn render(schemas: &[ToolSchema], json_output: bool) -> String {
    if json_output {
        return serde_json::to_string_pretty(schemas).unwrap_or_else(|error| {
            format!("{{\"status\":\"error\",\"message\":\"{}\"}}", error.to_string().replace('"', "'"))
        });
    }

    let mut lines = vec![format!("{} tools registered:", schemas.len())];
    for schema in schemas {
        let required = schema.required();
        let required =
            if required.is_empty() { "none".to_string() } else { required.join(", ") };
        lines.push(format!("- {}: {} (required: {required})", schema.name, schema.description));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use taskmate_agent::{ToolDescriptor, ToolSchemaAdapter};

    use super::render;

    fn schemas() -> Vec<taskmate_agent::ToolSchema> {
        let add = match json!({
            "type": "object",
            "properties": {"task_id": {"type": "integer"}},
            "required": ["task_id", "task_name"]
        }) {
            Value::Object(map) => Some(map),
            _ => None,
        };
        ToolSchemaAdapter::convert(&[
            ToolDescriptor {
                name: "add_todo".to_string(),
                description: "Add a new todo".to_string(),
                parameter_schema: add,
            },
            ToolDescriptor {
                name: "get_todos".to_string(),
                description: "List every todo".to_string(),
                parameter_schema: None,
            },
        ])
        .unwrap_or_default()
    }

    #[test]
    fn human_output_lists_required_arguments() {
        let output = render(&schemas(), false);

        assert!(output.starts_with("2 tools registered:"));
        assert!(output.contains("- add_todo: Add a new todo (required: task_id, task_name)"));
        assert!(output.contains("- get_todos: List every todo (required: none)"));
    }

    #[test]
    fn json_output_is_the_model_facing_schema_list() {
        let output = render(&schemas(), true);
        let parsed: Value = serde_json::from_str(&output).unwrap_or(Value::Null);

        assert_eq!(parsed[1]["name"], "get_todos");
        assert_eq!(parsed[1]["parameters"]["required"], json!([]));
    }
}
