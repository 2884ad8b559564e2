use serde_json::{Map, Value};
use taskmate_core::domain::todo::TodoCommand;

use crate::tools::ToolSchema;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    /// The call still goes through; the tool itself reports the real failure.
    Degrade { reason_code: &'static str, detail: String },
}

/// Checks model-produced arguments against the registered schema before
/// dispatch. Every outcome is permissive: a degraded decision is logged, not
/// enforced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArgumentGuard;

impl ArgumentGuard {
    pub fn evaluate(
        &self,
        schema: Option<&ToolSchema>,
        arguments: &Map<String, Value>,
    ) -> GuardrailDecision {
        let Some(schema) = schema else {
            return GuardrailDecision::Degrade {
                reason_code: "unknown_tool",
                detail: "tool is not in the registered schema set".to_string(),
            };
        };

        let missing: Vec<&str> =
            schema.required().into_iter().filter(|key| !arguments.contains_key(*key)).collect();
        if !missing.is_empty() {
            return GuardrailDecision::Degrade {
                reason_code: "missing_required_arguments",
                detail: format!("missing: {}", missing.join(", ")),
            };
        }

        let mismatched: Vec<String> = arguments
            .iter()
            .filter_map(|(key, value)| {
                let expected = schema.property_type(key)?;
                (!matches_type(expected, value)).then(|| format!("{key} (expected {expected})"))
            })
            .collect();
        if !mismatched.is_empty() {
            return GuardrailDecision::Degrade {
                reason_code: "argument_type_mismatch",
                detail: mismatched.join(", "),
            };
        }

        let is_todo_tool = TodoCommand::TOOL_NAMES.contains(&schema.name.as_str());
        if is_todo_tool && TodoCommand::from_call(&schema.name, arguments).is_none() {
            return GuardrailDecision::Degrade {
                reason_code: "todo_arguments_undecodable",
                detail: format!("arguments do not decode as a `{}` command", schema.name),
            };
        }

        GuardrailDecision::Allow
    }
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::{ArgumentGuard, GuardrailDecision};
    use crate::tools::ToolSchema;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn add_todo_schema() -> ToolSchema {
        ToolSchema {
            name: "add_todo".to_string(),
            description: "Add a new todo".to_string(),
            parameters: object(json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "integer"},
                    "task_name": {"type": "string"},
                    "description": {"type": "string"}
                },
                "required": ["task_id", "task_name", "description"]
            })),
        }
    }

    #[test]
    fn complete_arguments_are_allowed() {
        let decision = ArgumentGuard.evaluate(
            Some(&add_todo_schema()),
            &object(json!({"task_id": 1, "task_name": "Buy milk", "description": "2%"})),
        );
        assert_eq!(decision, GuardrailDecision::Allow);
    }

    #[test]
    fn missing_required_arguments_degrade() {
        let decision = ArgumentGuard.evaluate(Some(&add_todo_schema()), &Map::new());

        let (reason_code, detail) = match decision {
            GuardrailDecision::Degrade { reason_code, detail } => (reason_code, detail),
            GuardrailDecision::Allow => ("", String::new()),
        };
        assert_eq!(reason_code, "missing_required_arguments");
        assert!(detail.contains("task_id"));
        assert!(detail.contains("description"));
    }

    #[test]
    fn type_mismatch_degrades() {
        let decision = ArgumentGuard.evaluate(
            Some(&add_todo_schema()),
            &object(json!({"task_id": "seven", "task_name": "Buy milk", "description": "2%"})),
        );
        assert!(matches!(
            decision,
            GuardrailDecision::Degrade { reason_code: "argument_type_mismatch", .. }
        ));
    }

    #[test]
    fn schema_valid_but_untyped_status_degrades() {
        let schema = ToolSchema {
            name: "update_status".to_string(),
            description: "Update status".to_string(),
            parameters: object(json!({
                "type": "object",
                "properties": {"task_id": {"type": "integer"}, "status": {"type": "string"}},
                "required": ["task_id", "status"]
            })),
        };

        let decision =
            ArgumentGuard.evaluate(Some(&schema), &object(json!({"task_id": 3, "status": "someday"})));
        assert!(matches!(
            decision,
            GuardrailDecision::Degrade { reason_code: "todo_arguments_undecodable", .. }
        ));

        let decision =
            ArgumentGuard.evaluate(Some(&schema), &object(json!({"task_id": 3, "status": "Done"})));
        assert_eq!(decision, GuardrailDecision::Allow);
    }

    #[test]
    fn unknown_tool_degrades() {
        let decision = ArgumentGuard.evaluate(None, &Map::new());
        assert!(matches!(decision, GuardrailDecision::Degrade { reason_code: "unknown_tool", .. }));
    }
}
