use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use taskmate_cli::commands::{config, doctor, tools};

#[test]
fn config_reports_env_sources_and_defaults() {
    with_env(
        &[("TASKMATE_LLM_PROVIDER", "ollama"), ("TASKMATE_LLM_MODEL", "llama3.1")],
        || {
            let output = config::run();

            assert!(output.starts_with("effective config"));
            assert!(output.contains("- llm.provider = ollama (source: env (TASKMATE_LLM_PROVIDER))"));
            assert!(output.contains("- llm.model = llama3.1 (source: env (TASKMATE_LLM_MODEL))"));
            assert!(output.contains("- llm.base_url = http://localhost:11434/v1 (source: default)"));
            assert!(output.contains("- llm.api_key = <unset> (source: default)"));
            assert!(output.contains("- server.port = 8000 (source: default)"));
        },
    );
}

#[test]
fn config_never_prints_the_api_key() {
    with_env(&[("GROQ_API_KEY", "gsk_live_supersecret")], || {
        let output = config::run();

        assert!(!output.contains("supersecret"));
        assert!(output.contains("- llm.api_key = gsk-*** (source: env (GROQ_API_KEY))"));
    });
}

#[test]
fn config_surfaces_validation_failures() {
    with_env(&[("TASKMATE_LLM_PROVIDER", "groq")], || {
        let output = config::run();

        assert!(output.starts_with("config validation failed"));
        assert!(output.contains("llm.api_key"));
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[("TASKMATE_LLM_PROVIDER", "openai")], || {
        let payload = parse_payload(&doctor::run(true));

        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][0]["name"], "config_validation");
        assert_eq!(payload["checks"][0]["status"], "fail");
        assert_eq!(payload["checks"][1]["status"], "skipped");
        assert_eq!(payload["checks"][2]["status"], "skipped");
    });
}

#[test]
fn doctor_reports_unreachable_tool_server() {
    with_env(
        &[
            ("TASKMATE_LLM_PROVIDER", "ollama"),
            ("TASKMATE_MCP_COMMAND", "taskmate-test-missing-server"),
        ],
        || {
            let payload = parse_payload(&doctor::run(true));

            assert_eq!(payload["overall_status"], "fail");
            assert_eq!(payload["checks"][0]["status"], "pass");
            assert_eq!(payload["checks"][1]["name"], "tool_server_connectivity");
            assert_eq!(payload["checks"][1]["status"], "fail");
            assert_eq!(payload["checks"][2]["status"], "skipped");
        },
    );
}

#[test]
fn doctor_human_output_marks_each_check() {
    with_env(&[("TASKMATE_LLM_PROVIDER", "groq")], || {
        let output = doctor::run(false);

        assert!(output.starts_with("doctor: one or more readiness checks failed"));
        assert!(output.contains("- [fail] config_validation:"));
        assert!(output.contains("- [skip] tool_catalog:"));
    });
}

#[test]
fn tools_returns_tool_session_failure_when_server_is_missing() {
    with_env(&[("TASKMATE_MCP_COMMAND", "taskmate-test-missing-server")], || {
        let result = tools::run(false);
        assert_eq!(result.exit_code, 3, "expected tool session failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "tools");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "tool_session");
    });
}

#[test]
fn tools_returns_config_failure_for_bad_log_format() {
    with_env(&[("TASKMATE_LOGGING_FORMAT", "xml")], || {
        let result = tools::run(true);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TASKMATE_LLM_PROVIDER",
        "TASKMATE_LLM_API_KEY",
        "GROQ_API_KEY",
        "TASKMATE_LLM_BASE_URL",
        "TASKMATE_LLM_MODEL",
        "TASKMATE_LLM_TIMEOUT_SECS",
        "TASKMATE_MCP_COMMAND",
        "TASKMATE_MCP_ARGS",
        "TASKMATE_MCP_STARTUP_TIMEOUT_SECS",
        "TASKMATE_STORAGE_TODO_FILE",
        "TASKMATE_SERVER_BIND_ADDRESS",
        "TASKMATE_SERVER_PORT",
        "TASKMATE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "TASKMATE_LOGGING_LEVEL",
        "TASKMATE_LOGGING_FORMAT",
        "TASKMATE_LOG_LEVEL",
        "TASKMATE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
