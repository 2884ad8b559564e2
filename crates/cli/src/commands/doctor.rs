use serde::Serialize;
use taskmate_agent::ToolSchemaAdapter;
use taskmate_core::config::{AppConfig, LoadOptions};

use super::{block_on, connect_tool_session};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: format!(
                    "configuration loaded and validated (provider {}, model {})",
                    config.llm.provider.as_str(),
                    config.llm.model
                ),
            });
            checks.extend(check_tool_session(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["tool_server_connectivity", "tool_catalog"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_tool_session(config: &AppConfig) -> Vec<DoctorCheck> {
    let outcome = block_on(async {
        let session = connect_tool_session(config).await.map_err(|error| error.to_string())?;
        let listed = session.list_tools().await;
        session.close("doctor").await;
        Ok::<_, String>(listed)
    });

    let listed = match outcome {
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "tool_server_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                skipped_catalog(),
            ]
        }
        Ok(Err(error)) => {
            return vec![
                DoctorCheck { name: "tool_server_connectivity", status: CheckStatus::Fail, details: error },
                skipped_catalog(),
            ]
        }
        Ok(Ok(listed)) => listed,
    };

    let connectivity = DoctorCheck {
        name: "tool_server_connectivity",
        status: CheckStatus::Pass,
        details: format!("connected to `{}`", config.mcp.command),
    };

    let catalog = match listed.map_err(|error| error.to_string()).and_then(|descriptors| {
        ToolSchemaAdapter::convert(&descriptors).map_err(|error| error.to_string())
    }) {
        Ok(schemas) if schemas.is_empty() => DoctorCheck {
            name: "tool_catalog",
            status: CheckStatus::Fail,
            details: "tool server declared no tools".to_string(),
        },
        Ok(schemas) => DoctorCheck {
            name: "tool_catalog",
            status: CheckStatus::Pass,
            details: format!(
                "{} tools: {}",
                schemas.len(),
                schemas.iter().map(|schema| schema.name.as_str()).collect::<Vec<_>>().join(", ")
            ),
        },
        Err(error) => DoctorCheck { name: "tool_catalog", status: CheckStatus::Fail, details: error },
    };

    vec![connectivity, catalog]
}

fn skipped_catalog() -> DoctorCheck {
    DoctorCheck {
        name: "tool_catalog",
        status: CheckStatus::Skipped,
        details: "skipped because the tool server is unreachable".to_string(),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
