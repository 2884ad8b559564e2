use std::sync::Arc;
use std::time::Duration;

use taskmate_agent::{AgentError, AgentRuntime, CompletionError, OpenAiChatCompleter, SessionHandle};
use taskmate_core::config::{AppConfig, ConfigError};
use taskmate_mcp::{McpSessionError, McpToolSession, ServerLaunch};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub tool_session: Arc<McpToolSession>,
    pub session: SessionHandle,
    pub tool_count: usize,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("model client setup failed: {0}")]
    Completer(#[from] CompletionError),
    #[error("tool session setup failed: {0}")]
    ToolSession(#[from] McpSessionError),
    #[error("tool registration failed: {0}")]
    Tools(#[from] AgentError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        "starting application bootstrap"
    );

    let completer = OpenAiChatCompleter::from_config(&config.llm)?;
    let launch = ServerLaunch::from_config(&config.mcp);
    let tool_session = Arc::new(
        McpToolSession::connect(&launch, Duration::from_secs(config.mcp.startup_timeout_secs))
            .await?,
    );

    let descriptors = match tool_session.list_tools().await {
        Ok(descriptors) => descriptors,
        Err(error) => {
            tool_session.close("bootstrap.list_tools").await;
            return Err(error.into());
        }
    };

    let mut runtime = AgentRuntime::new(Arc::new(completer), tool_session.clone());
    if let Err(error) = runtime.load_tools(&descriptors) {
        tool_session.close("bootstrap.load_tools").await;
        return Err(error.into());
    }

    let tool_count = runtime.tool_schemas().len();
    if tool_count == 0 {
        warn!(
            event_name = "system.bootstrap.no_tools",
            correlation_id = "bootstrap",
            "tool server declared no tools; chat requests will fail until it does"
        );
    }

    info!(
        event_name = "system.bootstrap.tools_loaded",
        correlation_id = "bootstrap",
        tool_count,
        "tool session ready"
    );

    Ok(Application { config, tool_session, session: SessionHandle::spawn(runtime), tool_count })
}
