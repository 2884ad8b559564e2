mod bootstrap;
mod chat;
mod health;
#[cfg(test)]
mod test_support;

use std::time::Duration;

use anyhow::Result;
use axum::Router;
use taskmate_core::config::{AppConfig, LoadOptions};
use tower_http::cors::CorsLayer;

fn init_logging(config: &AppConfig) {
    use taskmate_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);

    let routes = Router::new()
        .merge(chat::router(chat::ChatState { session: app.session.clone() }))
        .merge(health::router(health::HealthState {
            session: app.session.clone(),
            tool_count: app.tool_count,
        }))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        tool_count = app.tool_count,
        "taskmate-server listening"
    );

    axum::serve(listener, routes).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "taskmate-server stopping"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, app.tool_session.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => tracing::warn!(
            event_name = "system.server.tool_session_shutdown_failed",
            correlation_id = "shutdown",
            error = %error,
            "tool session did not shut down cleanly"
        ),
        Err(_) => tracing::warn!(
            event_name = "system.server.tool_session_shutdown_timeout",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "tool session shutdown timed out"
        ),
    }

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for ctrl-c"
        );
        std::future::pending::<()>().await;
    }
}
