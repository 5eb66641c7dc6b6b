use std::sync::Arc;

use anyhow::Context;
use galley_infra::config::{AppConfig, LogFormat};
use galley_observability::LogSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    galley_observability::tracing::init(&LogSettings {
        default_filter: config.log.filter.clone(),
        format: match config.log.format {
            LogFormat::Json => galley_observability::LogFormat::Json,
            LogFormat::Pretty => galley_observability::LogFormat::Pretty,
        },
    });

    let services = galley_api::app::services::build_services(&config)
        .await
        .context("failed to initialize services")?;
    let app = galley_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(&config.http.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
