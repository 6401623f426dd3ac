use anyhow::Context;

use orgdesk_api::app::{build_app, build_services};
use orgdesk_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    orgdesk_observability::init();

    let config = AppConfig::from_env()?;
    let services = build_services(&config).await?;
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
