use anyhow::Context;

use almox_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    almox_observability::init(config.log_format);

    let services = almox_api::app::services::build_services(&config.storage)
        .await
        .context("failed to initialize storage")?;
    let app = almox_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        storage = config.storage.kind(),
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
