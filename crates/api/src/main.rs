use anyhow::Context;

use stockflow_infra::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    stockflow_observability::init(&settings.log);

    let app = stockflow_api::app::build_app(&settings.concurrency).context("failed to build services")?;

    let addr = settings.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        environment = %settings.environment,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
