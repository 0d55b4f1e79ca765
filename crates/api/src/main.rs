use std::sync::Arc;

use crm_infra::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    crm_observability::init();

    let config = ApiConfig::from_env()?;
    tracing::info!(?config, "configuration loaded");

    let services = Arc::new(crm_api::app::services::build_services(&config).await?);
    let app = crm_api::app::build_app(services, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
