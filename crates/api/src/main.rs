use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();
    backoffice_observability::init();

    let config = backoffice_api::Config::from_env().context("invalid configuration")?;
    let state = backoffice_api::AppState::from_config(&config)?;
    let app = backoffice_api::build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, auth_base = %config.auth_base_url, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
