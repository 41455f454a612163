use auth0_web_host::{server::start_server, Auth0Config, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth0_web_host=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let auth0_config = Auth0Config::from_env()?;
    let server_config = ServerConfig::from_env()?;

    tracing::info!(?auth0_config, ?server_config, "configuration loaded");

    start_server(auth0_config, server_config).await?;

    Ok(())
}
