use tracing::info;

use emojichat_client::{app, init_tracing, ClientConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting emojichat v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    app::run(config).await?;
    Ok(())
}
