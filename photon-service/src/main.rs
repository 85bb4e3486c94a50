use anyhow::Result;
use photon_configuration::{load_config, setup_logging};
use photon_setup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    setup_logging(&config.logging);
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "starting photon service"
    );
    let app = Application::new(config).await?;
    app.run().await?;
    Ok(())
}
