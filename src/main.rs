use calfeed::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting calfeed");

    // Load configuration
    let config = startup::load_config()?;

    // Serve the API
    startup::start_server(config).await
}
