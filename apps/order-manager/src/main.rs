//! Order Manager server.
//!
//! ```bash
//! # Run next to a Dapr sidecar
//! dapr run --app-id order-manager --app-port 50001 --dapr-http-port 3500 \
//!     -- cargo run --bin order-manager
//! ```

use anyhow::Context;
use order_manager::{Application, Config, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::load().context("failed to load configuration")?;
    telemetry::init_tracing(&config.log.level).context("failed to initialize tracing")?;

    tracing::info!(
        http_port = config.http.port,
        dapr_port = config.dapr.port,
        dapr_endpoint = %config.dapr.http_endpoint,
        pubsub = %config.pubsub.name,
        topic = %config.pubsub.topic,
        statestore = %config.statestore.name,
        "Starting order manager"
    );

    let app = Application::build(config).await?;
    app.run().await
}
