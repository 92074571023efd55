//! `codetutor gateway` — Start the HTTP backend server.

use codetutor_config::AppConfig;
use tracing::info;

pub async fn run(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load()?;
    config.validate()?;

    if let Some(port) = port {
        config.gateway.port = port;
    }

    info!(
        host = %config.gateway.host,
        port = config.gateway.port,
        store = %config.store.backend,
        "Starting codetutor gateway"
    );

    codetutor_gateway::start(config).await
}
