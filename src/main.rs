//! Binary entry point that loads configuration and serves the chat proxy
//! the ESP32 talks to.

use anyhow::{Context, Result};
use tracing::info;

use voicebridge::config::{mask_secret, ProxyConfig};
use voicebridge::proxy;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ProxyConfig::load()?;
    info!("starting chat proxy");
    info!("upstream: {}", config.api_url);
    info!("api key:  {}", mask_secret(&config.api_key));
    info!("routes:   POST /chat, GET /health, GET /test");
    info!("listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    axum::serve(listener, proxy::router(config))
        .await
        .context("Proxy server terminated")?;
    Ok(())
}
