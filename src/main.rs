//! inkframe server
//!
//! Run with: cargo run --features server
//!
//! Environment:
//!   INKFRAME_CONFIG       path to device.json (default: device.json)
//!   INKFRAME_BIND         listen address (default: 0.0.0.0:8080)
//!   CLOUDFLARE_API_TOKEN  token for the AI image plugin
//!   RUST_LOG              log filter (default: info)
//!
//! Variables may also come from a `.env` file in the working directory.

use std::sync::Arc;

use inkframe::axum_ext::{router, AppState};
use inkframe::{AiImage, DeviceConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "device.json";
const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::var("INKFRAME_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let bind = std::env::var("INKFRAME_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());

    let device = DeviceConfig::load(&config_path)?;
    if device.load_env_key(inkframe::ai_image::API_TOKEN_KEY).is_none() {
        tracing::warn!("CLOUDFLARE_API_TOKEN is not set; AI image generation will fail");
    }

    let state = Arc::new(AppState::new(device, AiImage::new()));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("Serving inkframe on http://{}", bind);
    axum::serve(listener, app).await?;
    Ok(())
}
