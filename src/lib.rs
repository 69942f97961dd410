//! # inkframe
//!
//! A small web front door and an AI image plugin for e-ink photo frames.
//!
//! The crate has two loosely related halves that share a [`DeviceConfig`]:
//! - **Web front door**: a main page and a never-cached `/current-image`
//!   endpoint (axum, behind the `axum` feature)
//! - **AI image plugin**: asks Cloudflare Workers AI (through an AI Gateway)
//!   for an image and normalizes it for the panel
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use inkframe::{AiImage, DeviceConfig, Settings};
//!
//! # async fn example() -> Result<(), inkframe::Error> {
//! // CLOUDFLARE_API_TOKEN must be set in the environment
//! let device = DeviceConfig::load("device.json")?;
//!
//! let settings = Settings::new("a lighthouse at dusk").with_style("eink_optimized");
//! let image = AiImage::new().generate_image(&settings, &device).await?;
//!
//! assert_eq!((image.width(), image.height()), device.get_resolution());
//! # Ok(())
//! # }
//! ```
//!
//! ## E-ink Normalization
//!
//! Every generated image is:
//! - optionally reduced to grayscale
//! - shrunk (never enlarged) to fit the display, keeping its aspect ratio
//! - centred on a white canvas of exactly the display size
//! - contrast-boosted by 1.5x
//! - returned as RGB8, whatever the grayscale choice
//!
//! ## Feature Flags
//!
//! - `axum` - Router and handlers for the web front door
//! - `server` - The `inkframe` server binary (implies `axum`)
//! - `full` - All features

pub mod ai_image;
pub mod catalog;
mod device;
pub mod eink;
mod error;
mod gateway;
pub mod page;

pub use ai_image::{AiImage, PluginFeatures, PromptStyle, Settings};
pub use device::{DeviceConfig, DEFAULT_CURRENT_IMAGE_FILE};
pub use error::{Error, RemoteError};
pub use gateway::GatewayClient;

/// Default display width in pixels
pub const DEFAULT_WIDTH: u32 = 800;

/// Default display height in pixels
pub const DEFAULT_HEIGHT: u32 = 480;

/// Cloudflare AI Gateway endpoint for Workers AI
pub const GATEWAY_BASE_URL: &str =
    "https://gateway.ai.cloudflare.com/v1/d7d9eea07df9b1cd0c93141bd99239b6/inky-pi/workers-ai";

/// Default HTTP timeout for gateway requests (image generation is slow)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

// Re-export axum integration
#[cfg(feature = "axum")]
pub mod axum_ext;
