//! Error types for inkframe.

use thiserror::Error;

/// Errors that can occur while configuring the frame or generating an image.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration missing or invalid (API token, device config file)
    #[error("{0}")]
    Config(String),

    /// Caller-supplied settings rejected before any network call
    #[error("{0}")]
    Validation(String),

    /// The remote image generation failed (status, network, decoding)
    #[error("Cloudflare AI request failed: {0}")]
    Remote(#[from] RemoteError),

    /// Encoding the finished image failed
    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    /// Saving or reading an image file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error was caused by the caller's input or configuration
    /// rather than by the remote service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Validation(_))
    }
}

/// Failures between sending the gateway request and holding a normalized bitmap.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Gateway returned a non-200 status
    #[error("Cloudflare AI API error: {status}{}", detail_suffix(.detail))]
    Api {
        /// HTTP status code
        status: u16,
        /// First reported error message, or the start of the raw body
        detail: Option<String>,
    },

    /// HTTP request failed (connect, timeout, body read)
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    /// `result.image` was not valid base64
    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Response bytes could not be decoded as an image
    #[error("cannot identify image data: {0}")]
    Image(#[from] image::ImageError),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(" - {d}"))
        .unwrap_or_default()
}
