//! Cloudflare Workers AI client, routed through an AI Gateway.

use std::time::Duration;

use base64::Engine;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::ImageModel;
use crate::error::RemoteError;
use crate::{DEFAULT_TIMEOUT_SECS, GATEWAY_BASE_URL};

/// Number of characters of a non-JSON error body kept in error messages.
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// Request body for a text-to-image run.
#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
}

/// Successful JSON response carrying a base64 image.
#[derive(Debug, Deserialize)]
struct RunResponse {
    result: RunResult,
}

#[derive(Debug, Deserialize)]
struct RunResult {
    image: String,
}

/// Client for text-to-image models behind the gateway.
///
/// # Example
///
/// ```rust,no_run
/// use inkframe::catalog::resolve_model;
/// use inkframe::GatewayClient;
///
/// # async fn example() -> Result<(), inkframe::RemoteError> {
/// let client = GatewayClient::new("cf-api-token");
/// let model = resolve_model(Some("@cf/lykon/dreamshaper-8-lcm"));
///
/// let image = client.generate(model, "a lighthouse at dusk", Some((800, 480))).await?;
/// println!("{}x{}", image.width(), image.height());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    api_token: String,
    base_url: String,
    gateway_auth: bool,
}

impl GatewayClient {
    /// Create a new client authenticating with the given API token.
    pub fn new(api_token: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self::with_shared_client(http, api_token)
    }

    /// Create a client that reuses an existing HTTP client (and its pool).
    pub fn with_shared_client(http: reqwest::Client, api_token: impl Into<String>) -> Self {
        Self {
            http,
            api_token: api_token.into(),
            base_url: GATEWAY_BASE_URL.to_string(),
            gateway_auth: true,
        }
    }

    /// Set a custom base URL (useful for testing or a different gateway).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a custom HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Set the request timeout, replacing the HTTP client.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        self
    }

    /// Skip the `cf-aig-authorization` header (unauthenticated gateways).
    #[must_use]
    pub fn without_gateway_auth(mut self) -> Self {
        self.gateway_auth = false;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run a text-to-image model and decode the returned image.
    ///
    /// `size` is sent as `width`/`height` only when the model supports
    /// custom dimensions.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HTTP request fails
    /// - The gateway answers with a status other than 200
    /// - The payload is not valid base64 or not a decodable image
    pub async fn generate(
        &self,
        model: &ImageModel,
        prompt: &str,
        size: Option<(u32, u32)>,
    ) -> Result<DynamicImage, RemoteError> {
        let url = format!("{}/run/{}", self.base_url, model.id);
        tracing::info!("Generating image with model: {}", model.id);
        tracing::info!("Prompt: {}", prompt);

        let size = size.filter(|_| model.supports_custom_size);
        match size {
            Some((w, h)) => tracing::info!("Using custom dimensions: {}x{}", w, h),
            None => tracing::info!("Using default dimensions for {}", model.id),
        }

        let payload = RunRequest {
            prompt,
            width: size.map(|(w, _)| w),
            height: size.map(|(_, h)| h),
        };

        let bearer = format!("Bearer {}", self.api_token);
        let mut request = self
            .http
            .post(&url)
            .header("Authorization", &bearer)
            .header("Content-Type", "application/json")
            .json(&payload);
        if self.gateway_auth {
            request = request.header("cf-aig-authorization", &bearer);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status != reqwest::StatusCode::OK {
            return Err(RemoteError::Api {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        let bytes = image_bytes(&body)?;
        let image = image::load_from_memory(&bytes)?;
        tracing::info!(
            "Received {}x{} image ({} bytes)",
            image.width(),
            image.height(),
            bytes.len()
        );
        Ok(image)
    }
}

/// Extract the image payload: base64 `result.image` when the body is such a
/// JSON document, otherwise the raw body.
pub(crate) fn image_bytes(body: &[u8]) -> Result<Vec<u8>, RemoteError> {
    match serde_json::from_slice::<RunResponse>(body) {
        Ok(parsed) => {
            // Line-wrapped payloads are common; the alphabet has no whitespace
            let encoded: Vec<u8> = parsed
                .result
                .image
                .bytes()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            Ok(base64::engine::general_purpose::STANDARD.decode(encoded)?)
        }
        Err(_) => {
            tracing::debug!("Response is not a JSON image envelope, treating as binary");
            Ok(body.to_vec())
        }
    }
}

/// Describe a failed response for the error message.
pub(crate) fn error_detail(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    let preview = || {
        String::from_utf8_lossy(body)
            .chars()
            .take(ERROR_BODY_PREVIEW_CHARS)
            .collect()
    };
    let parsed = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(parsed)) => parsed,
        Ok(_) => return None,
        Err(_) => return Some(preview()),
    };
    // A present-but-unusable `errors` (null, empty, wrong shape) falls back
    // to the raw body
    let errors = parsed.get("errors")?;
    match errors.as_array().and_then(|e| e.first()) {
        Some(Value::Object(first)) => Some(match first.get("message") {
            Some(Value::String(message)) => message.clone(),
            None | Some(Value::Null) => "Unknown error".to_string(),
            Some(other) => other.to_string(),
        }),
        _ => Some(preview()),
    }
}
