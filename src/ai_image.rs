//! AI image plugin: turns a text prompt into a display-ready bitmap.
//!
//! One call to [`AiImage::generate_image`] runs the whole pipeline:
//!
//! 1. check that `CLOUDFLARE_API_TOKEN` is configured
//! 2. reject empty prompts
//! 3. resolve the model (unknown ids fall back to the default)
//! 4. augment the prompt according to [`PromptStyle`]
//! 5. call the gateway, sized to the display when the model allows it
//! 6. normalize the result for e-ink ([`crate::eink::optimize_for_eink`])
//!
//! # Example
//!
//! ```rust,no_run
//! use inkframe::{AiImage, DeviceConfig, Settings};
//!
//! # async fn example() -> Result<(), inkframe::Error> {
//! let device = DeviceConfig::load("device.json")?;
//! let settings: Settings = serde_json::from_value(serde_json::json!({
//!     "textPrompt": "a lighthouse at dusk",
//!     "styleOption": "woodcut_print",
//!     "convertToGrayscale": true
//! }))
//! .unwrap();
//!
//! let image = AiImage::new().generate_image(&settings, &device).await?;
//! image.save(device.current_image_file()).unwrap();
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use image::DynamicImage;
use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::{self, ImageModel, StyleOption, IMAGE_MODELS, STYLE_OPTIONS};
use crate::device::DeviceConfig;
use crate::eink::optimize_for_eink;
use crate::error::Error;
use crate::gateway::GatewayClient;
use crate::DEFAULT_TIMEOUT_SECS;

/// Environment key holding the Cloudflare API token.
pub const API_TOKEN_KEY: &str = "CLOUDFLARE_API_TOKEN";

/// Phrase appended by [`PromptStyle::EinkSuffix`].
pub const EINK_PROMPT_SUFFIX: &str =
    " Black and white, high contrast, simple shapes, suitable for e-ink display";

/// Per-request plugin settings, as posted by the settings form.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// The user's prompt
    #[serde(default)]
    pub text_prompt: Option<String>,

    /// Model id from [`IMAGE_MODELS`]
    #[serde(default)]
    pub image_model: Option<String>,

    /// Style id from [`STYLE_OPTIONS`]
    #[serde(default)]
    pub style_option: Option<String>,

    /// Reduce the image to grayscale before padding.
    ///
    /// Accepts booleans and HTML checkbox strings (`"on"`, `"true"`, ...).
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub convert_to_grayscale: bool,
}

impl Settings {
    /// Create settings with just a prompt.
    pub fn new(text_prompt: impl Into<String>) -> Self {
        Self {
            text_prompt: Some(text_prompt.into()),
            ..Default::default()
        }
    }

    /// Set the model id.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = Some(model.into());
        self
    }

    /// Set the style id.
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style_option = Some(style.into());
        self
    }

    /// Request grayscale conversion.
    #[must_use]
    pub fn with_grayscale(mut self) -> Self {
        self.convert_to_grayscale = true;
        self
    }
}

fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
        Null(()),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "on" | "1" | "yes"
        ),
        Flag::Null(()) => false,
    })
}

/// How the user's prompt is augmented before it is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// Append the suffix of the selected [`StyleOption`]
    #[default]
    Catalog,

    /// Always append [`EINK_PROMPT_SUFFIX`] unless the prompt already asks
    /// for monochrome output
    EinkSuffix,

    /// Send the prompt as typed
    Disabled,
}

/// Optional plugin behaviours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PluginFeatures {
    /// Prompt augmentation mode
    pub prompt_style: PromptStyle,

    /// Request images at the display resolution when the model supports it
    pub display_sizing: bool,

    /// Honour the `convertToGrayscale` setting
    pub grayscale: bool,
}

impl Default for PluginFeatures {
    fn default() -> Self {
        Self {
            prompt_style: PromptStyle::Catalog,
            display_sizing: true,
            grayscale: true,
        }
    }
}

/// Describes the secret the settings page must ask for.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyRequirement {
    /// Whether generation is impossible without it
    pub required: bool,
    /// Service name shown to the user
    pub service: &'static str,
    /// Environment key the token is read from
    pub expected_key: &'static str,
}

/// Everything the settings page needs to render the plugin form.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsTemplate {
    /// API key requirement
    pub api_key: ApiKeyRequirement,
    /// Selectable styles
    pub style_options: &'static [StyleOption],
    /// Selectable models
    pub image_models: &'static [ImageModel],
    /// Enabled plugin behaviours
    pub features: PluginFeatures,
}

/// The AI image plugin.
///
/// Cloning is cheap; clones share one HTTP connection pool.
#[derive(Debug, Clone)]
pub struct AiImage {
    features: PluginFeatures,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl Default for AiImage {
    fn default() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            features: PluginFeatures::default(),
            base_url: None,
            http,
        }
    }
}

impl AiImage {
    /// Create the plugin with default features.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the plugin features.
    #[must_use]
    pub fn with_features(mut self, features: PluginFeatures) -> Self {
        self.features = features;
        self
    }

    /// Send requests to a different gateway base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Share an HTTP client across generations.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Enabled features.
    pub fn features(&self) -> PluginFeatures {
        self.features
    }

    /// Data for the plugin's settings form.
    pub fn settings_template(&self) -> SettingsTemplate {
        SettingsTemplate {
            api_key: ApiKeyRequirement {
                required: true,
                service: "Cloudflare",
                expected_key: API_TOKEN_KEY,
            },
            style_options: STYLE_OPTIONS,
            image_models: IMAGE_MODELS,
            features: self.features(),
        }
    }

    /// Generate a display-ready image for the given settings.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the API token is missing
    /// - [`Error::Validation`] if the prompt is empty
    /// - [`Error::Remote`] if the gateway call, decoding or processing fails
    pub async fn generate_image(
        &self,
        settings: &Settings,
        device: &DeviceConfig,
    ) -> Result<DynamicImage, Error> {
        let api_token = device
            .load_env_key(API_TOKEN_KEY)
            .ok_or_else(|| Error::Config("Cloudflare API Token not configured.".to_string()))?;

        let text_prompt = settings.text_prompt.as_deref().unwrap_or_default();
        if text_prompt.trim().is_empty() {
            return Err(Error::Validation("Text prompt is required.".to_string()));
        }

        let model = catalog::resolve_model(settings.image_model.as_deref());
        let prompt = self.augment_prompt(text_prompt, settings.style_option.as_deref());

        let resolution = device.get_resolution();
        let size = self.features.display_sizing.then_some(resolution);
        let grayscale = self.features.grayscale && settings.convert_to_grayscale;

        let image = self
            .client(api_token)
            .generate(model, &prompt, size)
            .await
            .map_err(|e| {
                tracing::error!("Failed to generate image with Cloudflare AI: {}", e);
                Error::Remote(e)
            })?;

        Ok(optimize_for_eink(image, resolution, grayscale))
    }

    /// Apply the configured prompt augmentation.
    pub fn augment_prompt(&self, prompt: &str, style_id: Option<&str>) -> String {
        match self.features.prompt_style {
            PromptStyle::Catalog => {
                apply_style_to_prompt(prompt, style_id.unwrap_or(catalog::NO_STYLE))
            }
            PromptStyle::EinkSuffix => apply_eink_suffix(prompt),
            PromptStyle::Disabled => prompt.to_string(),
        }
    }

    fn client(&self, api_token: String) -> GatewayClient {
        let client = GatewayClient::with_shared_client(self.http.clone(), api_token);
        match &self.base_url {
            Some(base_url) => client.with_base_url(base_url.clone()),
            None => client,
        }
    }
}

/// Append the suffix of style `style_id`; unknown ids leave the prompt as is.
///
/// # Example
///
/// ```
/// use inkframe::ai_image::apply_style_to_prompt;
///
/// assert_eq!(
///     apply_style_to_prompt("a fox", "sketch_style"),
///     "a fox Sketch style, line art, drawing style"
/// );
/// assert_eq!(apply_style_to_prompt("a fox", "none"), "a fox");
/// assert_eq!(apply_style_to_prompt("a fox", "watercolor"), "a fox");
/// ```
pub fn apply_style_to_prompt(prompt: &str, style_id: &str) -> String {
    let suffix = catalog::find_style(style_id)
        .map(|s| s.prompt_suffix)
        .unwrap_or_default();
    format!("{prompt}{suffix}")
}

/// Append [`EINK_PROMPT_SUFFIX`] unless the prompt already mentions
/// monochrome output.
pub fn apply_eink_suffix(prompt: &str) -> String {
    let lower = prompt.to_lowercase();
    let monochrome = ["monochrome", "black and white", "black-and-white"]
        .iter()
        .any(|term| lower.contains(term));
    if monochrome {
        prompt.to_string()
    } else {
        format!("{prompt}{EINK_PROMPT_SUFFIX}")
    }
}
