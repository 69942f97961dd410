//! Device configuration shared by the web front door and the plugins.
//!
//! The configuration is a JSON document (usually `device.json`) such as:
//!
//! ```json
//! {
//!   "name": "Living room frame",
//!   "resolution": [800, 480],
//!   "current_image_file": "static/images/current_image.png",
//!   "plugins": [
//!     { "id": "ai_image", "display_name": "AI Image" }
//!   ]
//! }
//! ```
//!
//! Relative `current_image_file` paths resolve against the directory holding
//! the config file. API keys are never stored here; they come from the
//! environment through [`DeviceConfig::load_env_key`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::Error;
use crate::{DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Default location of the image currently shown on the display.
pub const DEFAULT_CURRENT_IMAGE_FILE: &str = "static/images/current_image.png";

/// Read-only device configuration.
///
/// # Example
///
/// ```
/// use inkframe::DeviceConfig;
///
/// let config = DeviceConfig::from_value(serde_json::json!({
///     "resolution": [1600, 1200],
///     "plugins": [{ "id": "ai_image" }]
/// }))
/// .unwrap();
///
/// assert_eq!(config.get_resolution(), (1600, 1200));
/// assert_eq!(config.get_plugins().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    config: Map<String, Value>,
    current_image_file: PathBuf,
    resolution: (u32, u32),
    /// Replaces process environment lookup when set
    env: Option<HashMap<String, String>>,
}

impl DeviceConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or is not a JSON
    /// object with a valid `resolution`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read device config '{}': {}",
                path.display(),
                e
            ))
        })?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid device config JSON: {}", e)))?;

        let mut config = Self::from_value(value)?;
        if config.current_image_file.is_relative() {
            if let Some(dir) = path.parent() {
                config.current_image_file = dir.join(&config.current_image_file);
            }
        }

        tracing::info!(
            "Loaded device config from {} ({}x{}, {} plugins)",
            path.display(),
            config.resolution.0,
            config.resolution.1,
            config.get_plugins().len()
        );
        Ok(config)
    }

    /// Build configuration from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the value is not an object or
    /// `resolution` is not a pair of positive integers.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let Value::Object(config) = value else {
            return Err(Error::Config(
                "Device config must be a JSON object".to_string(),
            ));
        };

        let resolution = match config.get("resolution") {
            None | Some(Value::Null) => (DEFAULT_WIDTH, DEFAULT_HEIGHT),
            Some(value) => parse_resolution(value).ok_or_else(|| {
                Error::Config(format!(
                    "Invalid resolution {}: expected [width, height]",
                    value
                ))
            })?,
        };

        let current_image_file = config
            .get("current_image_file")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CURRENT_IMAGE_FILE)
            .into();

        Ok(Self {
            config,
            current_image_file,
            resolution,
            env: None,
        })
    }

    /// Override the current image path.
    #[must_use]
    pub fn with_current_image_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.current_image_file = path.into();
        self
    }

    /// Resolve environment keys from the given map instead of the process
    /// environment.
    #[must_use]
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    /// Path of the image currently shown on the display.
    pub fn current_image_file(&self) -> &Path {
        &self.current_image_file
    }

    /// The full configuration map.
    pub fn get_config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// Configured plugins (empty when the config has none).
    pub fn get_plugins(&self) -> &[Value] {
        self.config
            .get("plugins")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Display resolution as `(width, height)`.
    pub fn get_resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// Look up a secret by name. Empty values count as missing.
    pub fn load_env_key(&self, key: &str) -> Option<String> {
        let value = match &self.env {
            Some(vars) => vars.get(key).cloned(),
            None => std::env::var(key).ok(),
        };
        value.filter(|v| !v.trim().is_empty())
    }
}

fn parse_resolution(value: &Value) -> Option<(u32, u32)> {
    let pair = value.as_array()?;
    if pair.len() != 2 {
        return None;
    }
    let width = u32::try_from(pair[0].as_u64()?).ok()?;
    let height = u32::try_from(pair[1].as_u64()?).ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}
