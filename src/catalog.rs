//! Static catalogs of selectable Cloudflare Workers AI models and prompt styles.
//!
//! Both lists are fixed at compile time and keep their declared order, which
//! is also the order the settings page presents them in.

use serde::Serialize;

/// A selectable text-to-image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageModel {
    /// Workers AI model id (used in the gateway URL)
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Short description for the settings page
    pub description: &'static str,
    /// Whether the model accepts `width`/`height` in the request body
    pub supports_custom_size: bool,
}

/// A prompt enhancement style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleOption {
    /// Style id (value of the `styleOption` setting)
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Short description for the settings page
    pub description: &'static str,
    /// Text appended to the user's prompt
    #[serde(rename = "prompt_append")]
    pub prompt_suffix: &'static str,
}

/// Model used when the requested one is missing or unknown.
pub const DEFAULT_IMAGE_MODEL: &str = "@cf/black-forest-labs/flux-1-schnell";

/// Style id that leaves the prompt untouched.
pub const NO_STYLE: &str = "none";

/// Available image models, recommended first.
pub static IMAGE_MODELS: &[ImageModel] = &[
    ImageModel {
        id: DEFAULT_IMAGE_MODEL,
        name: "FLUX.1 Schnell (Recommended)",
        description: "Fast, high-quality generation (square images)",
        supports_custom_size: false,
    },
    ImageModel {
        id: "@cf/bytedance/stable-diffusion-xl-lightning",
        name: "SDXL Lightning",
        description: "Ultra-fast, supports display ratio",
        supports_custom_size: true,
    },
    ImageModel {
        id: "@cf/lykon/dreamshaper-8-lcm",
        name: "DreamShaper 8 LCM",
        description: "Photorealistic focus, supports display ratio",
        supports_custom_size: true,
    },
    ImageModel {
        id: "@cf/stability/stable-diffusion-xl-base-1.0",
        name: "Stable Diffusion XL Base",
        description: "Reliable, versatile, supports display ratio",
        supports_custom_size: true,
    },
    ImageModel {
        id: "@cf/runwayml/stable-diffusion-v1-5-img2img",
        name: "Stable Diffusion 1.5 img2img",
        description: "Classic model, supports display ratio",
        supports_custom_size: true,
    },
    ImageModel {
        id: "@cf/runwayml/stable-diffusion-v1-5-inpainting",
        name: "Stable Diffusion 1.5 Inpainting",
        description: "Advanced editing, supports display ratio",
        supports_custom_size: true,
    },
];

/// Available prompt styles. Every suffix starts with a space.
pub static STYLE_OPTIONS: &[StyleOption] = &[
    StyleOption {
        id: NO_STYLE,
        name: "None",
        description: "No style enhancement",
        prompt_suffix: "",
    },
    StyleOption {
        id: "eink_optimized",
        name: "E-ink Optimized",
        description: "Optimized for e-ink displays",
        prompt_suffix: " High contrast, simple bold shapes, clean lines, minimal detail, strong definition, suitable for electronic paper display",
    },
    StyleOption {
        id: "high_contrast",
        name: "High Contrast",
        description: "Bold shapes with strong definition",
        prompt_suffix: " High contrast, bold shapes, strong definition",
    },
    StyleOption {
        id: "minimalist",
        name: "Minimalist",
        description: "Clean and simple design",
        prompt_suffix: " Minimalist design, clean simple lines, uncluttered composition",
    },
    StyleOption {
        id: "sketch_style",
        name: "Sketch Style",
        description: "Hand-drawn appearance",
        prompt_suffix: " Sketch style, line art, drawing style",
    },
    StyleOption {
        id: "vintage_poster",
        name: "Vintage Poster",
        description: "Classic poster design",
        prompt_suffix: " Vintage poster style, bold typography, simple graphics",
    },
    StyleOption {
        id: "silhouette",
        name: "Silhouette",
        description: "Strong shapes and contrast",
        prompt_suffix: " Strong silhouettes, solid shapes, dramatic contrast",
    },
    StyleOption {
        id: "technical_diagram",
        name: "Technical Diagram",
        description: "Clean technical illustration",
        prompt_suffix: " Technical illustration, clean diagrams, blueprint style",
    },
    StyleOption {
        id: "comic_book",
        name: "Comic Book",
        description: "Comic art styling",
        prompt_suffix: " Comic book art style, bold outlines, high contrast shading",
    },
    StyleOption {
        id: "woodcut_print",
        name: "Woodcut Print",
        description: "Traditional printmaking style",
        prompt_suffix: " Woodcut print style, bold carved lines, traditional printmaking aesthetic",
    },
];

/// Look up a model by id.
pub fn find_model(id: &str) -> Option<&'static ImageModel> {
    IMAGE_MODELS.iter().find(|m| m.id == id)
}

/// Resolve a requested model id, falling back to [`DEFAULT_IMAGE_MODEL`].
///
/// # Example
///
/// ```
/// use inkframe::catalog::{resolve_model, DEFAULT_IMAGE_MODEL};
///
/// assert_eq!(resolve_model(Some("@cf/lykon/dreamshaper-8-lcm")).id, "@cf/lykon/dreamshaper-8-lcm");
/// assert_eq!(resolve_model(Some("gpt-image-1")).id, DEFAULT_IMAGE_MODEL);
/// assert_eq!(resolve_model(None).id, DEFAULT_IMAGE_MODEL);
/// ```
pub fn resolve_model(requested: Option<&str>) -> &'static ImageModel {
    match requested.and_then(find_model) {
        Some(model) => model,
        None => {
            if let Some(id) = requested {
                tracing::warn!("Unknown image model {:?}, using {}", id, DEFAULT_IMAGE_MODEL);
            }
            &IMAGE_MODELS[0]
        }
    }
}

/// Look up a style by id.
pub fn find_style(id: &str) -> Option<&'static StyleOption> {
    STYLE_OPTIONS.iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_model_is_first() {
        assert_eq!(IMAGE_MODELS[0].id, DEFAULT_IMAGE_MODEL);
        assert!(find_model(DEFAULT_IMAGE_MODEL).is_some());
    }

    #[test]
    fn test_ids_are_unique() {
        let models: HashSet<_> = IMAGE_MODELS.iter().map(|m| m.id).collect();
        assert_eq!(models.len(), IMAGE_MODELS.len());

        let styles: HashSet<_> = STYLE_OPTIONS.iter().map(|s| s.id).collect();
        assert_eq!(styles.len(), STYLE_OPTIONS.len());
    }

    #[test]
    fn test_only_flux_lacks_custom_size() {
        let fixed: Vec<_> = IMAGE_MODELS
            .iter()
            .filter(|m| !m.supports_custom_size)
            .map(|m| m.id)
            .collect();
        assert_eq!(fixed, vec![DEFAULT_IMAGE_MODEL]);
    }

    #[test]
    fn test_style_suffixes() {
        assert_eq!(find_style(NO_STYLE).map(|s| s.prompt_suffix), Some(""));
        for style in STYLE_OPTIONS.iter().filter(|s| s.id != NO_STYLE) {
            assert!(style.prompt_suffix.starts_with(' '), "{}", style.id);
        }
        assert!(find_style("watercolor").is_none());
    }

    #[test]
    fn test_resolve_unknown_model() {
        assert_eq!(resolve_model(Some("")).id, DEFAULT_IMAGE_MODEL);
        assert_eq!(
            resolve_model(Some("@cf/stability/stable-diffusion-xl-base-1.0")).id,
            "@cf/stability/stable-diffusion-xl-base-1.0"
        );
    }

    #[test]
    fn test_style_serializes_prompt_append() {
        let json = serde_json::to_value(find_style("minimalist").unwrap()).unwrap();
        assert_eq!(json["id"], "minimalist");
        assert!(json["prompt_append"].as_str().unwrap().contains("Minimalist"));
    }
}
