//! Axum integration: the frame's web front door.
//!
//! | Endpoint | Method | Purpose |
//! |----------|--------|---------|
//! | `/` | GET | Main page with the current image and plugin list |
//! | `/current-image` | GET | The image on the display, never cached |
//! | `/plugins/ai_image/settings` | GET | Model/style catalogs for the settings form |
//! | `/plugins/ai_image/generate` | POST | Generate a new image and make it current |
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use inkframe::axum_ext::{router, AppState};
//! use inkframe::{AiImage, DeviceConfig};
//!
//! let state = AppState::new(DeviceConfig::load("device.json")?, AiImage::new());
//! let app = router(Arc::new(state));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::{header, StatusCode};
use image::{DynamicImage, ImageFormat};
use serde_json::{json, Value};

use crate::ai_image::{AiImage, Settings, SettingsTemplate};
use crate::device::DeviceConfig;
use crate::error::Error;
use crate::page;

/// Shared, read-only server state.
#[derive(Debug)]
pub struct AppState {
    /// Device configuration
    pub device: DeviceConfig,
    /// AI image plugin
    pub ai_image: AiImage,
}

impl AppState {
    /// Create server state.
    pub fn new(device: DeviceConfig, ai_image: AiImage) -> Self {
        Self { device, ai_image }
    }
}

/// Build the router with all front door routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(main_page))
        .route("/current-image", get(current_image))
        .route("/plugins/ai_image/settings", get(ai_image_settings))
        .route("/plugins/ai_image/generate", post(generate_ai_image))
        .with_state(state)
}

/// GET / - Main page
pub async fn main_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let cache_bust = page::image_cache_bust(state.device.current_image_file());
    Html(page::render_index(
        state.device.get_config(),
        state.device.get_plugins(),
        cache_bust,
    ))
}

/// GET /current-image - Serve the displayed image with caching disabled
pub async fn current_image(State(state): State<Arc<AppState>>) -> Response {
    let path = state.device.current_image_file();

    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return (StatusCode::NOT_FOUND, "Image not found").into_response();
        }
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read image").into_response();
        }
    };

    (
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        data,
    )
        .into_response()
}

/// GET /plugins/ai_image/settings - Settings form data
pub async fn ai_image_settings(State(state): State<Arc<AppState>>) -> Json<SettingsTemplate> {
    Json(state.ai_image.settings_template())
}

/// POST /plugins/ai_image/generate - Generate and display a new image
pub async fn generate_ai_image(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<Settings>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let result = match state.ai_image.generate_image(&settings, &state.device).await {
        Ok(image) => save_image(&image, state.device.current_image_file()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            tracing::info!(
                "Updated current image at {}",
                state.device.current_image_file().display()
            );
            Ok(Json(json!({ "success": true })))
        }
        Err(e) => {
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            tracing::warn!("AI image generation failed: {}", e);
            Err((status, Json(json!({ "error": e.to_string() }))))
        }
    }
}

/// Encode `image` as PNG and write it to `path`, creating parent directories.
///
/// The PNG goes to a sibling temp file first and is renamed over `path`, so
/// readers of the current image never see a partial file.
///
/// # Errors
///
/// Returns [`Error::Encode`] if PNG encoding fails or [`Error::Io`] if the
/// file cannot be written.
pub async fn save_image(image: &DynamicImage, path: &Path) -> Result<(), Error> {
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image.png".to_string());
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let temp = path.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), seq));

    tokio::fs::write(&temp, png.into_inner()).await?;
    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Distinguishes temp files of concurrent saves.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_image::API_TOKEN_KEY;

    use std::collections::HashMap;
    use std::path::PathBuf;

    use axum::body::{to_bytes, Body};
    use http::Request;
    use image::{Rgb, RgbImage};
    use tower::ServiceExt;

    fn state(image_path: PathBuf, gateway: Option<String>) -> Arc<AppState> {
        let mut vars = HashMap::new();
        vars.insert(API_TOKEN_KEY.to_string(), "secret".to_string());

        let device = DeviceConfig::from_value(json!({
            "name": "Test frame",
            "resolution": [64, 48],
            "plugins": [{ "id": "ai_image", "display_name": "AI Image" }]
        }))
        .unwrap()
        .with_current_image_file(image_path)
        .with_env(vars);

        let ai_image = match gateway {
            Some(url) => AiImage::new().with_base_url(url),
            None => AiImage::new().with_base_url("http://127.0.0.1:9"),
        };
        Arc::new(AppState::new(device, ai_image))
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("inkframe_test_{}", name))
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_current_image_missing() {
        let app = router(state(temp_path("missing/current.png"), None));
        let response = app.oneshot(get("/current-image")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_bytes(response).await, b"Image not found");
    }

    #[tokio::test]
    async fn test_current_image_no_cache_headers() {
        let path = temp_path("serve_current.png");
        std::fs::write(&path, b"\x89PNG fake").unwrap();

        let app = router(state(path.clone(), None));
        let response = app.oneshot(get("/current-image")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(
            headers[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate"
        );
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::EXPIRES], "0");
        assert_eq!(body_bytes(response).await, b"\x89PNG fake");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_main_page() {
        let app = router(state(temp_path("page_missing.png"), None));
        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("<title>Test frame</title>"));
        assert!(html.contains("AI Image"));
        assert!(html.contains("/current-image?t="));
    }

    #[tokio::test]
    async fn test_settings_endpoint() {
        let app = router(state(temp_path("settings.png"), None));
        let response = app
            .oneshot(get("/plugins/ai_image/settings"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["api_key"]["service"], "Cloudflare");
        assert_eq!(json["style_options"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_prompt() {
        let app = router(state(temp_path("generate_empty.png"), None));
        let response = app
            .oneshot(post_json(
                "/plugins/ai_image/generate",
                json!({ "textPrompt": "   " }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["error"], "Text prompt is required.");
    }

    #[tokio::test]
    async fn test_generate_remote_failure() {
        let app = router(state(temp_path("generate_fail.png"), None));
        let response = app
            .oneshot(post_json(
                "/plugins/ai_image/generate",
                json!({ "textPrompt": "a fox" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("Cloudflare AI request failed:"));
    }

    #[tokio::test]
    async fn test_save_image_replaces_without_leftovers() {
        let dir = temp_path("save_replace");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("current.png");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, b"old contents").unwrap();

        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([1, 2, 3])));
        let (a, b) = tokio::join!(save_image(&image, &path), save_image(&image, &path));
        a.unwrap();
        b.unwrap();

        let saved = image::open(&path).unwrap();
        assert_eq!((saved.width(), saved.height()), (8, 6));
        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().flatten().collect();
        assert_eq!(entries.len(), 1, "temp files must not be left behind");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_generate_then_serve() {
        // Stand-in gateway answering with a raw PNG body
        let mut png = Cursor::new(Vec::new());
        RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]))
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();
        let png = png.into_inner();
        let gateway = Router::new().route(
            "/run/{*model}",
            post(move || {
                let png = png.clone();
                async move { png }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, gateway).await.unwrap();
        });

        let path = temp_path("generated/current.png");
        let _ = std::fs::remove_file(&path);
        let app = router(state(path.clone(), Some(format!("http://{}", addr))));

        let response = app
            .clone()
            .oneshot(post_json(
                "/plugins/ai_image/generate",
                json!({ "textPrompt": "a fox", "convertToGrayscale": "on" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/current-image")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let served = image::load_from_memory(&body_bytes(response).await).unwrap();
        assert_eq!((served.width(), served.height()), (64, 48));

        let _ = std::fs::remove_file(&path);
    }
}
