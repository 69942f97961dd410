//! HTML for the frame's main page.
//!
//! The page is small enough to build with `format!`; every interpolated value
//! goes through [`escape_html`].

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};

/// Cache-busting value for the current image URL.
///
/// Uses the file's modification time (Unix seconds) so the browser refetches
/// only when the image changes. Falls back to the current time when the
/// file is missing or its metadata is unreadable.
pub fn image_cache_bust(path: &Path) -> u64 {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok());

    match modified {
        Some(d) => d.as_secs(),
        None => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    }
}

/// Render the main page.
///
/// # Example
///
/// ```
/// use inkframe::page::render_index;
///
/// let config = serde_json::Map::new();
/// let html = render_index(&config, &[], 1700000000);
/// assert!(html.contains("/current-image?t=1700000000"));
/// ```
pub fn render_index(config: &Map<String, Value>, plugins: &[Value], cache_bust: u64) -> String {
    let name = config
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("InkFrame");

    let plugin_items: String = plugins
        .iter()
        .map(|plugin| {
            let id = plugin.get("id").and_then(Value::as_str).unwrap_or_default();
            let label = plugin
                .get("display_name")
                .and_then(Value::as_str)
                .unwrap_or(id);
            format!(
                r#"            <li class="plugin" data-plugin-id="{id}">{label}</li>
"#,
                id = escape_html(id),
                label = escape_html(label),
            )
        })
        .collect();

    let settings: String = config
        .iter()
        .filter(|(key, _)| key.as_str() != "plugins")
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!(
                "            <tr><th>{}</th><td>{}</td></tr>\n",
                escape_html(key),
                escape_html(&value)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{name}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, sans-serif; margin: 0; padding: 20px; background: #f4f4f4; color: #111; }}
        .frame {{ background: white; padding: 12px; border: 2px solid black; display: inline-block; }}
        .frame img {{ max-width: 100%; display: block; }}
        ul.plugins {{ list-style: none; padding: 0; }}
        .plugin {{ padding: 8px 0; border-bottom: 1px solid #ddd; }}
        th {{ text-align: left; padding-right: 16px; }}
    </style>
</head>
<body>
    <h1>{name}</h1>
    <div class="frame">
        <img src="/current-image?t={cache_bust}" alt="Current display image">
    </div>
    <section>
        <h2>Plugins</h2>
        <ul class="plugins">
{plugin_items}        </ul>
    </section>
    <section>
        <h2>Device</h2>
        <table>
{settings}        </table>
    </section>
</body>
</html>"#,
        name = escape_html(name),
        cache_bust = cache_bust,
        plugin_items = plugin_items,
        settings = settings,
    )
}

/// Escape text for use in HTML content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}
