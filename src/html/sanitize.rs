//! Chapter markup sanitization
//!
//! The structural pass uses lol_html to drop executable content. A second,
//! literal pass removes any `<script>`/`<style>` spans left behind by markup
//! the streaming parser could not make sense of.

use std::sync::OnceLock;

use lol_html::{element, rewrite_str, RewriteStrSettings};
use regex::Regex;

/// Errors during sanitization
#[derive(Debug, thiserror::Error)]
pub enum SanitizeError {
    #[error("HTML rewrite failed: {0}")]
    RewriteError(String),
}

/// Remove script and style elements, inline event handlers and
/// `javascript:` URLs.
pub fn sanitize_html(html: &str) -> Result<String, SanitizeError> {
    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("script", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("style", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("*", |el| {
                    let handlers: Vec<String> = el
                        .attributes()
                        .iter()
                        .map(|attr| attr.name())
                        .filter(|name| name.starts_with("on"))
                        .collect();
                    for name in handlers {
                        el.remove_attribute(&name);
                    }
                    for attr in ["href", "src", "xlink:href"] {
                        if let Some(value) = el.get_attribute(attr) {
                            if is_script_url(&value) {
                                el.remove_attribute(attr);
                            }
                        }
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| SanitizeError::RewriteError(e.to_string()))?;

    Ok(result)
}

fn is_script_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_lowercase();
    compact.starts_with("javascript:") || compact.starts_with("vbscript:")
}

fn script_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script[^>]*>.*?</script\s*>").expect("valid regex"))
}

fn style_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<style[^>]*>.*?</style\s*>").expect("valid regex"))
}

/// Literal removal of `<script>…</script>` and `<style>…</style>` spans.
pub fn strip_executable_spans(html: &str) -> String {
    let no_script = script_span().replace_all(html, "");
    style_span().replace_all(&no_script, "").into_owned()
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
