//! HTML processing module
//!
//! Sanitization of EPUB content documents before they reach the reader.
//! Uses lol_html for streaming element removal.

mod sanitize;

pub use sanitize::{normalize_text, sanitize_html, strip_executable_spans, SanitizeError};
