//! Chapter extraction
//!
//! Walks the spine in order and turns every resolvable content document into
//! a sanitized [`Chapter`]. A failing entry is skipped on its own and never
//! aborts the walk.

use std::collections::HashSet;

use scraper::{Html, Selector};
use thiserror::Error;

use super::archive::{ArchiveReader, EntryError};
use super::container::PackageLocation;
use super::types::{Chapter, Package, SpineEntry};
use crate::html::{normalize_text, sanitize_html, strip_executable_spans, SanitizeError};

/// Why a spine entry produced no chapter
#[derive(Error, Debug)]
pub enum SkipReason {
    #[error("idref {0} already produced a chapter")]
    Duplicate(String),

    #[error("no manifest item for idref {0}")]
    MissingManifestItem(String),

    #[error("{0} is not a content document")]
    NotMarkup(String),

    #[error(transparent)]
    Entry(#[from] EntryError),

    #[error(transparent)]
    Markup(#[from] SanitizeError),

    #[error("no content after sanitization")]
    EmptyContent,
}

/// Extract the realized chapter list. Manifest hrefs are resolved against
/// the package document's directory.
pub fn extract_chapters(
    archive: &ArchiveReader,
    package: &Package,
    location: &PackageLocation,
) -> Vec<Chapter> {
    let mut seen = HashSet::new();

    package
        .spine
        .iter()
        .filter_map(|entry| {
            match extract_chapter(archive, package, location, entry, &mut seen) {
                Ok(chapter) => Some(chapter),
                Err(reason) => {
                    match &reason {
                        SkipReason::Entry(EntryError::NotFound(path)) => {
                            tracing::warn!("Content file not found: {}", path);
                        }
                        _ => tracing::debug!(
                            "Skipping spine entry {} ({}): {}",
                            entry.position,
                            entry.idref,
                            reason
                        ),
                    }
                    None
                }
            }
        })
        .collect()
}

fn extract_chapter(
    archive: &ArchiveReader,
    package: &Package,
    location: &PackageLocation,
    entry: &SpineEntry,
    seen: &mut HashSet<String>,
) -> Result<Chapter, SkipReason> {
    if !seen.insert(entry.idref.clone()) {
        return Err(SkipReason::Duplicate(entry.idref.clone()));
    }

    let item = package
        .manifest_item(&entry.idref)
        .ok_or_else(|| SkipReason::MissingManifestItem(entry.idref.clone()))?;

    if let Some(media_type) = item.media_type.as_deref() {
        if !is_markup(media_type) {
            return Err(SkipReason::NotMarkup(media_type.to_string()));
        }
    }

    let full_path = location.resolve(&item.href);
    tracing::debug!("Processing chapter: {}", full_path);

    let markup = archive.read_entry_as_text(&full_path)?;
    let (title, content) = render_document(&markup, entry.position)?;

    if content.is_empty() {
        return Err(SkipReason::EmptyContent);
    }

    Ok(Chapter {
        id: entry.idref.clone(),
        title,
        content,
    })
}

/// XHTML, HTML and other XML documents (SVG, DTBook) can be rendered.
fn is_markup(media_type: &str) -> bool {
    let media_type = media_type.to_ascii_lowercase();
    media_type.contains("html") || media_type.ends_with("xml")
}

/// Sanitize a content document and split it into title and body fragment.
fn render_document(markup: &str, position: usize) -> Result<(String, String), SanitizeError> {
    let cleaned = sanitize_html(markup)?;
    let document = Html::parse_document(&cleaned);

    let title = first_text(&document, "title")
        .or_else(|| first_text(&document, "h1, h2, h3"))
        .unwrap_or_else(|| format!("Chapter {}", position));

    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next().map(|body| body.inner_html()))
        .unwrap_or(cleaned);

    Ok((title, normalize_text(&strip_executable_spans(&body))))
}

/// Trimmed text of the first element matching `css`, if non-blank.
fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    let text: String = document.select(&selector).next()?.text().collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::fixtures::EpubBuilder;
    use crate::epub::{locate_package, parse_package};

    fn extract(data: &[u8]) -> Vec<Chapter> {
        let archive = ArchiveReader::open(data).unwrap();
        let location = locate_package(&archive).unwrap();
        let opf = archive.read_entry_as_text(&location.path).unwrap();
        let package = parse_package(&opf).unwrap();
        extract_chapters(&archive, &package, &location)
    }

    #[test]
    fn test_script_is_stripped() {
        let (title, content) =
            render_document("<html><body><script>alert(1)</script><p>Hello</p></body></html>", 1)
                .unwrap();

        assert_eq!(content, "<p>Hello</p>");
        assert!(!content.contains("alert"));
        assert_eq!(title, "Chapter 1");
    }

    #[test]
    fn test_title_prefers_title_element() {
        let html = "<html><head><title> The Title </title></head><body><h1>Heading</h1></body></html>";
        let (title, _) = render_document(html, 4).unwrap();
        assert_eq!(title, "The Title");
    }

    #[test]
    fn test_title_falls_back_to_first_heading() {
        let html = "<html><head><title>  </title></head><body><h3>Third</h3><h1>First</h1></body></html>";
        let (title, _) = render_document(html, 4).unwrap();
        assert_eq!(title, "Third");
    }

    #[test]
    fn test_title_falls_back_to_position() {
        let (title, _) = render_document("<body><p>text</p></body>", 7).unwrap();
        assert_eq!(title, "Chapter 7");
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let html = "<body>\n  <p>one\n\n   two</p>\n\t<p>three</p>\n</body>";
        let (_, content) = render_document(html, 1).unwrap();
        assert_eq!(content, "<p>one two</p> <p>three</p>");
    }

    #[test]
    fn test_xhtml_document_with_declaration() {
        let html = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>فصل</title><style>p{}</style></head>
<body><p>نص</p></body>
</html>"#;
        let (title, content) = render_document(html, 1).unwrap();
        assert_eq!(title, "فصل");
        assert_eq!(content, "<p>نص</p>");
    }

    #[test]
    fn test_chapters_follow_spine_order() {
        let data = EpubBuilder::new()
            .chapter("b", "B", "<p>b</p>")
            .chapter("a", "A", "<p>a</p>")
            .build();

        let ids: Vec<String> = extract(&data).into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_fallback_title_uses_spine_position() {
        let data = EpubBuilder::new()
            .spine_only("missing")
            .raw_chapter("c2", "<html><body><p>untitled</p></body></html>")
            .build();

        let chapters = extract(&data);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "Chapter 2");
    }

    #[test]
    fn test_duplicate_idref_yields_one_chapter() {
        let data = EpubBuilder::new()
            .chapter("c1", "One", "<p>a</p>")
            .spine_only("c1")
            .build();

        let chapters = extract(&data);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].id, "c1");
    }

    #[test]
    fn test_non_markup_spine_item_is_skipped() {
        let data = EpubBuilder::new()
            .spine_resource("plate", "images/plate.png", "image/png", vec![0x89, b'P', b'N', b'G'])
            .chapter("c2", "Two", "<p>text</p>")
            .build();

        let chapters = extract(&data);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].id, "c2");
        assert!(is_markup("application/xhtml+xml"));
        assert!(is_markup("image/svg+xml"));
        assert!(!is_markup("image/png"));
    }

    #[test]
    fn test_undecodable_entry_is_skipped() {
        let data = EpubBuilder::new()
            .raw_bytes_chapter("bad", vec![0xC3, 0x28, 0xFF])
            .chapter("good", "Good", "<p>ok</p>")
            .build();

        let chapters = extract(&data);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].id, "good");
    }
}
