//! OPF (Open Packaging Format) parser
//!
//! Parses the package document into metadata, manifest and spine. Element
//! matching uses local names so both prefixed and default-namespace OPF
//! documents work.

use roxmltree::{Document, Node, ParsingOptions};

use super::types::{ManifestItem, Package, PackageMetadata, SpineEntry};
use super::EpubError;

/// Parsing options shared by every XML document in the archive.
pub(crate) fn xml_options() -> ParsingOptions {
    ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    }
}

/// Parse a package document
pub fn parse_package(content: &str) -> Result<Package, EpubError> {
    let doc = Document::parse_with_options(content, xml_options())
        .map_err(|e| EpubError::InvalidPackage(format!("OPF is not valid XML: {}", e)))?;

    Ok(Package {
        metadata: parse_metadata(&doc),
        manifest: parse_manifest(&doc),
        spine: parse_spine(&doc),
    })
}

fn section<'a, 'input>(doc: &'a Document<'input>, name: &str) -> Option<Node<'a, 'input>> {
    doc.descendants().find(|node| node.tag_name().name() == name)
}

fn parse_metadata(doc: &Document) -> PackageMetadata {
    let mut metadata = PackageMetadata::default();
    let Some(section) = section(doc, "metadata") else {
        return metadata;
    };

    for node in section.descendants().filter(Node::is_element) {
        let text = node.text().map(str::trim).filter(|t| !t.is_empty());
        match (node.tag_name().name(), text) {
            ("title", Some(text)) if metadata.title.is_none() => {
                metadata.title = Some(text.to_string());
            }
            ("creator", Some(text)) => metadata.creators.push(text.to_string()),
            ("language", Some(text)) if metadata.language.is_none() => {
                metadata.language = Some(text.to_string());
            }
            _ => {}
        }
    }

    metadata
}

fn parse_manifest(doc: &Document) -> Vec<ManifestItem> {
    let Some(section) = section(doc, "manifest") else {
        return Vec::new();
    };

    section
        .descendants()
        .filter(|node| node.tag_name().name() == "item")
        .filter_map(|node| {
            let id = node.attribute("id")?;
            let href = node.attribute("href")?;
            Some(ManifestItem {
                id: id.to_string(),
                href: href.to_string(),
                media_type: node.attribute("media-type").map(str::to_string),
            })
        })
        .collect()
}

fn parse_spine(doc: &Document) -> Vec<SpineEntry> {
    let Some(section) = section(doc, "spine") else {
        return Vec::new();
    };

    section
        .descendants()
        .filter(|node| node.tag_name().name() == "itemref")
        .enumerate()
        .filter_map(|(i, node)| {
            node.attribute("idref").map(|idref| SpineEntry {
                idref: idref.to_string(),
                position: i + 1,
            })
        })
        .collect()
}
