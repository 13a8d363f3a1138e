//! EPUB data types
//!
//! Shapes produced by the ingestion pipeline and handed to the reader.

use serde::{Deserialize, Serialize};

/// Manifest item from the package document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestItem {
    pub id: String,
    /// Path relative to the package document's directory, unresolved
    pub href: String,
    pub media_type: Option<String>,
}

/// Spine entry (reading order reference into the manifest)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpineEntry {
    pub idref: String,
    /// 1-based position among the package's `itemref` elements
    pub position: usize,
}

/// Package-level metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    pub title: Option<String>,
    pub creators: Vec<String>,
    pub language: Option<String>,
}

/// Parsed package document
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub metadata: PackageMetadata,
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<SpineEntry>,
}

impl Package {
    /// Look up a manifest item by id
    pub fn manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }
}

/// One realized, sanitized unit of reading content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    /// Sanitized HTML fragment, safe for direct rendering
    pub content: String,
}

/// Result of a successful load
#[derive(Debug, Clone)]
pub struct LoadedBook {
    pub metadata: PackageMetadata,
    pub chapters: Vec<Chapter>,
}
