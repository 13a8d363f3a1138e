//! Container descriptor lookup
//!
//! `META-INF/container.xml` names the package (OPF) document.

use super::archive::ArchiveReader;
use super::EpubError;

/// Fixed location of the container descriptor
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Where the package document lives inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLocation {
    /// Path exactly as declared by `rootfile@full-path`
    pub path: String,
    /// Prefix content hrefs are resolved against (ends with `/`, or empty)
    pub base_dir: String,
}

impl PackageLocation {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let base_dir = path
            .rfind('/')
            .map(|i| path[..=i].to_string())
            .unwrap_or_default();
        Self { path, base_dir }
    }

    /// Full archive path of a manifest href
    pub fn resolve(&self, href: &str) -> String {
        format!("{}{}", self.base_dir, href)
    }
}

/// Read the container descriptor and return the package document location.
pub fn locate_package(archive: &ArchiveReader) -> Result<PackageLocation, EpubError> {
    let content = archive
        .read_entry_as_text(CONTAINER_PATH)
        .map_err(|_| EpubError::InvalidContainer("container.xml not found".to_string()))?;

    let doc = roxmltree::Document::parse_with_options(&content, super::package::xml_options())
        .map_err(|e| EpubError::InvalidContainer(format!("container.xml is not valid XML: {}", e)))?;

    doc.descendants()
        .find(|node| node.tag_name().name() == "rootfile")
        .and_then(|node| node.attribute("full-path"))
        .filter(|path| !path.is_empty())
        .map(PackageLocation::new)
        .ok_or_else(|| EpubError::InvalidContainer("OPF path not found".to_string()))
}
