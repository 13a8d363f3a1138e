//! EPUB ingestion module
//!
//! Fetches an EPUB archive, walks container -> package -> spine and produces
//! the ordered, sanitized chapter list a reading session is built from.

use thiserror::Error;

mod archive;
mod container;
mod extract;
mod fetcher;
mod package;
mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use archive::{ArchiveReader, EntryError};
pub use container::{locate_package, PackageLocation, CONTAINER_PATH};
pub use extract::{extract_chapters, SkipReason};
pub use fetcher::{ArchiveFetcher, DirFetcher, FetchError, HttpFetcher};
pub use package::parse_package;
pub use types::{Chapter, LoadedBook, ManifestItem, Package, PackageMetadata, SpineEntry};

/// Errors that abort a whole book load
#[derive(Error, Debug)]
pub enum EpubError {
    #[error("Failed to fetch EPUB file: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to read EPUB archive: {0}")]
    ArchiveFormat(#[from] zip::result::ZipError),

    #[error("Invalid EPUB: {0}")]
    InvalidContainer(String),

    #[error("Invalid EPUB: {0}")]
    InvalidPackage(String),

    #[error("No readable content found in this EPUB file")]
    NoReadableContent,

    #[error("EPUB processing was interrupted: {0}")]
    Interrupted(String),
}

/// Run the full pipeline for one book: fetch, open, locate, parse, extract.
pub async fn load_book(
    fetcher: &dyn ArchiveFetcher,
    filename: &str,
) -> Result<LoadedBook, EpubError> {
    tracing::info!("Loading EPUB: {}", filename);

    let data = fetcher.fetch(filename).await?;
    tracing::debug!("EPUB file loaded, size: {} bytes", data.len());

    // Decompression and markup parsing are CPU-bound
    tokio::task::spawn_blocking(move || parse_book(&data))
        .await
        .map_err(|e| EpubError::Interrupted(format!("Task join error: {}", e)))?
}

/// Parse an in-memory EPUB into chapters.
pub fn parse_book(data: &[u8]) -> Result<LoadedBook, EpubError> {
    let archive = ArchiveReader::open(data)?;
    tracing::debug!("ZIP parsed, entries: {}", archive.len());

    let location = locate_package(&archive)?;
    tracing::debug!("OPF path: {}", location.path);

    let opf = archive.read_entry_as_text(&location.path).map_err(|e| match e {
        EntryError::NotFound(_) => EpubError::InvalidPackage("OPF file not found".to_string()),
        EntryError::Decode(path) => {
            EpubError::InvalidPackage(format!("OPF file {} could not be decoded", path))
        }
    })?;
    let package = parse_package(&opf)?;
    tracing::debug!(
        "Spine items: {}, manifest items: {}",
        package.spine.len(),
        package.manifest.len()
    );

    let chapters = extract_chapters(&archive, &package, &location);
    tracing::info!("Extracted chapters: {}", chapters.len());

    if chapters.is_empty() {
        return Err(EpubError::NoReadableContent);
    }

    Ok(LoadedBook {
        metadata: package.metadata,
        chapters,
    })
}
