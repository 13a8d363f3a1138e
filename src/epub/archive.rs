//! ZIP archive access
//!
//! Opens the fetched payload and indexes every file entry by its exact
//! internal path. Entries are only decompressed when read, so a damaged
//! entry fails on its own.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

/// Per-entry failures. These never abort a load on their own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry could not be decoded: {0}")]
    Decode(String),
}

/// Lazily decompressing view of an EPUB archive
pub struct ArchiveReader<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    /// File entry path -> index in the central directory
    index: HashMap<String, usize>,
}

impl<'a> ArchiveReader<'a> {
    /// Interpret `data` as a ZIP archive. Only the central directory is read.
    pub fn open(data: &'a [u8]) -> Result<Self, ZipError> {
        let archive = ZipArchive::new(Cursor::new(data))?;

        let index = archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .filter_map(|name| archive.index_for_name(name).map(|i| (name.to_string(), i)))
            .collect();

        Ok(Self { archive, index })
    }

    /// Number of file entries
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn has_entry(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Decompressed bytes of an entry. Checksum, compression and I/O
    /// failures surface as [`EntryError::Decode`].
    pub fn read_entry(&self, path: &str) -> Result<Vec<u8>, EntryError> {
        let index = *self
            .index
            .get(path)
            .ok_or_else(|| EntryError::NotFound(path.to_string()))?;

        let decode_error = |e: &dyn std::fmt::Display| {
            tracing::debug!("Failed to decompress {}: {}", path, e);
            EntryError::Decode(path.to_string())
        };

        // The clone shares the parsed central directory and only copies the cursor.
        let mut archive = self.archive.clone();
        let mut file = archive.by_index(index).map_err(|e| decode_error(&e))?;

        let mut content = Vec::new();
        file.read_to_end(&mut content).map_err(|e| decode_error(&e))?;
        Ok(content)
    }

    /// Decode an entry as UTF-8 text, dropping a leading byte order mark.
    pub fn read_entry_as_text(&self, path: &str) -> Result<String, EntryError> {
        let mut bytes = self.read_entry(path)?;
        if bytes.starts_with(b"\xEF\xBB\xBF") {
            bytes.drain(..3);
        }
        String::from_utf8(bytes).map_err(|_| EntryError::Decode(path.to_string()))
    }
}
