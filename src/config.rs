//! Configuration management for Deen Reader

use std::env;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::epub::{ArchiveFetcher, DirFetcher, HttpFetcher};
use crate::reader::DEFAULT_MAX_SESSIONS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
    pub library: LibraryConfig,
    pub reader: ReaderConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Where EPUB files are fetched from
    pub source: BookSource,
    /// Books manifest (JSON array of records)
    pub catalog_path: PathBuf,
    /// Optional JSON array of category names
    pub categories_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Open sessions kept before the least recently used is evicted
    pub max_sessions: NonZeroUsize,
}

/// The books-directory prefix catalog filenames are joined to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookSource {
    Remote(String),
    Local(PathBuf),
}

impl BookSource {
    /// Build the fetcher books are loaded through
    pub fn fetcher(&self) -> Arc<dyn ArchiveFetcher> {
        match self {
            BookSource::Remote(url) => Arc::new(HttpFetcher::new(url.clone())),
            BookSource::Local(dir) => Arc::new(DirFetcher::new(dir.clone())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BOOKS_URL must be an http(s) URL, got {0}")]
    InvalidBooksUrl(String),

    #[error("SERVER_PORT must be a port number, got {0}")]
    InvalidPort(String),

    #[error("MAX_SESSIONS must be a positive number, got {0}")]
    InvalidMaxSessions(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            library: LibraryConfig {
                source: BookSource::Local(PathBuf::from("./epubs")),
                catalog_path: PathBuf::from("./epubs/manifest.json"),
                categories_path: None,
            },
            reader: ReaderConfig {
                max_sessions: DEFAULT_MAX_SESSIONS,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any variable lookup
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let port = match var("SERVER_PORT") {
            Some(port) => port.parse().map_err(|_| ConfigError::InvalidPort(port))?,
            None => defaults.server.port,
        };

        let max_sessions = match var("MAX_SESSIONS") {
            Some(max) => max
                .parse()
                .map_err(|_| ConfigError::InvalidMaxSessions(max))?,
            None => defaults.reader.max_sessions,
        };

        let source = match (var("BOOKS_URL"), var("BOOKS_DIR")) {
            (Some(url), _) => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::InvalidBooksUrl(url));
                }
                BookSource::Remote(url)
            }
            (None, Some(dir)) => BookSource::Local(PathBuf::from(dir)),
            (None, None) => defaults.library.source,
        };

        Ok(Config {
            server: ServerConfig {
                host: var("SERVER_HOST").unwrap_or(defaults.server.host),
                port,
            },
            library: LibraryConfig {
                source,
                catalog_path: var("CATALOG_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.library.catalog_path),
                categories_path: var("CATEGORIES_PATH").map(PathBuf::from),
            },
            reader: ReaderConfig { max_sessions },
        })
    }
}
