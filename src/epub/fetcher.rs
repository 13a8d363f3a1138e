//! Archive fetching
//!
//! Retrieves the raw EPUB payload for a catalog filename, either from a
//! remote books directory over HTTP or from a local directory.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    /// Non-success response (HTTP status, or its local equivalent)
    #[error("{0}")]
    Status(u16),

    #[error("{0}")]
    Transport(String),

    #[error("invalid book filename: {0}")]
    InvalidName(String),
}

impl FetchError {
    /// HTTP-like status code, when the failure carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status(code) => Some(*code),
            FetchError::InvalidName(_) => Some(400),
            FetchError::Transport(_) => None,
        }
    }
}

/// Source of EPUB payloads. No retries happen at this level.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Fetch the complete binary for `filename`
    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, FetchError>;

    /// Location a client can download `filename` from directly, if any
    fn location(&self, filename: &str) -> String;
}

/// Fetches books from `<base_url>/<filename>`
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ArchiveFetcher for HttpFetcher {
    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.location(filename);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    fn location(&self, filename: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(filename))
    }
}

/// Reads books from a local directory
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, filename: &str) -> Result<PathBuf, FetchError> {
        let relative = Path::new(filename);
        let is_plain = !filename.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !is_plain {
            return Err(FetchError::InvalidName(filename.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArchiveFetcher for DirFetcher {
    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(filename)?;

        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::Status(404),
            std::io::ErrorKind::PermissionDenied => FetchError::Status(403),
            _ => FetchError::Transport(e.to_string()),
        })
    }

    fn location(&self, filename: &str) -> String {
        self.root.join(filename).display().to_string()
    }
}
