//! Application state management

use std::sync::Arc;

use crate::epub::ArchiveFetcher;
use crate::library::Catalog;
use crate::reader::SessionStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    catalog: Catalog,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(catalog: Catalog, sessions: SessionStore) -> Self {
        Self {
            inner: Arc::new(AppStateInner { catalog, sessions }),
        }
    }

    /// Get the book catalog
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get the reading sessions
    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    /// Get the fetcher books are loaded through
    pub fn fetcher(&self) -> &Arc<dyn ArchiveFetcher> {
        self.inner.sessions.fetcher()
    }
}
