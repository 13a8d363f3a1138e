//! Session store
//!
//! Holds open reading sessions and drives their load pipelines on background
//! tasks. The map is bounded: opening a session past capacity evicts the
//! least recently used one.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::session::{LoadTicket, ReadingSession};
use crate::epub::{load_book, ArchiveFetcher};

/// Sessions kept when no capacity is configured
pub const DEFAULT_MAX_SESSIONS: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(n) => n,
    None => panic!("capacity must be non-zero"),
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("Session {0} can only be retried after a failed load")]
    NotFailed(Uuid),
}

/// Handle to a load started by the store
pub struct LoadHandle {
    pub session_id: Uuid,
    task: JoinHandle<()>,
}

impl LoadHandle {
    /// Wait until the load has been committed (or discarded)
    pub async fn finished(self) {
        if let Err(e) = self.task.await {
            tracing::error!("Load task for session {} panicked: {}", self.session_id, e);
        }
    }
}

/// Thread-safe collection of reading sessions
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<LruCache<Uuid, ReadingSession>>>,
    fetcher: Arc<dyn ArchiveFetcher>,
}

impl SessionStore {
    pub fn new(fetcher: Arc<dyn ArchiveFetcher>) -> Self {
        Self::with_capacity(fetcher, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_capacity(fetcher: Arc<dyn ArchiveFetcher>, max_sessions: NonZeroUsize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(LruCache::new(max_sessions))),
            fetcher,
        }
    }

    pub fn fetcher(&self) -> &Arc<dyn ArchiveFetcher> {
        &self.fetcher
    }

    /// Open a new session on `filename` and start loading it
    pub async fn open(&self, filename: &str) -> LoadHandle {
        let id = Uuid::new_v4();
        let (session, ticket) = ReadingSession::open(filename);

        {
            let mut sessions = self.sessions.write().await;
            if let Some((evicted, old)) = sessions.push(id, session) {
                if evicted != id {
                    tracing::info!("Evicted idle session {} ({})", evicted, old.filename());
                }
            }
        }

        tracing::info!("Opened session {} for {}", id, filename);
        self.spawn_load(id, ticket)
    }

    /// Open a different book in an existing session. The latest request wins.
    pub async fn reopen(&self, id: Uuid, filename: &str) -> Result<LoadHandle, SessionError> {
        let ticket = {
            let mut sessions = self.sessions.write().await;
            let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
            session.begin(filename)
        };

        Ok(self.spawn_load(id, ticket))
    }

    /// Re-run the whole pipeline for a failed session
    pub async fn retry(&self, id: Uuid) -> Result<LoadHandle, SessionError> {
        let ticket = {
            let mut sessions = self.sessions.write().await;
            let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
            session.retry().ok_or(SessionError::NotFailed(id))?
        };

        tracing::info!("Retrying session {} ({})", id, ticket.filename);
        Ok(self.spawn_load(id, ticket))
    }

    /// Read a session. Reading counts as use for eviction.
    pub async fn with_session<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&ReadingSession) -> R,
    ) -> Result<R, SessionError> {
        let mut sessions = self.sessions.write().await;
        sessions
            .get(&id)
            .map(|session| f(session))
            .ok_or(SessionError::NotFound(id))
    }

    /// Mutate a session
    pub async fn update<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ReadingSession) -> R,
    ) -> Result<R, SessionError> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(&id).map(f).ok_or(SessionError::NotFound(id))
    }

    /// Abandon a session. Loads still in flight for it are discarded.
    pub async fn close(&self, id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.pop(&id).is_some();
        if removed {
            tracing::info!("Closed session {}", id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    fn spawn_load(&self, id: Uuid, ticket: LoadTicket) -> LoadHandle {
        let sessions = Arc::clone(&self.sessions);
        let fetcher = Arc::clone(&self.fetcher);

        let task = tokio::spawn(async move {
            let result = load_book(fetcher.as_ref(), &ticket.filename).await;

            let mut sessions = sessions.write().await;
            match sessions.peek_mut(&id) {
                Some(session) => {
                    session.complete(&ticket, result);
                }
                None => tracing::debug!("Session {} was closed before its load finished", id),
            }
        });

        LoadHandle {
            session_id: id,
            task,
        }
    }
}
