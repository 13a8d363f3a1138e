//! Reading session state machine
//!
//! `Loading -> Ready | Failed(reason)`, `Failed -> Loading` on retry. Every
//! load is stamped with a [`LoadTicket`]; a completion carrying a ticket that
//! is no longer current belongs to a superseded load and is ignored.

use serde::{Deserialize, Serialize};

use super::settings::ReaderSettings;
use crate::epub::{Chapter, EpubError, LoadedBook, PackageMetadata};

/// Load status of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum LoadStatus {
    Loading,
    Ready,
    Failed(String),
}

/// Token identifying one load request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub filename: String,
    generation: u64,
}

/// Navigation requests from the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Navigation {
    Next,
    Previous,
    First,
    Last,
    GoTo { index: usize },
}

/// One open book in the reading view
#[derive(Debug, Clone)]
pub struct ReadingSession {
    filename: String,
    generation: u64,
    status: LoadStatus,
    metadata: PackageMetadata,
    chapters: Vec<Chapter>,
    current_index: usize,
    settings: ReaderSettings,
}

impl ReadingSession {
    /// Create a session and start loading `filename`
    pub fn open(filename: impl Into<String>) -> (Self, LoadTicket) {
        let mut session = Self {
            filename: String::new(),
            generation: 0,
            status: LoadStatus::Loading,
            metadata: PackageMetadata::default(),
            chapters: Vec::new(),
            current_index: 0,
            settings: ReaderSettings::default(),
        };
        let ticket = session.begin(filename);
        (session, ticket)
    }

    /// Start a fresh load, discarding everything from earlier loads.
    /// Any in-flight load is superseded.
    pub fn begin(&mut self, filename: impl Into<String>) -> LoadTicket {
        self.filename = filename.into();
        self.generation += 1;
        self.status = LoadStatus::Loading;
        self.metadata = PackageMetadata::default();
        self.chapters.clear();
        self.current_index = 0;

        tracing::debug!(
            "Session loading {} (generation {})",
            self.filename,
            self.generation
        );

        LoadTicket {
            filename: self.filename.clone(),
            generation: self.generation,
        }
    }

    /// Restart the pipeline for the same book. Only valid from `Failed`.
    pub fn retry(&mut self) -> Option<LoadTicket> {
        match self.status {
            LoadStatus::Failed(_) => {
                let filename = self.filename.clone();
                Some(self.begin(filename))
            }
            _ => None,
        }
    }

    /// Whether `ticket` belongs to the load this session is waiting on
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.status == LoadStatus::Loading
            && ticket.generation == self.generation
            && ticket.filename == self.filename
    }

    /// Commit the outcome of a load. Returns `false` when the outcome
    /// belongs to a superseded load and was dropped.
    pub fn complete(&mut self, ticket: &LoadTicket, result: Result<LoadedBook, EpubError>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                "Ignoring superseded load of {} (generation {})",
                ticket.filename,
                ticket.generation
            );
            return false;
        }

        match result {
            Ok(book) if !book.chapters.is_empty() => {
                tracing::info!(
                    "EPUB loaded: {} ({} chapters)",
                    self.filename,
                    book.chapters.len()
                );
                self.metadata = book.metadata;
                self.chapters = book.chapters;
                self.current_index = 0;
                self.status = LoadStatus::Ready;
            }
            Ok(_) => self.fail(EpubError::NoReadableContent),
            Err(e) => self.fail(e),
        }
        true
    }

    fn fail(&mut self, error: EpubError) {
        tracing::warn!("Failed to load EPUB {}: {}", self.filename, error);
        self.chapters.clear();
        self.current_index = 0;
        self.status = LoadStatus::Failed(error.to_string());
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn is_ready(&self) -> bool {
        self.status == LoadStatus::Ready
    }

    pub fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Active chapter, when ready
    pub fn current_chapter(&self) -> Option<&Chapter> {
        if self.is_ready() {
            self.chapters.get(self.current_index)
        } else {
            None
        }
    }

    /// 1-based position and total, when ready
    pub fn position(&self) -> Option<(usize, usize)> {
        self.current_chapter()
            .map(|_| (self.current_index + 1, self.chapters.len()))
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ReaderSettings {
        &mut self.settings
    }

    pub fn next(&mut self) {
        if self.is_ready() && self.current_index + 1 < self.chapters.len() {
            self.current_index += 1;
        }
    }

    pub fn previous(&mut self) {
        if self.is_ready() && self.current_index > 0 {
            self.current_index -= 1;
        }
    }

    /// Jump to `index`; out-of-range requests are ignored.
    pub fn go_to(&mut self, index: usize) {
        if self.is_ready() && index < self.chapters.len() {
            self.current_index = index;
        }
    }

    pub fn first(&mut self) {
        if self.is_ready() {
            self.current_index = 0;
        }
    }

    pub fn last(&mut self) {
        if self.is_ready() {
            self.current_index = self.chapters.len().saturating_sub(1);
        }
    }

    pub fn navigate(&mut self, navigation: Navigation) {
        match navigation {
            Navigation::Next => self.next(),
            Navigation::Previous => self.previous(),
            Navigation::First => self.first(),
            Navigation::Last => self.last(),
            Navigation::GoTo { index } => self.go_to(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::fixtures::EpubBuilder;
    use crate::epub::parse_book;

    fn book(n: usize) -> LoadedBook {
        LoadedBook {
            metadata: PackageMetadata::default(),
            chapters: (0..n)
                .map(|i| Chapter {
                    id: format!("c{}", i),
                    title: format!("Chapter {}", i + 1),
                    content: format!("<p>{}</p>", i),
                })
                .collect(),
        }
    }

    fn ready(n: usize) -> ReadingSession {
        let (mut session, ticket) = ReadingSession::open("book.epub");
        assert!(session.complete(&ticket, Ok(book(n))));
        session
    }

    #[test]
    fn test_ready_starts_at_first_chapter() {
        let session = ready(3);
        assert_eq!(session.status(), &LoadStatus::Ready);
        assert_eq!(session.chapters().len(), 3);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.position(), Some((1, 3)));
        assert_eq!(session.current_chapter().unwrap().id, "c0");
    }

    #[test]
    fn test_boundary_navigation_is_noop() {
        let mut session = ready(3);
        session.previous();
        assert_eq!(session.current_index(), 0);

        session.last();
        assert_eq!(session.current_index(), 2);
        session.next();
        assert_eq!(session.current_index(), 2);

        session.first();
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn test_go_to_out_of_range_is_ignored() {
        let mut session = ready(3);
        session.go_to(1);
        assert_eq!(session.current_index(), 1);
        session.go_to(3);
        assert_eq!(session.current_index(), 1);
        session.go_to(usize::MAX);
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn test_navigation_sequences_stay_in_bounds() {
        let steps = [
            Navigation::Next,
            Navigation::Next,
            Navigation::Next,
            Navigation::Next,
            Navigation::GoTo { index: 7 },
            Navigation::Previous,
            Navigation::GoTo { index: 0 },
            Navigation::Previous,
            Navigation::Last,
            Navigation::Next,
            Navigation::First,
            Navigation::GoTo { index: 4 },
        ];

        for len in 1..=5 {
            let mut session = ready(len);
            for step in steps {
                session.navigate(step);
                assert!(session.current_index() < len, "{step:?} with {len} chapters");
            }
        }
    }

    #[test]
    fn test_navigation_ignored_while_loading() {
        let (mut session, _ticket) = ReadingSession::open("book.epub");
        session.next();
        session.last();
        session.go_to(2);
        assert_eq!(session.current_index(), 0);
        assert!(session.current_chapter().is_none());
        assert!(session.position().is_none());
    }

    #[test]
    fn test_failure_carries_reason() {
        let (mut session, ticket) = ReadingSession::open("book.epub");
        session.complete(
            &ticket,
            Err(EpubError::InvalidContainer("container.xml not found".to_string())),
        );

        assert_eq!(
            session.status(),
            &LoadStatus::Failed("Invalid EPUB: container.xml not found".to_string())
        );
        assert!(session.chapters().is_empty());
    }

    #[test]
    fn test_empty_book_fails() {
        let (mut session, ticket) = ReadingSession::open("book.epub");
        session.complete(&ticket, Ok(book(0)));

        assert_eq!(
            session.status(),
            &LoadStatus::Failed("No readable content found in this EPUB file".to_string())
        );
    }

    #[test]
    fn test_superseded_completion_is_ignored() {
        let (mut session, first) = ReadingSession::open("first.epub");
        let second = session.begin("second.epub");

        assert!(!session.complete(&first, Ok(book(5))));
        assert_eq!(session.status(), &LoadStatus::Loading);

        assert!(session.complete(&second, Ok(book(2))));
        assert_eq!(session.chapters().len(), 2);
        assert_eq!(session.filename(), "second.epub");
    }

    #[test]
    fn test_late_completion_after_ready_is_ignored() {
        let (mut session, ticket) = ReadingSession::open("book.epub");
        assert!(session.complete(&ticket, Ok(book(2))));
        assert!(!session.complete(&ticket, Err(EpubError::NoReadableContent)));
        assert!(session.is_ready());
    }

    #[test]
    fn test_retry_only_from_failed() {
        let mut session = ready(2);
        assert!(session.retry().is_none());

        let (mut session, ticket) = ReadingSession::open("book.epub");
        assert!(session.retry().is_none());
        session.complete(&ticket, Err(EpubError::NoReadableContent));

        let retry = session.retry().unwrap();
        assert_eq!(retry.filename, "book.epub");
        assert_eq!(session.status(), &LoadStatus::Loading);
        assert!(!session.is_current(&ticket));
        assert!(session.is_current(&retry));
    }

    #[test]
    fn test_retry_on_fixed_input_reaches_ready() {
        let broken = EpubBuilder::new().chapter("c1", "One", " ").build();
        let fixed = EpubBuilder::new().chapter("c1", "One", "<p>now</p>").build();

        let (mut session, ticket) = ReadingSession::open("book.epub");
        session.complete(&ticket, parse_book(&broken));
        assert!(matches!(session.status(), LoadStatus::Failed(_)));

        let retry = session.retry().unwrap();
        session.complete(&retry, parse_book(&fixed));
        assert!(session.is_ready());
        assert_eq!(session.current_chapter().unwrap().content, "<p>now</p>");
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(LoadStatus::Failed("boom".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({"state": "failed", "reason": "boom"}));

        let json = serde_json::to_value(LoadStatus::Ready).unwrap();
        assert_eq!(json, serde_json::json!({"state": "ready"}));
    }

    #[test]
    fn test_navigation_deserialization() {
        let nav: Navigation = serde_json::from_str(r#"{"action":"go_to","index":2}"#).unwrap();
        assert_eq!(nav, Navigation::GoTo { index: 2 });

        let nav: Navigation = serde_json::from_str(r#"{"action":"next"}"#).unwrap();
        assert_eq!(nav, Navigation::Next);
    }
}
