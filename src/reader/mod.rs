//! Reading view state
//!
//! Sessions own a book's realized chapter list and the reader's position in
//! it; the store keeps them alive between requests.

mod session;
mod settings;
mod store;

pub use session::{LoadStatus, LoadTicket, Navigation, ReadingSession};
pub use settings::{ReaderSettings, ZoomAction, DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
pub use store::{LoadHandle, SessionError, SessionStore, DEFAULT_MAX_SESSIONS};
