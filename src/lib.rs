//! Deen Reader
//!
//! Library server for a catalog of Islamic EPUB books: turns each EPUB into
//! an ordered list of sanitized chapters and serves a navigable reading view
//! over HTTP.

use axum::Router;

pub mod config;
pub mod epub;
pub mod error;
pub mod html;
pub mod library;
pub mod reader;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/health", routes::health::router())
        .nest("/api/v1/health", routes::health::router())
        .nest("/api/v1/catalog", routes::catalog::router())
        .nest("/api/v1/sessions", routes::sessions::router())
        .with_state(state)
}
