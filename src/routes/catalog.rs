//! Catalog API endpoints
//!
//! - List and filter books
//! - Get one book record
//! - List categories
//! - Download the raw EPUB (direct-download fallback for failed loads)

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::library::{BookRecord, Category};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BookQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub q: Option<String>,
}

/// Response for book list
#[derive(Serialize)]
pub struct BookListResponse {
    pub books: Vec<BookRecord>,
    /// Matches before `limit` was applied
    pub total: usize,
}

/// Create the catalog router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/books", get(list_books))
        .route("/books/:id", get(get_book))
        .route("/books/:id/download", get(download_book))
        .route("/categories", get(list_categories))
}

/// Path of the download route for a book
pub fn download_path(book_id: u64) -> String {
    format!("/api/v1/catalog/books/{}/download", book_id)
}

async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> Result<Json<BookListResponse>> {
    if query.limit == Some(0) {
        return Err(AppError::BadRequest("limit must be positive".to_string()));
    }

    let matches = state
        .catalog()
        .filter(query.category.as_deref(), query.q.as_deref());
    let total = matches.len();

    let books = matches
        .into_iter()
        .take(query.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();

    Ok(Json(BookListResponse { books, total }))
}

async fn get_book(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<BookRecord>> {
    state
        .catalog()
        .get(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", id)))
}

async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Json<Vec<Category>> {
    let categories = match query.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => state.catalog().search_categories(q),
        _ => state.catalog().categories().iter().collect(),
    };

    Json(categories.into_iter().cloned().collect())
}

async fn download_book(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Response> {
    let book = state
        .catalog()
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", id)))?;

    let data = state.fetcher().fetch(&book.filename).await?;
    tracing::debug!("Serving download of {} ({} bytes)", book.filename, data.len());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/epub+zip")
        .header(header::CONTENT_LENGTH, data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename*=UTF-8''{}",
                urlencoding::encode(&book.filename)
            ),
        )
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}
