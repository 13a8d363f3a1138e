//! Reading session endpoints
//!
//! A session is the reading view for one book: its load status, the active
//! chapter and the reader's zoom level.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::download_path;
use crate::error::{AppError, Result};
use crate::library::{BookRecord, Catalog};
use crate::reader::{LoadStatus, Navigation, ReadingSession, ZoomAction};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OpenBookRequest {
    pub book_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct ZoomRequest {
    pub action: ZoomAction,
}

#[derive(Debug, Serialize)]
pub struct Position {
    /// 1-based
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ChapterView {
    pub index: usize,
    pub id: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct TocEntry {
    pub index: usize,
    pub id: String,
    pub title: String,
}

/// Everything the reading view renders
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub filename: String,
    pub status: LoadStatus,
    pub title: Option<String>,
    pub position: Option<Position>,
    pub chapter: Option<ChapterView>,
    pub zoom: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl SessionView {
    fn new(id: Uuid, session: &ReadingSession, catalog: &Catalog, fetcher_location: String) -> Self {
        let download_url = match session.status() {
            LoadStatus::Failed(_) => Some(
                catalog
                    .books()
                    .iter()
                    .find(|book| book.filename == session.filename())
                    .map(|book| download_path(book.id))
                    .unwrap_or(fetcher_location),
            ),
            _ => None,
        };

        Self {
            id,
            filename: session.filename().to_string(),
            status: session.status().clone(),
            title: session.metadata().title.clone(),
            position: session
                .position()
                .map(|(current, total)| Position { current, total }),
            chapter: session.current_chapter().map(|chapter| ChapterView {
                index: session.current_index(),
                id: chapter.id.clone(),
                title: chapter.title.clone(),
                content: chapter.content.clone(),
            }),
            zoom: session.settings().zoom,
            download_url,
        }
    }
}

/// Create the sessions router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/:id", get(get_session).delete(close_session))
        .route("/:id/book", put(change_book))
        .route("/:id/retry", post(retry_session))
        .route("/:id/navigate", post(navigate))
        .route("/:id/zoom", post(zoom))
        .route("/:id/chapters", get(list_chapters))
}

fn find_book(state: &AppState, book_id: u64) -> Result<&BookRecord> {
    state
        .catalog()
        .get(book_id)
        .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", book_id)))
}

async fn session_view(state: &AppState, id: Uuid) -> Result<SessionView> {
    let catalog = state.catalog();
    let fetcher = state.fetcher();
    let view = state
        .sessions()
        .with_session(id, |session| {
            SessionView::new(id, session, catalog, fetcher.location(session.filename()))
        })
        .await?;
    Ok(view)
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<OpenBookRequest>,
) -> Result<(StatusCode, Json<SessionView>)> {
    let book = find_book(&state, request.book_id)?;
    let handle = state.sessions().open(&book.filename).await;

    let view = session_view(&state, handle.session_id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SessionView>> {
    Ok(Json(session_view(&state, id).await?))
}

async fn change_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<OpenBookRequest>,
) -> Result<Json<SessionView>> {
    let book = find_book(&state, request.book_id)?;
    state.sessions().reopen(id, &book.filename).await?;

    Ok(Json(session_view(&state, id).await?))
}

async fn retry_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SessionView>> {
    state.sessions().retry(id).await?;
    Ok(Json(session_view(&state, id).await?))
}

async fn navigate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(navigation): Json<Navigation>,
) -> Result<Json<SessionView>> {
    state
        .sessions()
        .update(id, |session| session.navigate(navigation))
        .await?;
    Ok(Json(session_view(&state, id).await?))
}

async fn zoom(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ZoomRequest>,
) -> Result<Json<SessionView>> {
    state
        .sessions()
        .update(id, |session| session.settings_mut().apply(request.action))
        .await?;
    Ok(Json(session_view(&state, id).await?))
}

async fn close_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    if state.sessions().close(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session not found: {}", id)))
    }
}

async fn list_chapters(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Vec<TocEntry>>> {
    let toc = state
        .sessions()
        .with_session(id, |session| {
            session
                .chapters()
                .iter()
                .enumerate()
                .map(|(index, chapter)| TocEntry {
                    index,
                    id: chapter.id.clone(),
                    title: chapter.title.clone(),
                })
                .collect::<Vec<_>>()
        })
        .await?;
    Ok(Json(toc))
}
