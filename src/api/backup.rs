use crate::api::positions::{book_response, BookResponse};
use crate::api::AppState;
use crate::domain::Backup;
use crate::error::AppError;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::info;

/// Export both collections as a backup file.
///
/// The `ETag` is the SHA-256 of the body; a matching `If-None-Match` gets 304.
pub async fn export_backup(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let body = state.store.backup().await.to_json_pretty()?;
    let etag = format!("\"{}\"", Backup::digest(&body));

    let unchanged = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == etag);
    if unchanged {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
    }

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::ETAG, etag),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"positions-backup.json\"".to_string(),
            ),
        ],
        body,
    )
        .into_response())
}

/// Replace everything with an uploaded backup. Invalid files leave state untouched.
pub async fn import_backup(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<BookResponse>, AppError> {
    let backup = Backup::parse(&body)?;
    info!(
        open = backup.positions.len(),
        closed = backup.closed_positions.len(),
        "Importing backup"
    );

    let sync = state.store.import(backup).await;
    Ok(Json(book_response(&state, sync).await))
}
