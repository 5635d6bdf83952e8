use crate::api::AppState;
use crate::store::SyncStatus;
use axum::extract::State;
use axum::Json;

pub async fn get_sync_status(State(state): State<AppState>) -> Json<SyncStatus> {
    Json(state.store.status())
}
