use crate::api::AppState;
use axum::extract::State;
use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the store has been loaded; reports the last sync outcome.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let book = state.store.book().await;
    Json(serde_json::json!({
        "status": "ready",
        "sync": state.store.status(),
        "open": book.open().len(),
        "closed": book.closed().len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_returns_ok() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }
}
