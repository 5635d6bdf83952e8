pub mod backup;
pub mod health;
pub mod positions;
pub mod reports;
pub mod summary;
pub mod sync;
pub mod track;

use crate::config::Config;
use crate::datasource::PositionLookup;
use crate::domain::Scope;
use crate::error::AppError;
use crate::store::PositionStore;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PositionStore>,
    pub lookup: Arc<dyn PositionLookup>,
    pub config: Config,
    clock: fn() -> DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Arc<PositionStore>, lookup: Arc<dyn PositionLookup>, config: Config) -> Self {
        Self {
            store,
            lookup,
            config,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock used for elapsed-time metrics.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/positions",
            get(positions::list_positions).post(positions::add_position),
        )
        .route(
            "/v1/positions/open/:index",
            put(positions::edit_position)
                .patch(positions::inline_edit_position)
                .delete(positions::remove_open_position),
        )
        .route(
            "/v1/positions/closed/:index",
            delete(positions::remove_closed_position),
        )
        .route(
            "/v1/positions/open/:index/duplicate",
            post(positions::duplicate_position),
        )
        .route("/v1/positions/open/:index/close", post(positions::close_position))
        .route(
            "/v1/positions/closed/:index/restore",
            post(positions::restore_position),
        )
        .route("/v1/summary", get(summary::get_summary))
        .route("/v1/reports", get(reports::get_report))
        .route("/v1/reports/timeline.csv", get(reports::get_timeline_csv))
        .route("/v1/backup", get(backup::export_backup).post(backup::import_backup))
        .route("/v1/track", post(track::track_addresses))
        .route("/v1/sync", get(sync::get_sync_status))
        .layer(cors)
        .with_state(state)
}

/// Parse an optional `scope` query value, defaulting to open.
pub(crate) fn parse_scope(raw: Option<&str>) -> Result<Scope, AppError> {
    match raw {
        None => Ok(Scope::Open),
        Some(s) => s.parse().map_err(AppError::BadRequest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scope() {
        assert_eq!(parse_scope(None).unwrap(), Scope::Open);
        assert_eq!(parse_scope(Some("closed")).unwrap(), Scope::Closed);
        assert!(matches!(parse_scope(Some("archived")), Err(AppError::BadRequest(_))));
    }
}
