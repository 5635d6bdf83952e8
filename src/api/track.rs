use crate::api::positions::PositionView;
use crate::api::AppState;
use crate::domain::{Address, Position};
use crate::engine::LifecycleError;
use crate::error::AppError;
use crate::store::SyncStatus;
use axum::extract::State;
use axum::Json;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub addresses: Vec<String>,
    /// Add the found positions to the open collection.
    #[serde(default)]
    pub adopt: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressResult {
    pub address: String,
    pub positions: Vec<PositionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub results: Vec<AddressResult>,
    pub adopted: usize,
    /// Positions already present under the same key.
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncStatus>,
}

/// Look up every address concurrently. Each address succeeds or fails on its own.
pub async fn track_addresses(
    State(state): State<AppState>,
    Json(request): Json<TrackRequest>,
) -> Result<Json<TrackResponse>, AppError> {
    let mut inputs: Vec<String> = Vec::new();
    for raw in request.addresses {
        let trimmed = raw.trim().to_string();
        if !trimmed.is_empty() && !inputs.contains(&trimmed) {
            inputs.push(trimmed);
        }
    }
    if inputs.is_empty() {
        return Err(AppError::BadRequest("at least one address is required".into()));
    }

    let lookups = inputs.iter().map(|raw| {
        let lookup = state.lookup.clone();
        async move {
            match Address::from_str(raw) {
                Ok(address) => {
                    debug!(address = %address, "Looking up positions");
                    lookup
                        .fetch_positions(&address)
                        .await
                        .map_err(|e| e.to_string())
                }
                Err(e) => Err(e.to_string()),
            }
        }
    });
    let outcomes: Vec<Result<Vec<Position>, String>> = join_all(lookups).await;

    let now = state.now();
    let locale = state.config.number_locale;
    let mut found: Vec<Position> = Vec::new();
    let mut results = Vec::with_capacity(inputs.len());
    for (raw, outcome) in inputs.into_iter().zip(outcomes) {
        match outcome {
            Ok(positions) => {
                found.extend(positions.iter().cloned());
                results.push(AddressResult {
                    address: raw,
                    positions: positions
                        .into_iter()
                        .enumerate()
                        .map(|(i, p)| PositionView::build(i, p, now, locale))
                        .collect(),
                    error: None,
                });
            }
            Err(error) => {
                warn!(address = %raw, error = %error, "Address lookup failed");
                results.push(AddressResult {
                    address: raw,
                    positions: Vec::new(),
                    error: Some(error),
                });
            }
        }
    }

    let (mut adopted, mut skipped, mut sync) = (0, 0, None);
    if request.adopt {
        for position in found {
            match state.store.apply(|book| book.add(position)).await {
                Ok(status) => {
                    adopted += 1;
                    sync = Some(status);
                }
                Err(LifecycleError::DuplicateKey(key)) => {
                    debug!(created = %key, "Tracked position already present");
                    skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(Json(TrackResponse {
        results,
        adopted,
        skipped,
        sync,
    }))
}
