use crate::api::{parse_scope, AppState};
use crate::domain::{CreatedKey, Decimal, InlineField, Position, Scope};
use crate::engine::{
    entry_position_pct, position_aprs, position_pnl, range_status, AprSet, RangeStatus,
};
use crate::error::AppError;
use crate::format::{format_age, format_currency, format_optional_percent, NumberLocale};
use crate::store::SyncStatus;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    pub scope: Option<String>,
}

/// A stored position plus everything derived from it for display.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    pub index: usize,
    #[serde(flatten)]
    pub position: Position,
    pub pnl: Decimal,
    pub apr: AprSet,
    pub range_status: RangeStatus,
    pub entry_position_pct: Option<Decimal>,
    pub formatted: FormattedPosition,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedPosition {
    pub invested: String,
    pub current: String,
    pub fees: String,
    pub pnl: String,
    pub apr_daily: String,
    pub apr_monthly: String,
    pub apr_annual: String,
    pub age: String,
}

impl PositionView {
    pub fn build(index: usize, position: Position, now: DateTime<Utc>, locale: NumberLocale) -> Self {
        let pnl = position_pnl(&position);
        let apr = position_aprs(&position, now);
        let formatted = FormattedPosition {
            invested: format_currency(position.invested, locale),
            current: format_currency(position.current, locale),
            fees: format_currency(position.fees(), locale),
            pnl: format_currency(pnl, locale),
            apr_daily: format_optional_percent(apr.daily),
            apr_monthly: format_optional_percent(apr.monthly),
            apr_annual: format_optional_percent(apr.annual),
            age: format_age(&position.created, now),
        };
        Self {
            index,
            range_status: range_status(&position),
            entry_position_pct: entry_position_pct(&position),
            position,
            pnl,
            apr,
            formatted,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    pub scope: Scope,
    pub positions: Vec<PositionView>,
    pub sync: SyncStatus,
}

/// Both collections after a mutation, with the outcome of the sync stage.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub positions: Vec<PositionView>,
    pub closed_positions: Vec<PositionView>,
    pub sync: SyncStatus,
}

/// Body for add and edit. `created` defaults to now on add and to the
/// existing key on edit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionInput {
    pub pool: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub dex: String,
    #[serde(default)]
    pub invested: Decimal,
    #[serde(default)]
    pub current: Decimal,
    #[serde(default)]
    pub collected: Decimal,
    #[serde(default)]
    pub uncollected: Decimal,
    #[serde(default)]
    pub range_min: Option<Decimal>,
    #[serde(default)]
    pub range_max: Option<Decimal>,
    #[serde(default)]
    pub entry_price: Option<Decimal>,
    #[serde(default)]
    pub created: Option<CreatedKey>,
    #[serde(default, rename = "observacoes")]
    pub notes: Option<String>,
    #[serde(default)]
    pub pool_url: Option<String>,
}

impl PositionInput {
    fn validate(&self) -> Result<(), AppError> {
        if self.pool.trim().is_empty() {
            return Err(AppError::BadRequest("pool is required".into()));
        }
        if let (Some(min), Some(max)) = (self.range_min, self.range_max) {
            if min > max {
                return Err(AppError::BadRequest("rangeMin must be <= rangeMax".into()));
            }
        }
        Ok(())
    }

    fn into_position(self, created: CreatedKey) -> Position {
        Position {
            pool: self.pool.trim().to_string(),
            network: self.network,
            dex: self.dex,
            invested: self.invested,
            current: self.current,
            collected: self.collected,
            uncollected: self.uncollected,
            range_min: self.range_min,
            range_max: self.range_max,
            entry_price: self.entry_price,
            current_price: None,
            created,
            is_tracked: false,
            is_simulated: false,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            pool_url: self.pool_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InlineEditRequest {
    pub field: InlineField,
    pub value: Decimal,
}

pub async fn list_positions(
    Query(params): Query<ScopeQuery>,
    State(state): State<AppState>,
) -> Result<Json<PositionsResponse>, AppError> {
    let scope = parse_scope(params.scope.as_deref())?;
    let now = state.now();
    let locale = state.config.number_locale;

    let positions = state
        .store
        .positions(scope)
        .await
        .into_iter()
        .enumerate()
        .map(|(i, p)| PositionView::build(i, p, now, locale))
        .collect();

    Ok(Json(PositionsResponse {
        scope,
        positions,
        sync: state.store.status(),
    }))
}

pub async fn add_position(
    State(state): State<AppState>,
    Json(input): Json<PositionInput>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    input.validate()?;
    let now = state.now();

    // An explicit key must be free; a defaulted one is bumped until it is.
    let sync = state
        .store
        .apply(|book| {
            let created = match input.created.clone() {
                Some(key) => key,
                None => book.fresh_key(now),
            };
            book.add(input.into_position(created))
        })
        .await?;
    Ok((StatusCode::CREATED, Json(book_response(&state, sync).await)))
}

pub async fn edit_position(
    Path(index): Path<usize>,
    State(state): State<AppState>,
    Json(input): Json<PositionInput>,
) -> Result<Json<BookResponse>, AppError> {
    input.validate()?;
    let fallback_key = CreatedKey::from_instant(state.now());

    let sync = state
        .store
        .apply(|book| {
            let created = input
                .created
                .clone()
                .or_else(|| book.open().get(index).map(|p| p.created.clone()))
                .unwrap_or(fallback_key);
            book.edit(index, input.into_position(created))
        })
        .await?;
    Ok(Json(book_response(&state, sync).await))
}

pub async fn inline_edit_position(
    Path(index): Path<usize>,
    State(state): State<AppState>,
    Json(request): Json<InlineEditRequest>,
) -> Result<Json<BookResponse>, AppError> {
    let sync = state
        .store
        .apply(|book| book.inline_edit(index, request.field, request.value))
        .await?;
    Ok(Json(book_response(&state, sync).await))
}

pub async fn duplicate_position(
    Path(index): Path<usize>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let now = state.now();
    let sync = state.store.apply(|book| book.duplicate(index, now)).await?;
    Ok((StatusCode::CREATED, Json(book_response(&state, sync).await)))
}

pub async fn close_position(
    Path(index): Path<usize>,
    State(state): State<AppState>,
) -> Result<Json<BookResponse>, AppError> {
    let sync = state.store.apply(|book| book.close(index)).await?;
    Ok(Json(book_response(&state, sync).await))
}

pub async fn restore_position(
    Path(index): Path<usize>,
    State(state): State<AppState>,
) -> Result<Json<BookResponse>, AppError> {
    let sync = state.store.apply(|book| book.restore(index)).await?;
    Ok(Json(book_response(&state, sync).await))
}

pub async fn remove_open_position(
    Path(index): Path<usize>,
    State(state): State<AppState>,
) -> Result<Json<BookResponse>, AppError> {
    let sync = state.store.apply(|book| book.remove(Scope::Open, index)).await?;
    Ok(Json(book_response(&state, sync).await))
}

pub async fn remove_closed_position(
    Path(index): Path<usize>,
    State(state): State<AppState>,
) -> Result<Json<BookResponse>, AppError> {
    let sync = state.store.apply(|book| book.remove(Scope::Closed, index)).await?;
    Ok(Json(book_response(&state, sync).await))
}

pub(crate) async fn book_response(state: &AppState, sync: SyncStatus) -> BookResponse {
    let book = state.store.book().await;
    let now = state.now();
    let locale = state.config.number_locale;
    let views = |positions: &[Position]| -> Vec<PositionView> {
        positions
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, p)| PositionView::build(i, p, now, locale))
            .collect()
    };
    BookResponse {
        positions: views(book.open()),
        closed_positions: views(book.closed()),
        sync,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_position_view_formats_scenario() {
        let now = Utc.with_ymd_and_hms(2025, 1, 11, 0, 0, 0).unwrap();
        let mut p = Position::new("ETH/USDC", CreatedKey::new("2025-01-01T00:00:00.000Z"));
        p.invested = Decimal::from_i64(1000);
        p.current = Decimal::from_i64(1050);
        p.collected = Decimal::from_i64(20);
        p.uncollected = Decimal::from_i64(5);

        let view = PositionView::build(0, p, now, NumberLocale::EnUs);
        assert_eq!(view.pnl, Decimal::from_i64(75));
        assert_eq!(view.formatted.pnl, "$75.00");
        assert_eq!(view.formatted.apr_annual, "273.75%");
        assert_eq!(view.formatted.age, "10d 0h");
        assert_eq!(view.range_status, RangeStatus::Unknown);
    }

    #[test]
    fn test_zero_invested_renders_sentinel() {
        let now = Utc.with_ymd_and_hms(2025, 1, 11, 0, 0, 0).unwrap();
        let p = Position::new("Airdrop", CreatedKey::new("2025-01-01T00:00:00.000Z"));
        let view = PositionView::build(3, p, now, NumberLocale::EnUs);
        assert_eq!(view.index, 3);
        assert_eq!(view.apr.annual, None);
        assert_eq!(view.formatted.apr_daily, "-");
    }

    #[test]
    fn test_input_validation() {
        let input: PositionInput = serde_json::from_value(serde_json::json!({
            "pool": "ETH/USDC",
            "rangeMin": 2200,
            "rangeMax": 1800
        }))
        .unwrap();
        assert!(matches!(input.validate(), Err(AppError::BadRequest(_))));

        let input: PositionInput = serde_json::from_value(serde_json::json!({ "pool": "  " })).unwrap();
        assert!(input.validate().is_err());
    }
}
