use crate::api::{parse_scope, AppState};
use crate::domain::{DisplayMetric, Horizon, Scope};
use crate::engine::{dashboard_cards, summarize, PortfolioSummary};
use crate::error::AppError;
use crate::format::format_metric;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub scope: Option<String>,
    pub yield_period: Option<String>,
    pub fee_period: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDto {
    #[serde(flatten)]
    pub metric: DisplayMetric,
    pub display: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub scope: Scope,
    pub summary: PortfolioSummary,
    pub cards: Vec<CardDto>,
}

fn parse_horizon(raw: Option<&str>, default: Horizon) -> Result<Horizon, AppError> {
    match raw {
        None => Ok(default),
        Some(s) => s.parse().map_err(AppError::BadRequest),
    }
}

pub async fn get_summary(
    Query(params): Query<SummaryQuery>,
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, AppError> {
    let scope = parse_scope(params.scope.as_deref())?;
    let yield_period = parse_horizon(params.yield_period.as_deref(), Horizon::Annual)?;
    let fee_period = parse_horizon(params.fee_period.as_deref(), Horizon::Monthly)?;

    let positions = state.store.positions(scope).await;
    let summary = summarize(&positions, state.now(), yield_period, fee_period);
    let locale = state.config.number_locale;
    let cards = dashboard_cards(&summary)
        .into_iter()
        .map(|metric| CardDto {
            display: format_metric(&metric, locale),
            metric,
        })
        .collect();

    Ok(Json(SummaryResponse {
        scope,
        summary,
        cards,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_horizon() {
        assert_eq!(parse_horizon(None, Horizon::Monthly).unwrap(), Horizon::Monthly);
        assert_eq!(parse_horizon(Some("weekly"), Horizon::Monthly).unwrap(), Horizon::Weekly);
        assert!(parse_horizon(Some("hourly"), Horizon::Annual).is_err());
    }
}
