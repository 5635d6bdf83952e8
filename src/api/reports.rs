use crate::api::AppState;
use crate::engine::reports::{filter_by_period, timeline, timeline_csv};
use crate::engine::{build_report, Report, ReportMetric, ReportPeriod};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub period: Option<String>,
    pub metric: Option<String>,
}

fn parse_period(raw: Option<&str>) -> Result<ReportPeriod, AppError> {
    raw.unwrap_or("30d").parse().map_err(AppError::BadRequest)
}

pub async fn get_report(
    Query(params): Query<ReportQuery>,
    State(state): State<AppState>,
) -> Result<Json<Report>, AppError> {
    let period = parse_period(params.period.as_deref())?;
    let metric: ReportMetric = params
        .metric
        .as_deref()
        .unwrap_or("pnl")
        .parse()
        .map_err(AppError::BadRequest)?;

    let book = state.store.book().await;
    Ok(Json(build_report(
        book.open(),
        book.closed(),
        period,
        metric,
        state.now(),
    )))
}

pub async fn get_timeline_csv(
    Query(params): Query<ReportQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let period = parse_period(params.period.as_deref())?;
    let all = state.store.book().await.all();
    let points = timeline(&filter_by_period(&all, period, state.now()));
    let body = timeline_csv(&points)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"timeline.csv\"",
            ),
        ],
        body,
    ))
}
