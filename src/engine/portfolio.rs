//! Portfolio aggregates over an arbitrary slice of positions.

use crate::domain::{Decimal, DisplayMetric, Horizon, Position};
use crate::engine::metrics::{elapsed_days, position_pnl, scale_daily_rate};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Plain sums over a set of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTotals {
    pub total_current_value: Decimal,
    pub total_invested: Decimal,
    pub total_fees: Decimal,
    pub total_pnl: Decimal,
    pub count: usize,
}

pub fn totals(positions: &[Position]) -> PortfolioTotals {
    positions
        .iter()
        .fold(PortfolioTotals::default(), |mut acc, p| {
            acc.total_current_value += p.current;
            acc.total_invested += p.invested;
            acc.total_fees += p.fees();
            acc.total_pnl += position_pnl(p);
            acc.count += 1;
            acc
        })
}

/// Dollar-time weighted APR in percent over `horizon`.
///
/// Only positions with `invested > 0` take part; each one is weighted by
/// `invested x elapsed_days`. Returns None when no position has capital or an
/// intermediate sum leaves the decimal range.
pub fn weighted_apr(positions: &[Position], now: DateTime<Utc>, horizon: Horizon) -> Option<Decimal> {
    let mut weighted_days = Decimal::zero();
    let mut invested_sum = Decimal::zero();
    let mut pnl_sum = Decimal::zero();

    for p in positions.iter().filter(|p| p.invested.is_positive()) {
        let dollar_days = elapsed_days(p, now).checked_mul(p.invested)?;
        weighted_days = weighted_days.checked_add(dollar_days)?;
        invested_sum = invested_sum.checked_add(p.invested)?;
        pnl_sum = pnl_sum.checked_add(position_pnl(p))?;
    }

    if !invested_sum.is_positive() {
        return None;
    }

    let mean_days = weighted_days.checked_div(invested_sum)?;
    let daily_rate = pnl_sum
        .checked_div(invested_sum)?
        .checked_div(mean_days)?;
    scale_daily_rate(daily_rate, horizon)
}

/// Fees per day across positions, each position's fees spread over its own age.
pub fn daily_fee_rate(positions: &[Position], now: DateTime<Utc>) -> Decimal {
    positions
        .iter()
        .filter_map(|p| p.fees().checked_div(elapsed_days(p, now)))
        .sum()
}

/// Fee income projected over `horizon` at the current daily rate.
pub fn projected_fees(positions: &[Position], now: DateTime<Utc>, horizon: Horizon) -> Decimal {
    daily_fee_rate(positions, now).saturating_mul(horizon.multiplier())
}

/// Aggregates plus the weighted yield and fee projection for the chosen periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    #[serde(flatten)]
    pub totals: PortfolioTotals,
    pub yield_period: Horizon,
    pub weighted_apr: Option<Decimal>,
    pub fee_period: Horizon,
    pub projected_fees: Decimal,
}

pub fn summarize(
    positions: &[Position],
    now: DateTime<Utc>,
    yield_period: Horizon,
    fee_period: Horizon,
) -> PortfolioSummary {
    PortfolioSummary {
        totals: totals(positions),
        yield_period,
        weighted_apr: weighted_apr(positions, now, yield_period),
        fee_period,
        projected_fees: projected_fees(positions, now, fee_period),
    }
}

/// The six dashboard cards, in display order.
pub fn dashboard_cards(summary: &PortfolioSummary) -> Vec<DisplayMetric> {
    vec![
        DisplayMetric::currency("Total value", summary.totals.total_current_value),
        DisplayMetric::currency("Total invested", summary.totals.total_invested),
        DisplayMetric::currency("Total fees", summary.totals.total_fees),
        DisplayMetric::currency("Total PNL", summary.totals.total_pnl),
        DisplayMetric::percentage("Estimated yield", summary.weighted_apr)
            .with_period(summary.yield_period),
        DisplayMetric::currency("Estimated fees", summary.projected_fees)
            .with_period(summary.fee_period),
    ]
}
