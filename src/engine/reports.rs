//! Historical reports: period filtering, a daily timeline with running totals,
//! and a breakdown by exchange.

use crate::domain::{Decimal, Horizon, Position};
use crate::engine::metrics::position_pnl;
use crate::engine::portfolio::{totals, weighted_apr};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

const UNKNOWN_DEX: &str = "Unknown";

/// Look-back window applied to `created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportPeriod {
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "1y")]
    Year,
    #[serde(rename = "all")]
    All,
}

impl ReportPeriod {
    pub fn days(&self) -> Option<i64> {
        match self {
            ReportPeriod::Week => Some(7),
            ReportPeriod::Month => Some(30),
            ReportPeriod::Quarter => Some(90),
            ReportPeriod::Year => Some(365),
            ReportPeriod::All => None,
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7d" => Ok(ReportPeriod::Week),
            "30d" => Ok(ReportPeriod::Month),
            "90d" => Ok(ReportPeriod::Quarter),
            "1y" => Ok(ReportPeriod::Year),
            "all" => Ok(ReportPeriod::All),
            other => Err(format!("unknown report period: {}", other)),
        }
    }
}

/// Which figure the per-dex breakdown reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMetric {
    Pnl,
    Invested,
    Fees,
    Count,
}

impl FromStr for ReportMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pnl" => Ok(ReportMetric::Pnl),
            "invested" | "investments" => Ok(ReportMetric::Invested),
            "fees" => Ok(ReportMetric::Fees),
            "count" => Ok(ReportMetric::Count),
            other => Err(format!("unknown report metric: {}", other)),
        }
    }
}

/// Positions created within `period` of `now`.
///
/// Positions whose `created` cannot be parsed only appear under `All`.
pub fn filter_by_period(positions: &[Position], period: ReportPeriod, now: DateTime<Utc>) -> Vec<Position> {
    let Some(days) = period.days() else {
        return positions.to_vec();
    };
    let cutoff = now - Duration::days(days);
    positions
        .iter()
        .filter(|p| p.created.instant().is_some_and(|at| at >= cutoff))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    /// UTC calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub invested: Decimal,
    pub pnl: Decimal,
    pub fees: Decimal,
    pub count: usize,
    pub cumulative_invested: Decimal,
    pub cumulative_pnl: Decimal,
    pub cumulative_fees: Decimal,
}

/// Group positions by creation date, oldest first, with running totals.
pub fn timeline(positions: &[Position]) -> Vec<TimelinePoint> {
    let mut by_date: BTreeMap<String, (Decimal, Decimal, Decimal, usize)> = BTreeMap::new();
    for p in positions {
        let Some(at) = p.created.instant() else {
            continue;
        };
        let entry = by_date
            .entry(at.format("%Y-%m-%d").to_string())
            .or_insert((Decimal::zero(), Decimal::zero(), Decimal::zero(), 0));
        entry.0 += p.invested;
        entry.1 += position_pnl(p);
        entry.2 += p.fees();
        entry.3 += 1;
    }

    let mut cumulative_invested = Decimal::zero();
    let mut cumulative_pnl = Decimal::zero();
    let mut cumulative_fees = Decimal::zero();

    by_date
        .into_iter()
        .map(|(date, (invested, pnl, fees, count))| {
            cumulative_invested += invested;
            cumulative_pnl += pnl;
            cumulative_fees += fees;
            TimelinePoint {
                date,
                invested,
                pnl,
                fees,
                count,
                cumulative_invested,
                cumulative_pnl,
                cumulative_fees,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolSlice {
    pub name: String,
    pub value: Decimal,
}

/// One slice per dex (alphabetical), valued by `metric`.
pub fn by_protocol(positions: &[Position], metric: ReportMetric) -> Vec<ProtocolSlice> {
    let mut groups: BTreeMap<String, Decimal> = BTreeMap::new();
    for p in positions {
        let name = if p.dex.trim().is_empty() {
            UNKNOWN_DEX.to_string()
        } else {
            p.dex.clone()
        };
        let value = match metric {
            ReportMetric::Pnl => position_pnl(p),
            ReportMetric::Invested => p.invested,
            ReportMetric::Fees => p.fees(),
            ReportMetric::Count => Decimal::one(),
        };
        *groups.entry(name).or_default() += value;
    }
    groups
        .into_iter()
        .map(|(name, value)| ProtocolSlice { name, value })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub total_invested: Decimal,
    pub total_pnl: Decimal,
    pub total_fees: Decimal,
    pub avg_apr: Option<Decimal>,
    pub total_positions: usize,
    pub open_positions: usize,
    pub closed_positions: usize,
}

/// Headline numbers over every position, open and closed.
pub fn report_stats(open: &[Position], closed: &[Position], now: DateTime<Utc>) -> ReportStats {
    let all: Vec<Position> = open.iter().chain(closed.iter()).cloned().collect();
    let t = totals(&all);
    ReportStats {
        total_invested: t.total_invested,
        total_pnl: t.total_pnl,
        total_fees: t.total_fees,
        avg_apr: weighted_apr(&all, now, Horizon::Annual),
        total_positions: all.len(),
        open_positions: open.len(),
        closed_positions: closed.len(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub period: ReportPeriod,
    pub metric: ReportMetric,
    pub timeline: Vec<TimelinePoint>,
    pub protocols: Vec<ProtocolSlice>,
    pub stats: ReportStats,
}

pub fn build_report(
    open: &[Position],
    closed: &[Position],
    period: ReportPeriod,
    metric: ReportMetric,
    now: DateTime<Utc>,
) -> Report {
    let all: Vec<Position> = open.iter().chain(closed.iter()).cloned().collect();
    let filtered = filter_by_period(&all, period, now);
    Report {
        period,
        metric,
        timeline: timeline(&filtered),
        protocols: by_protocol(&filtered, metric),
        stats: report_stats(open, closed, now),
    }
}

/// Render a timeline as CSV with a header row.
///
/// # Errors
/// Returns an error if the CSV writer fails.
pub fn timeline_csv(points: &[TimelinePoint]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "date",
        "invested",
        "pnl",
        "fees",
        "count",
        "cumulative_invested",
        "cumulative_pnl",
        "cumulative_fees",
    ])?;
    for point in points {
        writer.write_record([
            point.date.clone(),
            point.invested.to_canonical_string(),
            point.pnl.to_canonical_string(),
            point.fees.to_canonical_string(),
            point.count.to_string(),
            point.cumulative_invested.to_canonical_string(),
            point.cumulative_pnl.to_canonical_string(),
            point.cumulative_fees.to_canonical_string(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CreatedKey;
    use chrono::TimeZone;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
    }

    fn pos(created: &str, dex: &str, invested: &str, current: &str, fees: &str) -> Position {
        let mut p = Position::new("ETH/USDC", CreatedKey::new(created));
        p.dex = dex.to_string();
        p.invested = d(invested);
        p.current = d(current);
        p.collected = d(fees);
        p
    }

    #[test]
    fn test_filter_by_period() {
        let positions = vec![
            pos("2025-06-28T00:00:00Z", "Uniswap", "100", "100", "0"),
            pos("2025-05-15T00:00:00Z", "Orca", "100", "100", "0"),
            pos("garbage", "Orca", "100", "100", "0"),
        ];
        assert_eq!(filter_by_period(&positions, ReportPeriod::Week, now()).len(), 1);
        assert_eq!(filter_by_period(&positions, ReportPeriod::Quarter, now()).len(), 2);
        assert_eq!(filter_by_period(&positions, ReportPeriod::All, now()).len(), 3);
    }

    #[test]
    fn test_timeline_groups_by_day_with_running_totals() {
        let positions = vec![
            pos("2025-06-02T10:00:00Z", "Uniswap", "200", "210", "5"),
            pos("2025-06-01T09:00:00Z", "Uniswap", "100", "90", "1"),
            pos("2025-06-01T23:00:00Z", "Orca", "50", "55", "0"),
        ];
        let points = timeline(&positions);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, "2025-06-01");
        assert_eq!(points[0].count, 2);
        assert_eq!(points[0].invested, d("150"));
        assert_eq!(points[0].pnl, d("-4"));
        assert_eq!(points[1].date, "2025-06-02");
        assert_eq!(points[1].cumulative_invested, d("350"));
        assert_eq!(points[1].cumulative_pnl, d("11"));
        assert_eq!(points[1].cumulative_fees, d("6"));
    }

    #[test]
    fn test_by_protocol() {
        let positions = vec![
            pos("2025-06-01", "Uniswap", "100", "110", "0"),
            pos("2025-06-02", "Uniswap", "100", "95", "0"),
            pos("2025-06-03", "", "10", "10", "2"),
        ];
        let counts = by_protocol(&positions, ReportMetric::Count);
        assert_eq!(
            counts,
            vec![
                ProtocolSlice { name: "Uniswap".to_string(), value: d("2") },
                ProtocolSlice { name: "Unknown".to_string(), value: d("1") },
            ]
        );
        let pnl = by_protocol(&positions, ReportMetric::Pnl);
        assert_eq!(pnl[0].value, d("5"));
        let fees = by_protocol(&positions, ReportMetric::Fees);
        assert_eq!(fees[1].value, d("2"));
    }

    #[test]
    fn test_report_stats_cover_open_and_closed() {
        let open = vec![pos("2025-06-20T12:00:00Z", "Uniswap", "1000", "1050", "25")];
        let closed = vec![pos("2025-06-25T12:00:00Z", "Orca", "0", "0", "3")];
        let stats = report_stats(&open, &closed, now());
        assert_eq!(stats.total_positions, 2);
        assert_eq!(stats.open_positions, 1);
        assert_eq!(stats.closed_positions, 1);
        assert_eq!(stats.total_pnl, d("78"));
        assert_eq!(stats.avg_apr, Some(d("273.75")));
    }

    #[test]
    fn test_timeline_csv() {
        let positions = vec![pos("2025-06-01", "Uniswap", "100", "110", "1")];
        let csv = timeline_csv(&timeline(&positions)).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("date,invested,pnl,fees,count,cumulative_invested,cumulative_pnl,cumulative_fees")
        );
        assert_eq!(lines.next(), Some("2025-06-01,100,11,1,1,100,11,1"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_period_and_metric_parse() {
        assert_eq!("90d".parse::<ReportPeriod>().unwrap(), ReportPeriod::Quarter);
        assert_eq!("investments".parse::<ReportMetric>().unwrap(), ReportMetric::Invested);
        assert!("2w".parse::<ReportPeriod>().is_err());
    }
}
