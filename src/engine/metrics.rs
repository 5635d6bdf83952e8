//! Per-position metrics: elapsed time, PNL, simple-interest APR and range status.
//!
//! Every function here is pure and deterministic for a fixed `now`. Numeric edge
//! cases (no invested capital, same-instant or future creation, rates beyond the
//! decimal range) yield sentinels, never panics.

use crate::domain::{Decimal, Horizon, Position};
use chrono::{DateTime, Utc};
use serde::Serialize;

const MS_PER_DAY: i64 = 86_400_000;

/// Fractional days since the position was created, floored at 1.
///
/// A `created` value that cannot be parsed counts as created just now.
pub fn elapsed_days(position: &Position, now: DateTime<Utc>) -> Decimal {
    let Some(created_at) = position.created.instant() else {
        return Decimal::one();
    };
    let elapsed_ms = (now - created_at).num_milliseconds();
    Decimal::from_i64(elapsed_ms)
        .checked_div(Decimal::from_i64(MS_PER_DAY))
        .map_or(Decimal::one(), |days| days.max(Decimal::one()))
}

/// `current + collected + uncollected - invested`.
pub fn position_pnl(position: &Position) -> Decimal {
    position.current + position.collected + position.uncollected - position.invested
}

/// Simple (non-compounding) APR in percent over `horizon`.
///
/// Returns None when `invested <= 0` or the rate leaves the decimal range.
pub fn position_apr(position: &Position, now: DateTime<Utc>, horizon: Horizon) -> Option<Decimal> {
    if !position.invested.is_positive() {
        return None;
    }
    let daily_rate = position_pnl(position)
        .checked_div(position.invested)?
        .checked_div(elapsed_days(position, now))?;
    scale_daily_rate(daily_rate, horizon)
}

/// Daily fraction to percent over `horizon`.
pub(crate) fn scale_daily_rate(daily_rate: Decimal, horizon: Horizon) -> Option<Decimal> {
    daily_rate
        .checked_mul(horizon.multiplier())?
        .checked_mul(Decimal::hundred())
}

/// Daily, monthly and annual APR for one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AprSet {
    pub daily: Option<Decimal>,
    pub monthly: Option<Decimal>,
    pub annual: Option<Decimal>,
}

pub fn position_aprs(position: &Position, now: DateTime<Utc>) -> AprSet {
    AprSet {
        daily: position_apr(position, now, Horizon::Daily),
        monthly: position_apr(position, now, Horizon::Monthly),
        annual: position_apr(position, now, Horizon::Annual),
    }
}

/// Where the current price sits relative to the liquidity range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RangeStatus {
    InRange,
    OutOfRange,
    /// Range bounds or current price missing.
    Unknown,
}

pub fn range_status(position: &Position) -> RangeStatus {
    match (position.range_min, position.range_max, position.current_price) {
        (Some(min), Some(max), Some(price)) => {
            if price >= min && price <= max {
                RangeStatus::InRange
            } else {
                RangeStatus::OutOfRange
            }
        }
        _ => RangeStatus::Unknown,
    }
}

/// Entry price as a percentage of the way from `range_min` to `range_max`.
///
/// None unless both bounds and the entry price are set, `range_max > range_min`,
/// and the entry lies within the range.
pub fn entry_position_pct(position: &Position) -> Option<Decimal> {
    let (min, max, entry) = (position.range_min?, position.range_max?, position.entry_price?);
    if max <= min || entry < min || entry > max {
        return None;
    }
    (entry - min)
        .checked_div(max - min)?
        .checked_mul(Decimal::hundred())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CreatedKey;
    use chrono::{Duration, TimeZone};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn position_at(created: DateTime<Utc>, invested: &str, current: &str) -> Position {
        let mut p = Position::new("ETH/USDC", CreatedKey::from_instant(created));
        p.invested = d(invested);
        p.current = d(current);
        p
    }

    #[test]
    fn test_elapsed_days_fractional() {
        let p = position_at(now() - Duration::hours(36), "100", "100");
        assert_eq!(elapsed_days(&p, now()), d("1.5"));
    }

    #[test]
    fn test_elapsed_days_floor_for_same_instant_and_future() {
        let same = position_at(now(), "100", "100");
        assert_eq!(elapsed_days(&same, now()), Decimal::one());

        let future = position_at(now() + Duration::days(3), "100", "100");
        assert_eq!(elapsed_days(&future, now()), Decimal::one());

        let half_day = position_at(now() - Duration::hours(12), "100", "100");
        assert_eq!(elapsed_days(&half_day, now()), Decimal::one());
    }

    #[test]
    fn test_elapsed_days_unparseable_created() {
        let p = Position::new("ETH/USDC", CreatedKey::new("not a date"));
        assert_eq!(elapsed_days(&p, now()), Decimal::one());
    }

    #[test]
    fn test_pnl_includes_uncollected() {
        let mut p = position_at(now(), "1000", "950");
        p.collected = d("20");
        p.uncollected = d("5");
        assert_eq!(position_pnl(&p), d("-25"));
    }

    #[test]
    fn test_apr_reference_scenario() {
        let mut p = position_at(now() - Duration::days(10), "1000", "1050");
        p.collected = d("20");
        p.uncollected = d("5");

        assert_eq!(position_pnl(&p), d("75"));
        assert_eq!(position_apr(&p, now(), Horizon::Annual), Some(d("273.75")));
        assert_eq!(position_apr(&p, now(), Horizon::Monthly), Some(d("22.5")));
        assert_eq!(position_apr(&p, now(), Horizon::Daily), Some(d("0.75")));
    }

    #[test]
    fn test_apr_sentinel_for_zero_and_negative_invested() {
        let zero = position_at(now() - Duration::days(10), "0", "50");
        assert_eq!(position_apr(&zero, now(), Horizon::Annual), None);

        let negative = position_at(now() - Duration::days(10), "-10", "50");
        let aprs = position_aprs(&negative, now());
        assert_eq!(aprs.daily, None);
        assert_eq!(aprs.monthly, None);
        assert_eq!(aprs.annual, None);
    }

    #[test]
    fn test_apr_negative_when_losing() {
        let p = position_at(now() - Duration::days(5), "1000", "900");
        assert_eq!(position_apr(&p, now(), Horizon::Daily), Some(d("-2")));
    }

    #[test]
    fn test_apr_is_deterministic() {
        let p = position_at(now() - Duration::hours(77), "1234.56", "1300.01");
        assert_eq!(position_aprs(&p, now()), position_aprs(&p, now()));
    }

    #[test]
    fn test_apr_sentinel_when_rate_overflows() {
        let mut p = position_at(now() - Duration::days(10), "0.00000000000000000001", "10000000000");
        p.collected = d("1");
        assert_eq!(position_apr(&p, now(), Horizon::Annual), None);
        assert_eq!(position_aprs(&p, now()).daily, None);
    }

    #[test]
    fn test_pnl_saturates_at_extreme_values() {
        let huge = "79228162514264337593543950335";
        let mut p = position_at(now(), "1", huge);
        p.collected = d(huge);
        assert_eq!(position_pnl(&p), d(huge) - d("1"));
    }

    #[test]
    fn test_range_status() {
        let mut p = position_at(now(), "100", "100");
        assert_eq!(range_status(&p), RangeStatus::Unknown);

        p.range_min = Some(d("1800"));
        p.range_max = Some(d("2200"));
        assert_eq!(range_status(&p), RangeStatus::Unknown);

        p.current_price = Some(d("2000"));
        assert_eq!(range_status(&p), RangeStatus::InRange);

        p.current_price = Some(d("2200"));
        assert_eq!(range_status(&p), RangeStatus::InRange);

        p.current_price = Some(d("2500"));
        assert_eq!(range_status(&p), RangeStatus::OutOfRange);
    }

    #[test]
    fn test_entry_position_pct() {
        let mut p = position_at(now(), "100", "100");
        p.range_min = Some(d("1000"));
        p.range_max = Some(d("2000"));
        p.entry_price = Some(d("1250"));
        assert_eq!(entry_position_pct(&p), Some(d("25")));

        p.entry_price = Some(d("2500"));
        assert_eq!(entry_position_pct(&p), None);

        p.entry_price = Some(d("1500"));
        p.range_max = Some(d("1000"));
        assert_eq!(entry_position_pct(&p), None);
    }
}
