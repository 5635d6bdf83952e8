//! Display strings for computed values.

use crate::domain::{CreatedKey, Decimal, DisplayMetric, MetricKind};
use chrono::{DateTime, Utc};
use std::str::FromStr;

/// Rendered in place of an undefined metric.
pub const UNDEFINED: &str = "-";

/// Digit grouping and decimal mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberLocale {
    /// `1,234.56`
    #[default]
    EnUs,
    /// `1.234,56`
    PtBr,
}

impl NumberLocale {
    fn separators(&self) -> (char, char) {
        match self {
            NumberLocale::EnUs => (',', '.'),
            NumberLocale::PtBr => ('.', ','),
        }
    }
}

impl FromStr for NumberLocale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en-US" | "en_US" | "en" => Ok(NumberLocale::EnUs),
            "pt-BR" | "pt_BR" | "pt" => Ok(NumberLocale::PtBr),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

/// `-$1,234.56`: two decimals, grouped, dollar sign after the minus.
pub fn format_currency(value: Decimal, locale: NumberLocale) -> String {
    let rounded = value.round_dp(2);
    let sign = if rounded.is_negative() { "-" } else { "" };
    format!("{}${}", sign, group_fixed2(rounded.abs(), locale))
}

/// `12.34%`: two decimals, no grouping.
pub fn format_percent(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    // Avoid printing "-0.00%" for tiny negative rates.
    let rounded = if rounded.is_zero() { Decimal::zero() } else { rounded };
    format!("{:.2}%", rounded.inner())
}

pub fn format_optional_percent(value: Option<Decimal>) -> String {
    value.map(format_percent).unwrap_or_else(|| UNDEFINED.to_string())
}

pub fn format_metric(metric: &DisplayMetric, locale: NumberLocale) -> String {
    match (metric.kind, metric.value) {
        (_, None) => UNDEFINED.to_string(),
        (MetricKind::Currency, Some(v)) => format_currency(v, locale),
        (MetricKind::Percentage, Some(v)) => format_percent(v),
    }
}

/// Compact age of a position: `45m`, `5h`, `3d 4h`.
pub fn format_age(created: &CreatedKey, now: DateTime<Utc>) -> String {
    let Some(at) = created.instant() else {
        return UNDEFINED.to_string();
    };
    let minutes = (now - at).num_minutes().max(0);
    let (days, hours) = (minutes / (60 * 24), (minutes / 60) % 24);
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h", hours)
    } else {
        format!("{}m", minutes)
    }
}

fn group_fixed2(value: Decimal, locale: NumberLocale) -> String {
    let (group_sep, decimal_mark) = locale.separators();
    let fixed = format!("{:.2}", value.inner());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(group_sep);
        }
        grouped.push(*c);
    }
    format!("{}{}{}", grouped, decimal_mark, frac_part)
}
