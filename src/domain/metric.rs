//! Projection horizons and the tagged display metric.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Window a daily rate is extrapolated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizon {
    Daily,
    Weekly,
    Monthly,
    Annual,
}

impl Horizon {
    /// Number of days in the window.
    pub fn days(&self) -> i64 {
        match self {
            Horizon::Daily => 1,
            Horizon::Weekly => 7,
            Horizon::Monthly => 30,
            Horizon::Annual => 365,
        }
    }

    pub fn multiplier(&self) -> Decimal {
        Decimal::from_i64(self.days())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::Daily => "daily",
            Horizon::Weekly => "weekly",
            Horizon::Monthly => "monthly",
            Horizon::Annual => "annual",
        }
    }
}

impl FromStr for Horizon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Horizon::Daily),
            "weekly" => Ok(Horizon::Weekly),
            "monthly" => Ok(Horizon::Monthly),
            "annual" => Ok(Horizon::Annual),
            other => Err(format!("unknown period: {}", other)),
        }
    }
}

/// How a metric value is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Currency,
    Percentage,
}

/// One dashboard figure.
///
/// `value` is None when the metric is undefined for the data (for example a
/// weighted APR over positions with no invested capital).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMetric {
    pub label: String,
    pub kind: MetricKind,
    pub value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Horizon>,
}

impl DisplayMetric {
    pub fn currency(label: &str, value: Decimal) -> Self {
        Self {
            label: label.to_string(),
            kind: MetricKind::Currency,
            value: Some(value),
            period: None,
        }
    }

    pub fn percentage(label: &str, value: Option<Decimal>) -> Self {
        Self {
            label: label.to_string(),
            kind: MetricKind::Percentage,
            value,
            period: None,
        }
    }

    pub fn with_period(mut self, period: Horizon) -> Self {
        self.period = Some(period);
        self
    }
}
