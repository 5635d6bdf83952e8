//! Pure computation: position metrics, portfolio aggregates, lifecycle
//! transitions and reports. Nothing in here performs I/O.

pub mod lifecycle;
pub mod metrics;
pub mod portfolio;
pub mod reports;

pub use lifecycle::{Book, LifecycleError, SyncOp};
pub use metrics::{
    elapsed_days, entry_position_pct, position_apr, position_aprs, position_pnl, range_status,
    AprSet, RangeStatus,
};
pub use portfolio::{
    dashboard_cards, projected_fees, summarize, totals, weighted_apr, PortfolioSummary,
    PortfolioTotals,
};
pub use reports::{build_report, Report, ReportMetric, ReportPeriod};
