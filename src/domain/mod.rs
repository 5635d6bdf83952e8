//! Domain types for the position dashboard.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Primitives: CreatedKey, Address, Scope
//! - The Position record and its backup interchange format
//! - Projection horizons and tagged display metrics

pub mod backup;
pub mod decimal;
pub mod metric;
pub mod position;
pub mod primitives;

pub use backup::{Backup, BackupError};
pub use decimal::Decimal;
pub use metric::{DisplayMetric, Horizon, MetricKind};
pub use position::{InlineField, Position};
pub use primitives::{Address, AddressParseError, CreatedKey, Scope};
