//! The tracked liquidity position record.

use crate::domain::{CreatedKey, Decimal};
use serde::{Deserialize, Serialize};

/// A tracked liquidity-pool position.
///
/// This is the interchange shape used by backups, the HTTP API and the
/// persistence layer. Nothing derived (PNL, APR) is stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Display name of the pool, e.g. "ETH/USDC".
    #[serde(default)]
    pub pool: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub dex: String,
    /// Capital deposited.
    #[serde(default)]
    pub invested: Decimal,
    /// Mark-to-market value of the deposited capital.
    #[serde(default)]
    pub current: Decimal,
    /// Fees already withdrawn.
    #[serde(default)]
    pub collected: Decimal,
    /// Fees accrued but not yet withdrawn.
    #[serde(default)]
    pub uncollected: Decimal,
    #[serde(default)]
    pub range_min: Option<Decimal>,
    #[serde(default)]
    pub range_max: Option<Decimal>,
    #[serde(default)]
    pub entry_price: Option<Decimal>,
    /// Only populated for positions sourced from an address lookup.
    #[serde(default)]
    pub current_price: Option<Decimal>,
    /// Inception timestamp and position key.
    pub created: CreatedKey,
    /// Sourced from an address lookup; read-only apart from removal.
    #[serde(default)]
    pub is_tracked: bool,
    /// Lookup data came from the simulated fallback rather than a live query.
    #[serde(default)]
    pub is_simulated: bool,
    #[serde(default, rename = "observacoes", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_url: Option<String>,
}

impl Position {
    /// A manual (untracked) position with zeroed amounts.
    pub fn new(pool: impl Into<String>, created: CreatedKey) -> Self {
        Self {
            pool: pool.into(),
            network: String::new(),
            dex: String::new(),
            invested: Decimal::zero(),
            current: Decimal::zero(),
            collected: Decimal::zero(),
            uncollected: Decimal::zero(),
            range_min: None,
            range_max: None,
            entry_price: None,
            current_price: None,
            created,
            is_tracked: false,
            is_simulated: false,
            notes: None,
            pool_url: None,
        }
    }

    pub fn key(&self) -> &CreatedKey {
        &self.created
    }

    /// Total fees earned, realized or not.
    pub fn fees(&self) -> Decimal {
        self.collected + self.uncollected
    }
}

/// The numeric fields that can be edited inline without the full form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InlineField {
    Current,
    Collected,
    Uncollected,
}

impl InlineField {
    /// Overwrite the matching field on `position`.
    pub fn apply(&self, position: &mut Position, value: Decimal) {
        match self {
            InlineField::Current => position.current = value,
            InlineField::Collected => position.collected = value,
            InlineField::Uncollected => position.uncollected = value,
        }
    }
}
