//! Address lookup: fetching on-chain liquidity positions owned by an address.

use crate::domain::{Address, Position};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod fallback;
pub mod mock;
pub mod simulated;
pub mod subgraph;
pub mod ticks;

pub use fallback::FallbackLookup;
pub use mock::MockLookup;
pub use simulated::{SimulatedLookup, EXAMPLE_ADDRESS};
pub use subgraph::SubgraphLookup;

/// Source of tracked positions for an owner address.
///
/// Every returned position has `is_tracked = true`.
#[async_trait]
pub trait PositionLookup: Send + Sync + fmt::Debug {
    async fn fetch_positions(&self, address: &Address) -> Result<Vec<Position>, LookupError>;
}

/// Error type for lookup operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// Connection failure or request timeout.
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Rate limited")]
    RateLimited,
    /// The GraphQL endpoint answered with an `errors` array.
    #[error("Subgraph error: {0}")]
    Subgraph(String),
}
