//! Primary lookup with a secondary source used when the primary fails.

use super::{LookupError, PositionLookup};
use crate::domain::{Address, Position};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct FallbackLookup {
    primary: Arc<dyn PositionLookup>,
    fallback: Arc<dyn PositionLookup>,
}

impl FallbackLookup {
    pub fn new(primary: Arc<dyn PositionLookup>, fallback: Arc<dyn PositionLookup>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl PositionLookup for FallbackLookup {
    async fn fetch_positions(&self, address: &Address) -> Result<Vec<Position>, LookupError> {
        match self.primary.fetch_positions(address).await {
            Ok(positions) => Ok(positions),
            Err(e) => {
                warn!(address = %address, error = %e, "Primary lookup failed, using fallback data");
                self.fallback.fetch_positions(address).await
            }
        }
    }
}
