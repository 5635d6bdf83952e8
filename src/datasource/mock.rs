//! Mock lookup for testing without network calls.

use super::{LookupError, PositionLookup};
use crate::domain::{Address, Position};
use async_trait::async_trait;
use std::collections::HashMap;

/// Mock lookup that returns predefined results per address.
///
/// Addresses with nothing registered resolve to an empty list.
#[derive(Debug, Clone, Default)]
pub struct MockLookup {
    results: HashMap<Address, Result<Vec<Position>, LookupError>>,
}

impl MockLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positions returned for `address`; they are marked tracked.
    pub fn with_positions(mut self, address: Address, positions: Vec<Position>) -> Self {
        let tracked = positions
            .into_iter()
            .map(|p| Position {
                is_tracked: true,
                ..p
            })
            .collect();
        self.results.insert(address, Ok(tracked));
        self
    }

    pub fn with_error(mut self, address: Address, error: LookupError) -> Self {
        self.results.insert(address, Err(error));
        self
    }
}

#[async_trait]
impl PositionLookup for MockLookup {
    async fn fetch_positions(&self, address: &Address) -> Result<Vec<Position>, LookupError> {
        self.results
            .get(address)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CreatedKey;

    fn address(last: char) -> Address {
        format!("0x{}{}", "0".repeat(39), last).parse().unwrap()
    }

    #[tokio::test]
    async fn test_mock_lookup_marks_tracked() {
        let mock = MockLookup::new().with_positions(
            address('1'),
            vec![Position::new("ETH/USDC", CreatedKey::new("2025-01-01"))],
        );
        let positions = mock.fetch_positions(&address('1')).await.unwrap();
        assert_eq!(positions.len(), 1);
        assert!(positions[0].is_tracked);
    }

    #[tokio::test]
    async fn test_mock_lookup_error_and_unknown() {
        let mock = MockLookup::new().with_error(address('2'), LookupError::RateLimited);
        assert_eq!(
            mock.fetch_positions(&address('2')).await,
            Err(LookupError::RateLimited)
        );
        assert_eq!(mock.fetch_positions(&address('3')).await, Ok(vec![]));
    }
}
