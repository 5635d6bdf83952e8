//! Fixture positions served when the live subgraph is unavailable.

use super::ticks::SubgraphPosition;
use super::{LookupError, PositionLookup};
use crate::domain::{Address, Position};
use async_trait::async_trait;
use tracing::debug;

/// The demo owner address with fixture positions; every other address has none.
pub const EXAMPLE_ADDRESS: &str = "0x9ad1a461ca0f792f356b3dd1960a4f56ad86bf46";

#[derive(Debug, Clone, Default)]
pub struct SimulatedLookup;

impl SimulatedLookup {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PositionLookup for SimulatedLookup {
    async fn fetch_positions(&self, address: &Address) -> Result<Vec<Position>, LookupError> {
        if !address.as_str().eq_ignore_ascii_case(EXAMPLE_ADDRESS) {
            debug!(address = %address, "No simulated positions for address");
            return Ok(Vec::new());
        }
        fixtures()?
            .iter()
            .map(|raw| raw.to_position(true))
            .collect()
    }
}

fn fixtures() -> Result<Vec<SubgraphPosition>, LookupError> {
    let raw = serde_json::json!([
        {
            "id": "123456",
            "pool": {
                "id": "pool-eth-usdc-0.3",
                "token0": { "symbol": "ETH", "decimals": "18" },
                "token1": { "symbol": "USDC", "decimals": "6" },
                "feeTier": "3000",
                "tick": "202000"
            },
            "tickLower": { "tickIdx": "201000" },
            "tickUpper": { "tickIdx": "203000" },
            "liquidity": "1000000000000000000",
            "depositedToken0": "0.5",
            "depositedToken1": "1000",
            "collectedFeesToken0": "0.01",
            "collectedFeesToken1": "20",
            "transaction": { "timestamp": "1680000000" }
        },
        {
            "id": "234567",
            "pool": {
                "id": "pool-wbtc-eth-0.05",
                "token0": { "symbol": "WBTC", "decimals": "8" },
                "token1": { "symbol": "ETH", "decimals": "18" },
                "feeTier": "500",
                "tick": "85000"
            },
            "tickLower": { "tickIdx": "84000" },
            "tickUpper": { "tickIdx": "86000" },
            "liquidity": "500000000000000000",
            "depositedToken0": "0.02",
            "depositedToken1": "0.3",
            "collectedFeesToken0": "0.0005",
            "collectedFeesToken1": "0.008",
            "transaction": { "timestamp": "1685000000" }
        },
        {
            "id": "345678",
            "pool": {
                "id": "pool-link-eth-1",
                "token0": { "symbol": "LINK", "decimals": "18" },
                "token1": { "symbol": "ETH", "decimals": "18" },
                "feeTier": "10000",
                "tick": "-50000"
            },
            "tickLower": { "tickIdx": "-60000" },
            "tickUpper": { "tickIdx": "-40000" },
            "liquidity": "2000000000000000000",
            "depositedToken0": "100",
            "depositedToken1": "0.2",
            "collectedFeesToken0": "2.5",
            "collectedFeesToken1": "0.005",
            "transaction": { "timestamp": "1690000000" }
        }
    ]);
    serde_json::from_value(raw).map_err(|e| LookupError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_example_address_has_three_positions() {
        let address: Address = EXAMPLE_ADDRESS.parse().unwrap();
        let positions = SimulatedLookup::new().fetch_positions(&address).await.unwrap();

        assert_eq!(positions.len(), 3);
        let pools: Vec<&str> = positions.iter().map(|p| p.pool.as_str()).collect();
        assert_eq!(pools, vec!["ETH/USDC", "WBTC/ETH", "LINK/ETH"]);
        assert!(positions.iter().all(|p| p.is_tracked && p.is_simulated));
        assert!(positions.iter().all(|p| p.range_min < p.range_max));
    }

    #[tokio::test]
    async fn test_other_address_has_none() {
        let address: Address = "0x0000000000000000000000000000000000000001".parse().unwrap();
        let positions = SimulatedLookup::new().fetch_positions(&address).await.unwrap();
        assert!(positions.is_empty());
    }
}
