//! Uniswap v3 subgraph client.

use super::ticks::SubgraphPosition;
use super::{LookupError, PositionLookup};
use crate::domain::{Address, Position};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_SUBGRAPH_URL: &str = "https://api.thegraph.com/subgraphs/name/uniswap/uniswap-v3";

const POSITIONS_QUERY: &str = r#"
query Positions($owner: String!) {
  positions(where: { owner: $owner, liquidity_gt: 0 }) {
    id
    liquidity
    depositedToken0
    depositedToken1
    collectedFeesToken0
    collectedFeesToken1
    pool {
      id
      feeTier
      tick
      token0 { symbol decimals }
      token1 { symbol decimals }
    }
    tickLower { tickIdx }
    tickUpper { tickIdx }
    transaction { timestamp }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphResponse {
    data: Option<PositionsData>,
    errors: Option<Vec<GraphError>>,
}

#[derive(Debug, Deserialize)]
struct PositionsData {
    positions: Vec<SubgraphPosition>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

/// Live lookup against a GraphQL endpoint serving the Uniswap v3 schema.
#[derive(Debug, Clone)]
pub struct SubgraphLookup {
    client: Client,
    url: String,
    request_timeout: Duration,
    max_elapsed: Duration,
}

impl SubgraphLookup {
    pub fn new(url: String, request_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url,
            request_timeout,
            max_elapsed: Duration::from_secs(30),
        }
    }

    /// Create with the public Uniswap v3 subgraph URL.
    pub fn default_url() -> Self {
        Self::new(DEFAULT_SUBGRAPH_URL.to_string(), Duration::from_secs(10))
    }

    /// Cap on total time spent retrying one lookup.
    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    async fn post_query(&self, payload: serde_json::Value) -> Result<serde_json::Value, LookupError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .post(&self.url)
                .timeout(self.request_timeout)
                .json(&payload)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(LookupError::Network(e.to_string())))?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(LookupError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(LookupError::Http {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(LookupError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(LookupError::Parse(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl PositionLookup for SubgraphLookup {
    async fn fetch_positions(&self, address: &Address) -> Result<Vec<Position>, LookupError> {
        debug!(address = %address, url = %self.url, "Querying subgraph for positions");

        let payload = serde_json::json!({
            "query": POSITIONS_QUERY,
            "variables": { "owner": address.as_str() },
        });
        let response = self.post_query(payload).await?;
        let raw = parse_response(response)?;

        let mut positions = Vec::with_capacity(raw.len());
        for entry in &raw {
            match entry.to_position(false) {
                Ok(position) => positions.push(position),
                Err(e) => warn!(id = %entry.id, error = %e, "Skipping unparseable subgraph position"),
            }
        }
        debug!(address = %address, count = positions.len(), "Subgraph lookup complete");
        Ok(positions)
    }
}

fn parse_response(value: serde_json::Value) -> Result<Vec<SubgraphPosition>, LookupError> {
    let response: GraphResponse =
        serde_json::from_value(value).map_err(|e| LookupError::Parse(e.to_string()))?;

    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        let message = errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(LookupError::Subgraph(message));
    }

    response
        .data
        .map(|data| data.positions)
        .ok_or_else(|| LookupError::Parse("response has neither data nor errors".to_string()))
}
