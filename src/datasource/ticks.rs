//! Uniswap v3 tick math and conversion of subgraph records into positions.
//!
//! Tick powers are evaluated in `f64` and converted to `Decimal` at the end;
//! raw liquidity values routinely exceed what `Decimal` can hold mid-formula.

use super::LookupError;
use crate::domain::{CreatedKey, Decimal, Position};
use chrono::DateTime;
use serde::Deserialize;

const TICK_BASE: f64 = 1.0001;

/// `1.0001^tick × 10^(decimals1 − decimals0)`.
pub fn tick_to_price(tick: i32, decimals0: u32, decimals1: u32) -> f64 {
    let scale = decimals1 as i32 - decimals0 as i32;
    TICK_BASE.powi(tick) * 10f64.powi(scale)
}

/// Raw (unscaled) square-root price at `tick`.
pub fn sqrt_price_at(tick: i32) -> f64 {
    TICK_BASE.powf(tick as f64 / 2.0)
}

/// Raw token amounts held by `liquidity` in `[tick_lower, tick_upper)` at `tick`.
///
/// Below the range everything is token0; at or above it everything is token1.
pub fn amounts_for_liquidity(liquidity: f64, tick: i32, tick_lower: i32, tick_upper: i32) -> (f64, f64) {
    let (lower, upper) = if tick_lower <= tick_upper {
        (tick_lower, tick_upper)
    } else {
        (tick_upper, tick_lower)
    };
    let sqrt_a = sqrt_price_at(lower);
    let sqrt_b = sqrt_price_at(upper);

    if tick < lower {
        (liquidity * (sqrt_b - sqrt_a) / (sqrt_a * sqrt_b), 0.0)
    } else if tick >= upper {
        (0.0, liquidity * (sqrt_b - sqrt_a))
    } else {
        let sqrt_p = sqrt_price_at(tick);
        (
            liquidity * (sqrt_b - sqrt_p) / (sqrt_p * sqrt_b),
            liquidity * (sqrt_p - sqrt_a),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubgraphToken {
    pub symbol: String,
    pub decimals: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgraphPool {
    pub id: String,
    pub token0: SubgraphToken,
    pub token1: SubgraphToken,
    pub fee_tier: String,
    pub tick: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgraphTick {
    pub tick_idx: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubgraphTransaction {
    pub timestamp: String,
}

/// One `positions` entry as returned by the Uniswap v3 subgraph.
/// Numeric fields arrive as strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgraphPosition {
    pub id: String,
    pub pool: SubgraphPool,
    pub tick_lower: SubgraphTick,
    pub tick_upper: SubgraphTick,
    pub liquidity: String,
    pub deposited_token0: String,
    pub deposited_token1: String,
    pub collected_fees_token0: String,
    pub collected_fees_token1: String,
    pub transaction: SubgraphTransaction,
}

impl SubgraphPosition {
    /// Build a tracked position. Values are denominated in token1.
    ///
    /// * invested: deposits, token0 valued at the current price
    /// * current: amounts implied by `liquidity` at the current tick
    /// * collected: fees already collected, valued the same way
    pub fn to_position(&self, simulated: bool) -> Result<Position, LookupError> {
        let decimals0: u32 = parse_field("token0.decimals", &self.pool.token0.decimals)?;
        let decimals1: u32 = parse_field("token1.decimals", &self.pool.token1.decimals)?;
        let tick_lower: i32 = parse_field("tickLower", &self.tick_lower.tick_idx)?;
        let tick_upper: i32 = parse_field("tickUpper", &self.tick_upper.tick_idx)?;
        let liquidity: f64 = parse_field("liquidity", &self.liquidity)?;
        let deposited0: f64 = parse_field("depositedToken0", &self.deposited_token0)?;
        let deposited1: f64 = parse_field("depositedToken1", &self.deposited_token1)?;
        let fees0: f64 = parse_field("collectedFeesToken0", &self.collected_fees_token0)?;
        let fees1: f64 = parse_field("collectedFeesToken1", &self.collected_fees_token1)?;
        let timestamp: i64 = parse_field("transaction.timestamp", &self.transaction.timestamp)?;

        // A pool without a tick has not been initialized; treat it as sitting at the lower bound.
        let tick: i32 = match &self.pool.tick {
            Some(raw) => parse_field("pool.tick", raw)?,
            None => tick_lower,
        };

        let price = tick_to_price(tick, decimals0, decimals1);
        let (raw0, raw1) = amounts_for_liquidity(liquidity, tick, tick_lower, tick_upper);
        let amount0 = raw0 / 10f64.powi(decimals0 as i32);
        let amount1 = raw1 / 10f64.powi(decimals1 as i32);

        let created_at = DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| LookupError::Parse(format!("timestamp out of range: {}", timestamp)))?;

        let mut position = Position::new(
            format!("{}/{}", self.pool.token0.symbol, self.pool.token1.symbol),
            CreatedKey::from_instant(created_at),
        );
        position.network = "Ethereum".to_string();
        position.dex = "Uniswap".to_string();
        position.invested = to_decimal("invested", deposited0 * price + deposited1)?;
        position.current = to_decimal("current", amount0 * price + amount1)?;
        position.collected = to_decimal("collected", fees0 * price + fees1)?;
        position.uncollected = Decimal::zero();
        position.range_min = Some(to_decimal("rangeMin", tick_to_price(tick_lower, decimals0, decimals1))?);
        position.range_max = Some(to_decimal("rangeMax", tick_to_price(tick_upper, decimals0, decimals1))?);
        position.current_price = Some(to_decimal("currentPrice", price)?);
        position.is_tracked = true;
        position.is_simulated = simulated;
        position.pool_url = Some(format!(
            "https://app.uniswap.org/positions/v3/ethereum/{}",
            self.id
        ));
        Ok(position)
    }
}

fn parse_field<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, LookupError> {
    raw.trim()
        .parse()
        .map_err(|_| LookupError::Parse(format!("invalid {}: {:?}", name, raw)))
}

fn to_decimal(name: &str, value: f64) -> Result<Decimal, LookupError> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(8))
        .ok_or_else(|| LookupError::Parse(format!("{} out of range: {}", name, value)))
}
