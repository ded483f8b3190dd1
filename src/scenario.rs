//! Synthetic order-flow scenario generator (SPEC_FULL.md §4.7).
//!
//! This crate owns only the *shape* of the generated `OrderIntent`
//! stream (spec.md §1 places the elaborate agent/workload models for a
//! full microstructure simulator out of scope); what's implemented
//! here is the minimal generator the driver needs to exercise an
//! engine deterministically: exponential inter-arrivals truncated at a
//! time window, randomized side/type/size/price, and an optional
//! one-shot "shock" that widens spread and accelerates arrivals from a
//! configured time onward (thin/thick liquidity and price-shock
//! scenario variants are expressed by varying these config fields, not
//! by separate code paths).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::DriverConfig;
use crate::rng::Rng;
use crate::types::{OrderIntent, OrderType, Outcome, Side};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub seed: u32,
    pub num_traders: usize,
    pub initial_cash: Decimal,
    pub num_orders: usize,
    pub time_window: u64,
    pub base_arrival_rate: f64,
    pub order_size_min: Decimal,
    pub order_size_max: Decimal,
    pub price_spread: Decimal,
    /// Logical time at which a liquidity/price shock begins, if any.
    pub shock_at: Option<u64>,
    /// Arrival-rate and size multiplier applied from `shock_at` onward.
    pub shock_multiplier: Decimal,
    /// Fraction of orders generated as LIMIT (vs MARKET), in `[0,1]`.
    pub limit_order_fraction: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            seed: 42,
            num_traders: 10,
            initial_cash: dec!(10000),
            num_orders: 200,
            time_window: 3_600,
            base_arrival_rate: 1.0,
            order_size_min: dec!(1),
            order_size_max: dec!(50),
            price_spread: dec!(0.02),
            shock_at: None,
            shock_multiplier: dec!(1),
            limit_order_fraction: 0.7,
        }
    }
}

impl From<DriverConfig> for ScenarioConfig {
    fn from(d: DriverConfig) -> Self {
        ScenarioConfig {
            seed: d.seed,
            num_traders: d.num_traders,
            initial_cash: d.initial_cash,
            num_orders: d.num_orders,
            time_window: d.time_window,
            base_arrival_rate: d.base_arrival_rate,
            order_size_min: d.order_size_min,
            order_size_max: d.order_size_max,
            price_spread: d.price_spread,
            ..ScenarioConfig::default()
        }
    }
}

/// `trader-0`, `trader-1`, ... up to `num_traders`.
pub fn trader_ids(num_traders: usize) -> Vec<String> {
    (0..num_traders).map(|i| format!("trader-{i}")).collect()
}

fn decimal_from_f64(x: f64) -> Decimal {
    use rust_decimal::prelude::FromPrimitive;
    Decimal::from_f64(x).unwrap_or(Decimal::ZERO)
}

/// Generates a finite, ordered `OrderIntent` stream. Identical `cfg`
/// (including `cfg.seed`) produces a byte-identical stream, the
/// determinism guarantee in SPEC_FULL.md §4.7.
pub fn generate(cfg: &ScenarioConfig) -> Vec<OrderIntent> {
    let mut rng = Rng::new(cfg.seed);
    let traders = trader_ids(cfg.num_traders);
    let mut intents = Vec::with_capacity(cfg.num_orders);
    let mut t: f64 = 0.0;
    let center = dec!(0.5);

    for i in 0..cfg.num_orders {
        let shocked = cfg.shock_at.map(|s| t >= s as f64).unwrap_or(false);
        let shock_mult = if shocked {
            cfg.shock_multiplier
        } else {
            Decimal::ONE
        };
        let arrival_rate = cfg.base_arrival_rate
            * decimal_to_f64_lossy(shock_mult).max(0.0001);
        let inter_arrival = rng.random_exp(arrival_rate);
        t += inter_arrival;
        if t > cfg.time_window as f64 {
            break;
        }

        let trader_id = rng.random_choice(&traders).clone();
        let side = if rng.random_float() < 0.5 {
            Side::Buy
        } else {
            Side::Sell
        };
        let order_type = if rng.random_float() < cfg.limit_order_fraction {
            OrderType::Limit
        } else {
            OrderType::Market
        };
        let qty = rng.random_range(cfg.order_size_min, cfg.order_size_max * shock_mult.max(Decimal::ONE));

        let price = if order_type == OrderType::Limit {
            let spread = cfg.price_spread * shock_mult;
            let offset = decimal_from_f64((rng.random_float() - 0.5) * 2.0) * spread;
            let raw = center + offset;
            Some(clamp_price(raw))
        } else {
            None
        };

        intents.push(OrderIntent {
            intent_id: format!("intent-{i}"),
            trader_id,
            outcome: Outcome::Yes,
            side,
            order_type,
            price,
            qty: Some(qty),
            spend: None,
            timestamp: t.round() as u64,
        });
    }

    intents
}

fn clamp_price(p: Decimal) -> Decimal {
    let epsilon = dec!(0.0001);
    let one = Decimal::ONE;
    if p <= Decimal::ZERO {
        epsilon
    } else if p >= one {
        one - epsilon
    } else {
        p
    }
}

fn decimal_to_f64_lossy(d: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    d.to_f64().unwrap_or(1.0)
}
