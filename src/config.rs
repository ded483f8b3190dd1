//! Runtime configuration, read from the environment: `from_env()`
//! parses with a fallback to a sane default, and `validate()` clamps
//! out-of-range values and logs a warning rather than failing hard.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingMode {
    ClobFirst,
    LmsrFirst,
    SpreadBased,
}

/// Configuration for the LMSR engine.
#[derive(Debug, Clone, Copy)]
pub struct LmsrConfig {
    pub b: Decimal,
}

impl Default for LmsrConfig {
    fn default() -> Self {
        LmsrConfig { b: dec!(100) }
    }
}

impl LmsrConfig {
    pub fn from_env() -> Self {
        let b = std::env::var("LMSR_B")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| Self::default().b);
        let mut cfg = LmsrConfig { b };
        cfg.validate();
        cfg
    }

    pub fn validate(&mut self) {
        if self.b <= Decimal::ZERO {
            warn!(b = %self.b, "LMSR liquidity parameter b must be positive, resetting to default");
            self.b = Self::default().b;
        }
    }
}

/// Configuration for the CLOB engine.
#[derive(Debug, Clone, Copy)]
pub struct ClobConfig {
    pub tick_size: Decimal,
}

impl Default for ClobConfig {
    fn default() -> Self {
        ClobConfig { tick_size: dec!(0.01) }
    }
}

impl ClobConfig {
    pub fn from_env() -> Self {
        let tick_size = std::env::var("CLOB_TICK_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| Self::default().tick_size);
        let mut cfg = ClobConfig { tick_size };
        cfg.validate();
        cfg
    }

    pub fn validate(&mut self) {
        let max_tick = dec!(0.01);
        if self.tick_size <= Decimal::ZERO || self.tick_size > max_tick {
            warn!(
                tick_size = %self.tick_size,
                "CLOB tick size out of (0, 0.01], resetting to default"
            );
            self.tick_size = Self::default().tick_size;
        }
    }
}

/// Configuration for the hybrid router.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    pub routing_mode: RoutingMode,
    pub max_spread: Decimal,
    pub min_depth: Decimal,
    pub depth_ticks: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            routing_mode: RoutingMode::ClobFirst,
            max_spread: dec!(0.05),
            min_depth: dec!(10),
            depth_ticks: 5,
        }
    }
}

impl RouterConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("ROUTING_MODE") {
            cfg.routing_mode = match v.as_str() {
                "CLOB_FIRST" => RoutingMode::ClobFirst,
                "LMSR_FIRST" => RoutingMode::LmsrFirst,
                "SPREAD_BASED" => RoutingMode::SpreadBased,
                other => {
                    warn!(value = other, "unknown ROUTING_MODE, keeping default");
                    cfg.routing_mode
                }
            };
        }
        if let Ok(v) = std::env::var("MAX_SPREAD") {
            if let Ok(d) = v.parse() {
                cfg.max_spread = d;
            }
        }
        if let Ok(v) = std::env::var("MIN_DEPTH") {
            if let Ok(d) = v.parse() {
                cfg.min_depth = d;
            }
        }
        if let Ok(v) = std::env::var("DEPTH_TICKS") {
            if let Ok(d) = v.parse() {
                cfg.depth_ticks = d;
            }
        }
        cfg.validate();
        cfg
    }

    pub fn validate(&mut self) {
        if self.max_spread < Decimal::ZERO {
            warn!("max_spread negative, clamping to 0");
            self.max_spread = Decimal::ZERO;
        }
        if self.min_depth < Decimal::ZERO {
            warn!("min_depth negative, clamping to 0");
            self.min_depth = Decimal::ZERO;
        }
        if self.depth_ticks == 0 {
            warn!("depth_ticks must be >= 1, resetting to 1");
            self.depth_ticks = 1;
        }
    }
}

/// Configuration for the deterministic simulation driver.
#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    pub seed: u32,
    pub num_traders: usize,
    pub initial_cash: Decimal,
    pub num_orders: usize,
    pub time_window: u64,
    pub base_arrival_rate: f64,
    pub order_size_min: Decimal,
    pub order_size_max: Decimal,
    pub price_spread: Decimal,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            seed: 42,
            num_traders: 10,
            initial_cash: dec!(10000),
            num_orders: 200,
            time_window: 3_600,
            base_arrival_rate: 1.0,
            order_size_min: dec!(1),
            order_size_max: dec!(50),
            price_spread: dec!(0.02),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl DriverConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let mut cfg = DriverConfig {
            seed: env_parse("SIM_SEED", d.seed),
            num_traders: env_parse("SIM_NUM_TRADERS", d.num_traders),
            initial_cash: env_parse("SIM_INITIAL_CASH", d.initial_cash),
            num_orders: env_parse("SIM_NUM_ORDERS", d.num_orders),
            time_window: env_parse("SIM_TIME_WINDOW", d.time_window),
            base_arrival_rate: env_parse("SIM_ARRIVAL_RATE", d.base_arrival_rate),
            order_size_min: env_parse("SIM_ORDER_SIZE_MIN", d.order_size_min),
            order_size_max: env_parse("SIM_ORDER_SIZE_MAX", d.order_size_max),
            price_spread: env_parse("SIM_PRICE_SPREAD", d.price_spread),
        };
        cfg.validate();
        cfg
    }

    pub fn validate(&mut self) {
        if self.num_traders == 0 {
            warn!("num_traders must be >= 1, resetting to default");
            self.num_traders = Self::default().num_traders;
        }
        if self.order_size_min <= Decimal::ZERO || self.order_size_min > self.order_size_max {
            warn!("order_size_min/max out of order, resetting to defaults");
            self.order_size_min = Self::default().order_size_min;
            self.order_size_max = Self::default().order_size_max;
        }
        if self.base_arrival_rate <= 0.0 {
            warn!("base_arrival_rate must be positive, resetting to default");
            self.base_arrival_rate = Self::default().base_arrival_rate;
        }
    }

    pub fn print_config(&self) {
        tracing::info!(
            seed = self.seed,
            num_traders = self.num_traders,
            num_orders = self.num_orders,
            time_window = self.time_window,
            "driver configuration"
        );
    }
}
