//! Binary prediction-market trading core.
//!
//! An LMSR automated market maker, a central limit order book, and a
//! hybrid router blending the two behind one `TradingEngine` facade,
//! plus the deterministic simulation driver, metrics, and typed log
//! sink needed to exercise and observe them.

pub mod clob;
pub mod config;
pub mod decimal;
pub mod driver;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod lmsr;
pub mod log;
pub mod metrics;
pub mod rng;
pub mod router;
pub mod scenario;
pub mod types;
