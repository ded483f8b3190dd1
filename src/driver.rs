//! Deterministic simulation driver (SPEC_FULL.md §4.7).
//!
//! Single-threaded loop: for every generated intent, snapshot the
//! market, process the intent, and append both plus the log slice
//! produced. `run_batch` fans the same loop out across N independent
//! seeds of the same scenario via rayon; each run owns its own
//! `Ledger`/engine/log, so no state crosses runs.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DriverConfig;
use crate::engine::TradingEngine;
use crate::error::EngineError;
use crate::ledger::Ledger;
use crate::log::{LogEvent, LogSink};
use crate::scenario::{self, ScenarioConfig};
use crate::types::{ExecutionResult, MarketStateSnapshot, OrderIntent};

/// Everything produced by one run: the generated intents, the per-intent
/// result and market snapshot (taken *before* that intent is processed,
/// per §4.7), the final trader balances, and the full log stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub seed: u32,
    pub intents: Vec<OrderIntent>,
    pub results: Vec<ExecutionResult>,
    pub snapshots: Vec<MarketStateSnapshot>,
    pub final_traders: Vec<crate::types::TraderAccount>,
    pub logs: Vec<LogEvent>,
}

/// Runs one scenario against `engine`, starting from a freshly
/// initialized ledger seeded with `scenario_cfg.num_traders` traders
/// each holding `scenario_cfg.initial_cash`. Returns an error only on a
/// fatal `EngineError` (`PrecisionFailure`); every ordinary rejection
/// is captured in the corresponding `ExecutionResult`, not propagated.
pub fn run(
    engine: &mut dyn TradingEngine,
    scenario_cfg: &ScenarioConfig,
) -> Result<SimulationOutput, EngineError> {
    let traders = scenario::trader_ids(scenario_cfg.num_traders);
    let mut ledger = Ledger::init(traders.into_iter().map(|id| (id, scenario_cfg.initial_cash)));
    let intents = scenario::generate(scenario_cfg);
    let mut log = LogSink::new();

    let mut results = Vec::with_capacity(intents.len());
    let mut snapshots = Vec::with_capacity(intents.len());

    for intent in &intents {
        snapshots.push(engine.snapshot(intent.timestamp));
        let result = engine.submit(&mut ledger, intent.clone(), intent.timestamp, &mut log)?;
        results.push(result);
    }

    let final_traders: Vec<_> = ledger.traders().cloned().collect();

    Ok(SimulationOutput {
        seed: scenario_cfg.seed,
        intents,
        results,
        snapshots,
        final_traders,
        logs: log.events().to_vec(),
    })
}

/// Logs the resolved configuration, then runs the single-scenario loop
/// above.
pub fn run_from_driver_config(
    engine: &mut dyn TradingEngine,
    cfg: &DriverConfig,
) -> Result<SimulationOutput, EngineError> {
    cfg.print_config();
    let scenario_cfg = ScenarioConfig::from(*cfg);
    run(engine, &scenario_cfg)
}

/// Runs the same scenario shape across many seeds in parallel, one
/// independent engine/ledger per seed. `make_engine` is called once per
/// seed (from whichever thread rayon schedules it on) so each run gets
/// an isolated `TradingEngine` instance; no state crosses runs.
pub fn run_batch<E, F>(seeds: &[u32], base_cfg: &ScenarioConfig, make_engine: F) -> Vec<Result<SimulationOutput, EngineError>>
where
    E: TradingEngine + Send,
    F: Fn() -> E + Sync,
{
    seeds
        .par_iter()
        .map(|&seed| {
            let mut cfg = *base_cfg;
            cfg.seed = seed;
            let mut engine = make_engine();
            let outcome = run(&mut engine, &cfg);
            info!(seed, "simulation run complete");
            outcome
        })
        .collect()
}
