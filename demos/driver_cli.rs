//! Runnable demonstration of the trading core (SPEC_FULL.md §6):
//! resolves `DriverConfig`/`RouterConfig` from the environment, runs
//! one scenario through a `HybridEngine`, and writes the JSON log dump,
//! the CSV export, and a golden snapshot, to stdout or to the path
//! given as `$1` if one is provided.

use anyhow::Result;
use binary_market_core::config::{ClobConfig, DriverConfig, LmsrConfig, RouterConfig};
use binary_market_core::driver;
use binary_market_core::metrics;
use binary_market_core::router::HybridEngine;
use binary_market_core::scenario::ScenarioConfig;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info,binary_market_core=debug")
        .init();

    println!("Binary prediction-market trading core: simulation driver");
    println!("===========================================================\n");

    let driver_cfg = DriverConfig::from_env();
    let router_cfg = RouterConfig::from_env();
    let lmsr_cfg = LmsrConfig::from_env();
    let clob_cfg = ClobConfig::from_env();
    driver_cfg.print_config();

    let mut engine = HybridEngine::new(clob_cfg.tick_size, lmsr_cfg.b, router_cfg)?;
    let scenario_cfg = ScenarioConfig::from(driver_cfg);

    tracing::info!("running scenario");
    let output = driver::run(&mut engine, &scenario_cfg)?;

    let totals = metrics::totals(&output.intents, &output.results);
    let slippage = metrics::slippage(&output.results);
    let price_impact = metrics::price_impact(&output.results);
    let per_trader = metrics::per_trader(&output.results);
    let time_series = metrics::time_series(&output.snapshots);

    tracing::info!(
        orders = totals.order_count,
        filled = totals.filled_count,
        fill_ratio = %totals.fill_ratio,
        "simulation complete"
    );

    let log_json = serde_json::to_string_pretty(&output.logs)?;
    let csv_text = metrics::results_to_csv(&output.results)?;
    let golden = metrics::golden_snapshot(&engine.lmsr.state, &{
        // Reconstruct a read-only ledger view from final trader balances
        // for the golden snapshot; the driver doesn't hand back the
        // live `Ledger` it owned internally.
        let mut ledger = binary_market_core::ledger::Ledger::init(
            output.final_traders.iter().map(|t| (t.id.clone(), t.cash)),
        );
        for trader in &output.final_traders {
            if let Some(slot) = ledger.trader_mut(&trader.id) {
                slot.yes_shares = trader.yes_shares;
                slot.no_shares = trader.no_shares;
            }
        }
        ledger
    })?;
    let golden_json = serde_json::to_string_pretty(&golden)?;

    let report = serde_json::json!({
        "totals": totals,
        "slippage": slippage,
        "priceImpact": price_impact,
        "perTrader": per_trader,
        "timeSeries": time_series,
        "golden": golden,
    });
    let report_json = serde_json::to_string_pretty(&report)?;

    match std::env::args().nth(1) {
        Some(path) => {
            std::fs::write(format!("{path}.logs.json"), &log_json)?;
            std::fs::write(format!("{path}.trades.csv"), &csv_text)?;
            std::fs::write(format!("{path}.golden.json"), &golden_json)?;
            std::fs::write(format!("{path}.report.json"), &report_json)?;
            println!("wrote {path}.{{logs.json,trades.csv,golden.json,report.json}}");
        }
        None => {
            println!("--- logs ---\n{log_json}\n");
            println!("--- trades.csv ---\n{csv_text}");
            println!("--- golden snapshot ---\n{golden_json}");
            println!("--- report ---\n{report_json}");
        }
    }

    Ok(())
}
