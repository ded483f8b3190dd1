//! Stateless post-hoc metrics (SPEC_FULL.md §4.8).
//!
//! Every function here takes `(intents, results, snapshots)` or a
//! subset and returns a plain typed report struct; no engine state is
//! touched or required. Reports are typed structs rather than loose
//! `serde_json::Value`, and `statrs` covers the mean/stdev computations
//! behind Brier scoring. Aggregation converts `Decimal` to `f64` to
//! feed `statrs`, a documented, metrics-only lossy step (see
//! `decimal::to_f64_lossy`); it is never used to produce a
//! ledger-affecting number.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::decimal::to_f64_lossy;
use crate::error::EngineError;
use crate::ledger::Ledger;
use crate::lmsr::LmsrMarketState;
use crate::types::{ExecutionResult, MarketStateSnapshot, OrderIntent, OrderStatus, OrderType, Side};

fn stats_of(values: &[Decimal]) -> (f64, f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let floats: Vec<f64> = values.iter().map(|v| to_f64_lossy(*v)).collect();
    let mean = Statistics::mean(floats.as_slice());
    let std_dev = if floats.len() > 1 {
        Statistics::std_dev(floats.as_slice())
    } else {
        0.0
    };
    let min = Statistics::min(floats.as_slice());
    let max = Statistics::max(floats.as_slice());
    (mean, std_dev, min, max)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TotalsReport {
    pub order_count: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    pub limit_count: usize,
    pub market_count: usize,
    pub filled_count: usize,
    pub partially_filled_count: usize,
    pub rejected_count: usize,
    pub cancelled_count: usize,
    pub submitted_qty: Decimal,
    pub filled_qty: Decimal,
    pub submitted_value: Decimal,
    pub filled_value: Decimal,
    pub fill_ratio: Decimal,
}

/// Order counts by side/type/status plus submitted-vs-filled qty/value
/// and the overall fill ratio (`filled_qty / submitted_qty`, zero when
/// nothing was submitted).
pub fn totals(intents: &[OrderIntent], results: &[ExecutionResult]) -> TotalsReport {
    let mut report = TotalsReport {
        order_count: intents.len(),
        ..Default::default()
    };
    for intent in intents {
        match intent.side {
            Side::Buy => report.buy_count += 1,
            Side::Sell => report.sell_count += 1,
        }
        match intent.order_type {
            OrderType::Limit => report.limit_count += 1,
            OrderType::Market => report.market_count += 1,
        }
        let qty = intent.qty.unwrap_or(Decimal::ZERO);
        report.submitted_qty += qty;
        if let Some(price) = intent.price {
            report.submitted_value += price * qty;
        }
    }
    for result in results {
        match result.status {
            OrderStatus::Filled => report.filled_count += 1,
            OrderStatus::PartiallyFilled => report.partially_filled_count += 1,
            OrderStatus::Rejected => report.rejected_count += 1,
            OrderStatus::Cancelled => report.cancelled_count += 1,
            OrderStatus::Open => {}
        }
        report.filled_qty += result.filled_qty;
        if let Some(avg) = result.avg_fill_price {
            report.filled_value += avg * result.filled_qty;
        }
    }
    report.fill_ratio = if report.submitted_qty > Decimal::ZERO {
        report.filled_qty / report.submitted_qty
    } else {
        Decimal::ZERO
    };
    report
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlippageStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub best: Option<Decimal>,
    pub worst: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlippageReport {
    pub all: SlippageStats,
    pub buy: SlippageStats,
    pub sell: SlippageStats,
}

fn slippage_stats(values: &[Decimal]) -> SlippageStats {
    let (mean, std_dev, min, max) = stats_of(values);
    // Lower slippage is better; "best" is the smallest signed value,
    // "worst" the largest (positive slippage means the fill was worse
    // than the reference price, per SPEC_FULL.md §4.6).
    let best = values.iter().copied().reduce(Decimal::min);
    let worst = values.iter().copied().reduce(Decimal::max);
    SlippageStats { mean, std_dev, min, max, best, worst }
}

pub fn slippage(results: &[ExecutionResult]) -> SlippageReport {
    let all: Vec<Decimal> = results.iter().filter_map(|r| r.slippage).collect();
    let buy: Vec<Decimal> = results
        .iter()
        .filter(|r| r.intent.side == Side::Buy)
        .filter_map(|r| r.slippage)
        .collect();
    let sell: Vec<Decimal> = results
        .iter()
        .filter(|r| r.intent.side == Side::Sell)
        .filter_map(|r| r.slippage)
        .collect();
    SlippageReport {
        all: slippage_stats(&all),
        buy: slippage_stats(&buy),
        sell: slippage_stats(&sell),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceImpactReport {
    pub mean: f64,
    pub std_dev: f64,
    pub max: f64,
    pub cumulative: Decimal,
}

pub fn price_impact(results: &[ExecutionResult]) -> PriceImpactReport {
    let values: Vec<Decimal> = results.iter().filter_map(|r| r.price_impact).collect();
    let (mean, std_dev, _min, max) = stats_of(&values);
    let cumulative = values.iter().copied().sum();
    PriceImpactReport { mean, std_dev, max, cumulative }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraderAggregate {
    pub trader_id: String,
    pub volume: Decimal,
    pub trade_count: usize,
    pub mean_slippage: f64,
}

/// Per-trader volume, trade count, and mean slippage, keyed by trader id
/// in a `BTreeMap` so iteration order (and therefore any serialized
/// export) is deterministic regardless of `HashMap` bucket order.
pub fn per_trader(results: &[ExecutionResult]) -> Vec<TraderAggregate> {
    let mut volumes: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut slippages: BTreeMap<String, Vec<Decimal>> = BTreeMap::new();

    for result in results {
        let id = result.intent.trader_id.clone();
        *volumes.entry(id.clone()).or_insert(Decimal::ZERO) += result.filled_qty;
        if !result.fills.is_empty() {
            *counts.entry(id.clone()).or_insert(0) += result.fills.len();
        }
        if let Some(s) = result.slippage {
            slippages.entry(id).or_default().push(s);
        }
    }

    volumes
        .into_iter()
        .map(|(trader_id, volume)| {
            let trade_count = counts.get(&trader_id).copied().unwrap_or(0);
            let mean_slippage = slippages
                .get(&trader_id)
                .map(|v| stats_of(v).0)
                .unwrap_or(0.0);
            TraderAggregate { trader_id, volume, trade_count, mean_slippage }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: u64,
    pub mid_price: Option<Decimal>,
    pub spread: Option<Decimal>,
    pub bid_depth: Option<Decimal>,
    pub ask_depth: Option<Decimal>,
    pub lmsr_p_yes: Option<Decimal>,
    pub lmsr_p_no: Option<Decimal>,
}

/// One point per snapshot, sampled once per intent by the driver.
pub fn time_series(snapshots: &[MarketStateSnapshot]) -> Vec<TimeSeriesPoint> {
    snapshots
        .iter()
        .map(|s| TimeSeriesPoint {
            timestamp: s.timestamp,
            mid_price: s.mid_price,
            spread: match (s.best_bid, s.best_ask) {
                (Some(bid), Some(ask)) => Some(ask - bid),
                _ => None,
            },
            bid_depth: s.bid_depth,
            ask_depth: s.ask_depth,
            lmsr_p_yes: s.lmsr_p_yes,
            lmsr_p_no: s.lmsr_p_no,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmsrSettlementMetrics {
    pub total_collected: Decimal,
    pub total_payout: Decimal,
    pub profit_loss: Decimal,
    pub worst_case_loss: Decimal,
    /// `profitLoss / worstCaseLoss`; `None` when `worstCaseLoss` is zero.
    pub realized_to_worst_case_ratio: Option<Decimal>,
}

pub fn lmsr_settlement_metrics(result: &crate::types::SettlementResult) -> LmsrSettlementMetrics {
    let ratio = if result.worst_case_loss != Decimal::ZERO {
        Some(result.profit_loss / result.worst_case_loss)
    } else {
        None
    };
    LmsrSettlementMetrics {
        total_collected: result.total_collected,
        total_payout: result.total_payout,
        profit_loss: result.profit_loss,
        worst_case_loss: result.worst_case_loss,
        realized_to_worst_case_ratio: ratio,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraderSnapshotRow {
    pub trader_id: String,
    pub cash: Decimal,
    pub yes_shares: Decimal,
    pub no_shares: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenSnapshot {
    pub q_yes: Decimal,
    pub q_no: Decimal,
    pub total_collected: Decimal,
    pub p_yes: Decimal,
    pub p_no: Decimal,
    pub traders: Vec<TraderSnapshotRow>,
}

/// Textual, bit-exact-comparable snapshot of LMSR state plus every
/// trader's balances (SPEC_FULL.md §6), sorted by trader id for
/// determinism.
pub fn golden_snapshot(state: &LmsrMarketState, ledger: &Ledger) -> Result<GoldenSnapshot, crate::error::EngineError> {
    let (p_yes, p_no) = state.get_prices()?;
    let mut traders: Vec<TraderSnapshotRow> = ledger
        .traders()
        .map(|t| TraderSnapshotRow {
            trader_id: t.id.clone(),
            cash: t.cash,
            yes_shares: t.yes_shares,
            no_shares: t.no_shares,
        })
        .collect();
    traders.sort_by(|a, b| a.trader_id.cmp(&b.trader_id));
    Ok(GoldenSnapshot {
        q_yes: state.q_yes,
        q_no: state.q_no,
        total_collected: state.total_collected,
        p_yes,
        p_no,
        traders,
    })
}

/// CSV export (SPEC_FULL.md §6): one row per result, decimals as
/// strings, empty field for absent optionals.
pub fn results_to_csv(results: &[ExecutionResult]) -> Result<String, EngineError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record([
        "intentId", "timestamp", "traderId", "outcome", "side", "orderType",
        "price", "qty", "status", "avgFillPrice", "slippage", "priceImpact",
    ])?;
    for r in results {
        writer.write_record(&[
            r.intent.intent_id.clone(),
            r.timestamp.to_string(),
            r.intent.trader_id.clone(),
            r.intent.outcome.as_str().to_string(),
            format!("{:?}", r.intent.side).to_uppercase(),
            format!("{:?}", r.intent.order_type).to_uppercase(),
            r.intent.price.map(crate::decimal::to_decimal_string).unwrap_or_default(),
            r.intent.qty.map(crate::decimal::to_decimal_string).unwrap_or_default(),
            format!("{:?}", r.status).to_uppercase(),
            r.avg_fill_price.map(crate::decimal::to_decimal_string).unwrap_or_default(),
            r.slippage.map(crate::decimal::to_decimal_string).unwrap_or_default(),
            r.price_impact.map(crate::decimal::to_decimal_string).unwrap_or_default(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| EngineError::invalid_state(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| EngineError::invalid_state(e.to_string()))
}

impl From<csv::Error> for EngineError {
    fn from(e: csv::Error) -> Self {
        EngineError::invalid_state(e.to_string())
    }
}
