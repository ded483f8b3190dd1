//! Shared data model (SPEC_FULL.md §3): outcome/side/order tags, the
//! trader account, order intents, fills, execution results, and market
//! snapshots common to every engine variant.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Yes,
    No,
}

impl Outcome {
    pub fn opposite(self) -> Outcome {
        match self {
            Outcome::Yes => Outcome::No,
            Outcome::No => Outcome::Yes,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Yes => "YES",
            Outcome::No => "NO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Limit,
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// Which execution surface produced (part of) a result. A hybrid fill
/// carries both tags, e.g. `"CLOB+LMSR"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EngineTag {
    Clob,
    Lmsr,
    Hybrid,
}

impl EngineTag {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineTag::Clob => "CLOB",
            EngineTag::Lmsr => "LMSR",
            EngineTag::Hybrid => "CLOB+LMSR",
        }
    }
}

/// One per trader, lives for the lifetime of the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraderAccount {
    pub id: String,
    pub cash: Decimal,
    pub yes_shares: Decimal,
    /// Per-trader bookkeeping of LMSR NO exposure, needed to report
    /// settlement payouts; the CLOB never touches this field.
    pub no_shares: Decimal,
    pub open_order_ids: BTreeSet<String>,
    pub pending_sell_qty: Decimal,
}

impl TraderAccount {
    pub fn new(id: impl Into<String>, cash: Decimal) -> Self {
        TraderAccount {
            id: id.into(),
            cash,
            yes_shares: Decimal::ZERO,
            no_shares: Decimal::ZERO,
            open_order_ids: BTreeSet::new(),
            pending_sell_qty: Decimal::ZERO,
        }
    }

    /// The authoritative sellable budget (SPEC_FULL.md §9).
    pub fn sellable_yes_qty(&self) -> Decimal {
        self.yes_shares - self.pending_sell_qty
    }
}

/// A single incoming order, uniform across engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    pub intent_id: String,
    pub trader_id: String,
    pub outcome: Outcome,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    pub qty: Option<Decimal>,
    pub spend: Option<Decimal>,
    pub timestamp: u64,
}

impl OrderIntent {
    /// SPEC_FULL.md §4.6: exactly one of qty/spend must be set; price
    /// required for LIMIT.
    pub fn validate(&self) -> Result<(), crate::error::EngineError> {
        use crate::error::EngineError;
        if self.qty.is_some() == self.spend.is_some() {
            return Err(EngineError::invalid_input(
                "exactly one of qty or spend must be set",
            ));
        }
        if let Some(qty) = self.qty {
            if qty <= Decimal::ZERO {
                return Err(EngineError::invalid_input("qty must be strictly positive"));
            }
        }
        if let Some(spend) = self.spend {
            if spend <= Decimal::ZERO {
                return Err(EngineError::invalid_input("spend must be strictly positive"));
            }
        }
        if self.order_type == OrderType::Limit {
            match self.price {
                Some(p) if p > Decimal::ZERO && p < Decimal::ONE => {}
                _ => {
                    return Err(EngineError::invalid_input(
                        "price is required for LIMIT orders and must lie in (0,1)",
                    ))
                }
            }
        }
        Ok(())
    }
}

/// An immutable fill event, produced by a match in the CLOB or by an
/// LMSR execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub trade_id: String,
    pub price: Decimal,
    pub qty: Decimal,
    pub engine: EngineTag,
    pub maker_order_id: Option<String>,
    pub timestamp: u64,
}

/// The outcome of processing one `OrderIntent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub engine: EngineTag,
    pub intent: OrderIntent,
    pub status: OrderStatus,
    pub fills: Vec<Fill>,
    pub filled_qty: Decimal,
    pub remaining_qty: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub price_before: Decimal,
    pub price_after: Decimal,
    pub slippage: Option<Decimal>,
    pub price_impact: Option<Decimal>,
    pub rejection_reason: Option<String>,
    pub balance_deltas: Vec<(String, Decimal, Decimal)>,
    pub timestamp: u64,
    /// Monotonically increasing across a ledger's lifetime; lets
    /// `applyExecution` be idempotent with respect to replays.
    pub sequence: u64,
    pub market_snapshot: Option<MarketStateSnapshot>,
}

/// Per-trader payout recorded by `settle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementPayout {
    pub trader_id: String,
    pub payout: Decimal,
}

/// The outcome of settling an LMSR market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementResult {
    pub outcome: Outcome,
    pub payouts: Vec<SettlementPayout>,
    pub total_collected: Decimal,
    pub total_payout: Decimal,
    pub profit_loss: Decimal,
    pub worst_case_loss: Decimal,
    pub sequence: u64,
}

impl ExecutionResult {
    pub fn rejected(
        engine: EngineTag,
        intent: OrderIntent,
        reason: impl Into<String>,
        price_ref: Decimal,
        timestamp: u64,
        sequence: u64,
    ) -> Self {
        ExecutionResult {
            engine,
            status: OrderStatus::Rejected,
            fills: Vec::new(),
            filled_qty: Decimal::ZERO,
            remaining_qty: intent.qty.unwrap_or(Decimal::ZERO),
            avg_fill_price: None,
            price_before: price_ref,
            price_after: price_ref,
            slippage: None,
            price_impact: None,
            rejection_reason: Some(reason.into()),
            balance_deltas: Vec::new(),
            timestamp,
            sequence,
            intent,
            market_snapshot: None,
        }
    }
}

/// A read-only snapshot of a market's state at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStateSnapshot {
    pub timestamp: u64,
    pub mid_price: Option<Decimal>,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub bid_depth: Option<Decimal>,
    pub ask_depth: Option<Decimal>,
    pub lmsr_p_yes: Option<Decimal>,
    pub lmsr_p_no: Option<Decimal>,
    pub lmsr_q_yes: Option<Decimal>,
    pub lmsr_q_no: Option<Decimal>,
}
