//! Unified trading-engine facade (SPEC_FULL.md §4.6): one trait spans
//! the LMSR AMM and the CLOB (and, in `router.rs`, their hybrid blend),
//! so a caller (the simulation driver, a demo binary) can hold a
//! `&mut dyn TradingEngine` instead of branching on which concrete
//! engine it's driving. Both wrappers funnel their `ExecutionResult`
//! into the shared [`crate::log::log_execution_result`] helper so the
//! three facades can't drift on what gets logged for the same result.

use rust_decimal::Decimal;

use crate::clob::{CancelResult, OrderBook};
use crate::error::EngineError;
use crate::ledger::Ledger;
use crate::lmsr::LmsrMarketState;
use crate::log::{log_execution_result, LogPayload, LogSink, OrderReceivedData};
use crate::types::{EngineTag, ExecutionResult, MarketStateSnapshot, OrderIntent, Outcome, Side, SettlementResult};

/// What happened to a cancel request. LMSR has no resting orders;
/// every buy settles immediately, so `LmsrEngine::cancel` always
/// returns `Unsupported` rather than fabricate a CANCELLED result for
/// an order that was never outstanding.
#[derive(Debug, Clone)]
pub enum CancelOutcome {
    Cancelled(CancelResult),
    Unsupported,
}

pub trait TradingEngine {
    fn tag(&self) -> EngineTag;

    fn submit(
        &mut self,
        ledger: &mut Ledger,
        intent: OrderIntent,
        timestamp: u64,
        log: &mut LogSink,
    ) -> Result<ExecutionResult, EngineError>;

    fn cancel(
        &mut self,
        ledger: &mut Ledger,
        order_id: &str,
        timestamp: u64,
    ) -> Result<CancelOutcome, EngineError>;

    fn snapshot(&self, timestamp: u64) -> MarketStateSnapshot;
}

fn fallback_price_ref(state: &LmsrMarketState) -> Decimal {
    state
        .get_prices()
        .map(|(p_yes, _)| p_yes)
        .unwrap_or(Decimal::new(5, 1))
}

/// Wraps `LmsrMarketState` behind `TradingEngine`. Every BUY (qty- or
/// spend-denominated) routes to `lmsr::execute_buy`/`execute_buy_spend`;
/// SELL is rejected outright: the AMM has no short-sell/sell-to-close
/// path (SPEC_FULL.md §9, "CLOB is YES-only; NO exposure only via LMSR
/// buys" implies the converse: LMSR never unwinds a position either).
pub struct LmsrEngine {
    pub state: LmsrMarketState,
}

impl LmsrEngine {
    pub fn new(b: Decimal) -> Result<Self, EngineError> {
        Ok(LmsrEngine {
            state: LmsrMarketState::new(b)?,
        })
    }

    pub fn settle(&mut self, ledger: &mut Ledger, outcome: Outcome, timestamp: u64, log: &mut LogSink) -> Result<SettlementResult, EngineError> {
        crate::lmsr::settle(ledger, &mut self.state, outcome, timestamp, log)
    }

    fn reject(&self, intent: OrderIntent, reason: impl Into<String>, timestamp: u64, log: &mut LogSink) -> ExecutionResult {
        let result = ExecutionResult::rejected(
            EngineTag::Lmsr,
            intent,
            reason,
            fallback_price_ref(&self.state),
            timestamp,
            0,
        );
        log_execution_result(log, EngineTag::Lmsr, &result);
        result
    }
}

impl TradingEngine for LmsrEngine {
    fn tag(&self) -> EngineTag {
        EngineTag::Lmsr
    }

    fn submit(
        &mut self,
        ledger: &mut Ledger,
        intent: OrderIntent,
        timestamp: u64,
        log: &mut LogSink,
    ) -> Result<ExecutionResult, EngineError> {
        log.push(
            EngineTag::Lmsr,
            timestamp,
            LogPayload::OrderReceived(OrderReceivedData { intent: intent.clone() }),
        );
        if let Err(e) = intent.validate() {
            return Ok(self.reject(intent, e.to_string(), timestamp, log));
        }
        if intent.side == Side::Sell {
            return Ok(self.reject(intent, "the LMSR engine does not support SELL", timestamp, log));
        }
        if ledger.trader(&intent.trader_id).is_none() {
            let msg = EngineError::unknown_trader(intent.trader_id.clone()).to_string();
            return Ok(self.reject(intent, msg, timestamp, log));
        }

        let outcome = intent.outcome;
        let trader_id = intent.trader_id.clone();
        let attempt = match (intent.qty, intent.spend) {
            (Some(qty), None) => {
                crate::lmsr::execute_buy(ledger, &mut self.state, &trader_id, outcome, qty, timestamp)
            }
            (None, Some(spend)) => {
                crate::lmsr::execute_buy_spend(ledger, &mut self.state, &trader_id, outcome, spend, timestamp)
            }
            _ => unreachable!("OrderIntent::validate guarantees exactly one of qty/spend"),
        };

        match attempt {
            Ok(mut result) => {
                // execute_buy/execute_buy_spend synthesize their own
                // intent internally; restore the caller's real one so
                // intent_id round-trips through the log and result.
                result.intent = intent;
                log_execution_result(log, EngineTag::Lmsr, &result);
                Ok(result)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Ok(self.reject(intent, e.to_string(), timestamp, log)),
        }
    }

    fn cancel(
        &mut self,
        _ledger: &mut Ledger,
        _order_id: &str,
        _timestamp: u64,
    ) -> Result<CancelOutcome, EngineError> {
        Ok(CancelOutcome::Unsupported)
    }

    fn snapshot(&self, timestamp: u64) -> MarketStateSnapshot {
        self.state.snapshot(timestamp).unwrap_or(MarketStateSnapshot {
            timestamp,
            mid_price: None,
            best_bid: None,
            best_ask: None,
            bid_depth: None,
            ask_depth: None,
            lmsr_p_yes: None,
            lmsr_p_no: None,
            lmsr_q_yes: None,
            lmsr_q_no: None,
        })
    }
}

/// Wraps `OrderBook` behind `TradingEngine`. `place_order`/`cancel_order`
/// already produce a typed result or error; this layer's only job is to
/// push the matching log events through the shared helper.
pub struct ClobEngine {
    pub book: OrderBook,
}

impl ClobEngine {
    pub fn new(tick_size: Decimal) -> Result<Self, EngineError> {
        Ok(ClobEngine {
            book: OrderBook::new(tick_size)?,
        })
    }
}

impl TradingEngine for ClobEngine {
    fn tag(&self) -> EngineTag {
        EngineTag::Clob
    }

    fn submit(
        &mut self,
        ledger: &mut Ledger,
        intent: OrderIntent,
        timestamp: u64,
        log: &mut LogSink,
    ) -> Result<ExecutionResult, EngineError> {
        log.push(
            EngineTag::Clob,
            timestamp,
            LogPayload::OrderReceived(OrderReceivedData { intent: intent.clone() }),
        );
        let result = self.book.place_order(ledger, intent, timestamp)?;
        log_execution_result(log, EngineTag::Clob, &result);
        Ok(result)
    }

    fn cancel(
        &mut self,
        ledger: &mut Ledger,
        order_id: &str,
        timestamp: u64,
    ) -> Result<CancelOutcome, EngineError> {
        let result = self.book.cancel_order(ledger, order_id, timestamp)?;
        Ok(CancelOutcome::Cancelled(result))
    }

    fn snapshot(&self, timestamp: u64) -> MarketStateSnapshot {
        self.book.snapshot(timestamp)
    }
}
