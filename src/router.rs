//! Hybrid router (SPEC_FULL.md §4.5): blends the CLOB and the LMSR AMM
//! behind one `TradingEngine`, choosing per order which engine (or
//! split of the two) fills it.
//!
//! A "shared position ledger" stays in sync with two sub-engine
//! projections via a copy-before/propagate-after protocol elsewhere;
//! here `TradingEngine::submit` already takes `ledger: &mut Ledger` by
//! reference rather than owning its own copy, so `HybridEngine` holds
//! exactly one `Ledger` (passed in by the caller, same as every other
//! engine) and hands that same reference to both `self.clob` and
//! `self.lmsr` in turn. There is only ever one copy of a trader's
//! cash/shares, so the sync stays correct by construction rather than
//! by an explicit copy step.

use rust_decimal::Decimal;

use crate::config::{RouterConfig, RoutingMode};
use crate::engine::{CancelOutcome, ClobEngine, LmsrEngine, TradingEngine};
use crate::error::EngineError;
use crate::ledger::Ledger;
use crate::log::{LogPayload, LogSink, OrderReceivedData, RoutingDecisionData};
use crate::types::{
    EngineTag, ExecutionResult, MarketStateSnapshot, OrderIntent, OrderStatus, Outcome, Side,
    SettlementResult,
};

pub struct HybridEngine {
    pub clob: ClobEngine,
    pub lmsr: LmsrEngine,
    pub config: RouterConfig,
}

impl HybridEngine {
    pub fn new(tick_size: Decimal, b: Decimal, config: RouterConfig) -> Result<Self, EngineError> {
        Ok(HybridEngine {
            clob: ClobEngine::new(tick_size)?,
            lmsr: LmsrEngine::new(b)?,
            config,
        })
    }

    pub fn settle(&mut self, ledger: &mut Ledger, outcome: Outcome, timestamp: u64, log: &mut LogSink) -> Result<SettlementResult, EngineError> {
        self.lmsr.settle(ledger, outcome, timestamp, log)
    }

    fn reject(&self, intent: OrderIntent, reason: impl Into<String>, timestamp: u64, log: &mut LogSink) -> ExecutionResult {
        let price_ref = self
            .clob
            .book
            .mid_price()
            .or_else(|| self.lmsr.state.get_prices().ok().map(|(y, _)| y))
            .unwrap_or(Decimal::new(5, 1));
        let result = ExecutionResult::rejected(EngineTag::Hybrid, intent, reason, price_ref, timestamp, 0);
        crate::log::log_execution_result(log, EngineTag::Hybrid, &result);
        result
    }

    fn log_decision(
        &self,
        log: &mut LogSink,
        timestamp: u64,
        intent_id: &str,
        chosen_engine: EngineTag,
        observed_spread: Option<Decimal>,
        observed_depth: Option<Decimal>,
        reason: &str,
    ) {
        log.push(
            EngineTag::Hybrid,
            timestamp,
            LogPayload::RoutingDecision(RoutingDecisionData {
                intent_id: intent_id.to_string(),
                chosen_engine,
                observed_spread,
                observed_depth,
                max_spread: self.config.max_spread,
                min_depth: self.config.min_depth,
                reason: reason.to_string(),
            }),
        );
    }

    /// Sub-order carrying `qty` units of `intent`, tagged with a
    /// leg-specific id so a split trade's two dispatches never collide
    /// on `intent_id` inside the per-engine order books/logs.
    fn sub_intent(intent: &OrderIntent, qty: Decimal, suffix: &str) -> OrderIntent {
        OrderIntent {
            intent_id: format!("{}-{}", intent.intent_id, suffix),
            trader_id: intent.trader_id.clone(),
            outcome: intent.outcome,
            side: intent.side,
            order_type: intent.order_type,
            price: intent.price,
            qty: Some(qty),
            spend: None,
            timestamp: intent.timestamp,
        }
    }

    fn dispatch_clob(&mut self, ledger: &mut Ledger, sub: OrderIntent, timestamp: u64, log: &mut LogSink) -> Result<ExecutionResult, EngineError> {
        self.clob.submit(ledger, sub, timestamp, log)
    }

    fn dispatch_lmsr(&mut self, ledger: &mut Ledger, sub: OrderIntent, timestamp: u64, log: &mut LogSink) -> Result<ExecutionResult, EngineError> {
        self.lmsr.submit(ledger, sub, timestamp, log)
    }

    /// CLOB_FIRST split-and-fallback (SPEC_FULL.md §4.5): `k = min(qty,
    /// fillable-on-CLOB-at-or-below-limit)` goes to the CLOB; whatever
    /// is left goes to LMSR unconditionally (the AMM always completes).
    fn split_and_fallback_buy(
        &mut self,
        ledger: &mut Ledger,
        intent: OrderIntent,
        timestamp: u64,
        log: &mut LogSink,
    ) -> Result<ExecutionResult, EngineError> {
        let qty = intent.qty.expect("validated: qty present for non-spend BUY");
        let limit = match intent.order_type {
            crate::types::OrderType::Market => Decimal::ONE,
            crate::types::OrderType::Limit => intent.price.expect("validated: price present for LIMIT"),
        };
        let fillable = self.clob.book.fillable_qty(Side::Buy, limit);
        let k = qty.min(fillable);

        self.log_decision(
            log,
            timestamp,
            &intent.intent_id,
            if k >= qty { EngineTag::Clob } else if k > Decimal::ZERO { EngineTag::Hybrid } else { EngineTag::Lmsr },
            self.clob.book.spread(),
            Some(fillable),
            &format!("CLOB_FIRST: {k} of {qty} fillable on CLOB at or below {limit}"),
        );

        let price_before = self
            .clob
            .book
            .mid_price()
            .or_else(|| self.lmsr.state.get_prices().ok().map(|(y, _)| y))
            .unwrap_or(Decimal::new(5, 1));

        let mut parts = Vec::new();
        if k > Decimal::ZERO {
            let sub = Self::sub_intent(&intent, k, "clob");
            parts.push(self.dispatch_clob(ledger, sub, timestamp, log)?);
        }
        let remainder = qty - k;
        if remainder > Decimal::ZERO {
            let sub = Self::sub_intent(&intent, remainder, "lmsr");
            parts.push(self.dispatch_lmsr(ledger, sub, timestamp, log)?);
        }

        if parts.is_empty() {
            // qty was zero, which OrderIntent::validate already rejects;
            // kept only as a defensive fallback, never reached in practice.
            return Ok(self.reject(intent, "nothing fillable", timestamp, log));
        }

        Ok(self.merge(intent, parts, price_before, timestamp, ledger))
    }

    fn merge(
        &self,
        intent: OrderIntent,
        parts: Vec<ExecutionResult>,
        price_before: Decimal,
        timestamp: u64,
        ledger: &mut Ledger,
    ) -> ExecutionResult {
        let tag = if parts.len() > 1 {
            EngineTag::Hybrid
        } else {
            parts[0].engine
        };
        let mut fills = Vec::new();
        let mut balance_deltas = Vec::new();
        let mut filled_qty = Decimal::ZERO;
        for part in &parts {
            fills.extend(part.fills.iter().cloned());
            balance_deltas.extend(part.balance_deltas.iter().cloned());
            filled_qty += part.filled_qty;
        }
        let requested = intent.qty.unwrap_or(filled_qty);
        let remaining_qty = (requested - filled_qty).max(Decimal::ZERO);
        let status = if remaining_qty == Decimal::ZERO {
            OrderStatus::Filled
        } else if filled_qty > Decimal::ZERO {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::Rejected
        };
        let avg_fill_price = if filled_qty > Decimal::ZERO {
            Some(fills.iter().map(|f| f.price * f.qty).sum::<Decimal>() / filled_qty)
        } else {
            None
        };
        let price_after = parts.last().map(|p| p.price_after).unwrap_or(price_before);
        let slippage = avg_fill_price.map(|p| match intent.side {
            Side::Buy => p - price_before,
            Side::Sell => price_before - p,
        });
        let snapshot: Option<MarketStateSnapshot> = parts.last().and_then(|p| p.market_snapshot.clone());
        ExecutionResult {
            engine: tag,
            status,
            fills,
            filled_qty,
            remaining_qty,
            avg_fill_price,
            price_before,
            price_after,
            slippage,
            price_impact: Some(price_after - price_before),
            rejection_reason: None,
            balance_deltas,
            timestamp,
            sequence: ledger.next_sequence(),
            market_snapshot: snapshot,
            intent,
        }
    }

    fn spread_based_clob_eligible(&self, taker_side: Side) -> (bool, Option<Decimal>, Option<Decimal>) {
        let maker_side = taker_side.opposite();
        let spread = self.clob.book.spread();
        let depth = Some(self.clob.book.depth(maker_side, self.config.depth_ticks as usize));
        let eligible = match spread {
            Some(s) => s <= self.config.max_spread && depth.unwrap_or(Decimal::ZERO) >= self.config.min_depth,
            None => false,
        };
        (eligible, spread, depth)
    }
}

impl TradingEngine for HybridEngine {
    fn tag(&self) -> EngineTag {
        EngineTag::Hybrid
    }

    fn submit(
        &mut self,
        ledger: &mut Ledger,
        intent: OrderIntent,
        timestamp: u64,
        log: &mut LogSink,
    ) -> Result<ExecutionResult, EngineError> {
        log.push(
            EngineTag::Hybrid,
            timestamp,
            LogPayload::OrderReceived(OrderReceivedData { intent: intent.clone() }),
        );
        if let Err(e) = intent.validate() {
            return Ok(self.reject(intent, e.to_string(), timestamp, log));
        }
        if ledger.trader(&intent.trader_id).is_none() {
            let msg = EngineError::unknown_trader(intent.trader_id.clone()).to_string();
            return Ok(self.reject(intent, msg, timestamp, log));
        }

        // NO exposure is only ever created via an LMSR buy; the CLOB is
        // YES-only and the AMM has no short-sell, so a NO SELL has no
        // valid destination (SPEC_FULL.md §9).
        if intent.outcome == Outcome::No {
            return match intent.side {
                Side::Buy => {
                    self.log_decision(log, timestamp, &intent.intent_id, EngineTag::Lmsr, None, None, "NO exposure is only created via LMSR");
                    self.dispatch_lmsr(ledger, intent, timestamp, log)
                }
                Side::Sell => Ok(self.reject(intent, "no destination for a NO SELL: CLOB is YES-only and LMSR has no short-sell", timestamp, log)),
            };
        }

        // The CLOB rejects spend-denominated orders outright; route
        // those straight to the AMM regardless of the configured mode.
        if intent.spend.is_some() {
            self.log_decision(log, timestamp, &intent.intent_id, EngineTag::Lmsr, None, None, "spend-denominated order: CLOB has no spend orders");
            return self.dispatch_lmsr(ledger, intent, timestamp, log);
        }

        // SELL: CLOB-only in every routing mode (spec.md §4.5).
        if intent.side == Side::Sell {
            self.log_decision(log, timestamp, &intent.intent_id, EngineTag::Clob, None, None, "SELL always routes to the CLOB");
            return self.dispatch_clob(ledger, intent, timestamp, log);
        }

        match self.config.routing_mode {
            RoutingMode::LmsrFirst => {
                self.log_decision(log, timestamp, &intent.intent_id, EngineTag::Lmsr, None, None, "LMSR_FIRST: BUY routes fully to LMSR");
                self.dispatch_lmsr(ledger, intent, timestamp, log)
            }
            RoutingMode::ClobFirst => self.split_and_fallback_buy(ledger, intent, timestamp, log),
            RoutingMode::SpreadBased => {
                let (eligible, spread, depth) = self.spread_based_clob_eligible(Side::Buy);
                if eligible {
                    self.log_decision(log, timestamp, &intent.intent_id, EngineTag::Clob, spread, depth, "SPREAD_BASED: spread/depth within thresholds");
                    self.dispatch_clob(ledger, intent, timestamp, log)
                } else {
                    self.log_decision(log, timestamp, &intent.intent_id, EngineTag::Lmsr, spread, depth, "SPREAD_BASED: spread/depth outside thresholds");
                    self.dispatch_lmsr(ledger, intent, timestamp, log)
                }
            }
        }
    }

    fn cancel(&mut self, ledger: &mut Ledger, order_id: &str, timestamp: u64) -> Result<CancelOutcome, EngineError> {
        self.clob.cancel(ledger, order_id, timestamp)
    }

    fn snapshot(&self, timestamp: u64) -> MarketStateSnapshot {
        let clob = self.clob.snapshot(timestamp);
        let lmsr = self.lmsr.snapshot(timestamp);
        MarketStateSnapshot {
            timestamp,
            mid_price: clob.mid_price,
            best_bid: clob.best_bid,
            best_ask: clob.best_ask,
            bid_depth: clob.bid_depth,
            ask_depth: clob.ask_depth,
            lmsr_p_yes: lmsr.lmsr_p_yes,
            lmsr_p_no: lmsr.lmsr_p_no,
            lmsr_q_yes: lmsr.lmsr_q_yes,
            lmsr_q_no: lmsr.lmsr_q_no,
        }
    }
}
