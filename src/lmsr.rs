//! LMSR (Logarithmic Market Scoring Rule) pricing engine (SPEC_FULL.md
//! §4.3). Cost-function math uses the shift-to-zero log-sum-exp trick,
//! carried in `Decimal` rather than `f64` throughout so the crate never
//! leaves exact arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{self, DEC_ONE, DEC_TWO, DEC_ZERO};
use crate::error::EngineError;
use crate::ledger::Ledger;
use crate::log::{LogPayload, LogSink, SettlementData};
use crate::types::{
    EngineTag, ExecutionResult, Fill, MarketStateSnapshot, Outcome, OrderIntent, OrderStatus,
    SettlementPayout, SettlementResult,
};

/// Numerically-stable `ln(exp(x) + exp(y))`, shifting by the larger
/// argument so neither `exp` call overflows for large inventories.
pub fn log_sum_exp(x: Decimal, y: Decimal) -> Result<Decimal, EngineError> {
    let m = x.max(y);
    let sum = decimal::exp(x - m)? + decimal::exp(y - m)?;
    Ok(m + decimal::ln(sum)?)
}

/// `C(qYes, qNo) = b * ln(exp(qYes/b) + exp(qNo/b))`.
pub fn cost(q_yes: Decimal, q_no: Decimal, b: Decimal) -> Result<Decimal, EngineError> {
    Ok(b * log_sum_exp(q_yes / b, q_no / b)?)
}

/// `(pYES, pNO)`, guaranteed to sum to exactly 1 at decimal precision
/// because `pNO` is derived as `1 - pYES` rather than independently
/// renormalized.
pub fn prices(q_yes: Decimal, q_no: Decimal, b: Decimal) -> Result<(Decimal, Decimal), EngineError> {
    let diff = (q_no - q_yes) / b;
    let p_yes = DEC_ONE / (DEC_ONE + decimal::exp(diff)?);
    let p_no = DEC_ONE - p_yes;
    Ok((p_yes, p_no))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmsrMarketState {
    pub b: Decimal,
    pub q_yes: Decimal,
    pub q_no: Decimal,
    pub total_collected: Decimal,
    pub settled: bool,
    pub outcome: Option<Outcome>,
}

impl LmsrMarketState {
    /// `initMarket(b)`.
    pub fn new(b: Decimal) -> Result<Self, EngineError> {
        if b <= DEC_ZERO {
            return Err(EngineError::invalid_input("b must be positive"));
        }
        Ok(LmsrMarketState {
            b,
            q_yes: DEC_ZERO,
            q_no: DEC_ZERO,
            total_collected: DEC_ZERO,
            settled: false,
            outcome: None,
        })
    }

    pub fn cost(&self) -> Result<Decimal, EngineError> {
        cost(self.q_yes, self.q_no, self.b)
    }

    pub fn get_prices(&self) -> Result<(Decimal, Decimal), EngineError> {
        prices(self.q_yes, self.q_no, self.b)
    }

    pub fn snapshot(&self, timestamp: u64) -> Result<MarketStateSnapshot, EngineError> {
        let (p_yes, p_no) = self.get_prices()?;
        Ok(MarketStateSnapshot {
            timestamp,
            mid_price: None,
            best_bid: None,
            best_ask: None,
            bid_depth: None,
            ask_depth: None,
            lmsr_p_yes: Some(p_yes),
            lmsr_p_no: Some(p_no),
            lmsr_q_yes: Some(self.q_yes),
            lmsr_q_no: Some(self.q_no),
        })
    }

    fn inventory_after(&self, outcome: Outcome, qty: Decimal) -> (Decimal, Decimal) {
        match outcome {
            Outcome::Yes => (self.q_yes + qty, self.q_no),
            Outcome::No => (self.q_yes, self.q_no + qty),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub outcome: Outcome,
    pub qty: Decimal,
    pub payment: Decimal,
    pub avg_price: Decimal,
    pub prices_before: (Decimal, Decimal),
    pub prices_after: (Decimal, Decimal),
}

/// `quoteQtyBuy(state, outcome, qty)`, pure.
pub fn quote_qty_buy(
    state: &LmsrMarketState,
    outcome: Outcome,
    qty: Decimal,
) -> Result<Quote, EngineError> {
    if state.settled {
        return Err(EngineError::invalid_state("market is settled"));
    }
    if qty <= DEC_ZERO {
        return Err(EngineError::invalid_input("qty must be strictly positive"));
    }
    let prices_before = state.get_prices()?;
    let cost_before = state.cost()?;
    let (new_q_yes, new_q_no) = state.inventory_after(outcome, qty);
    let cost_after = cost(new_q_yes, new_q_no, state.b)?;
    let payment = cost_after - cost_before;
    let prices_after = prices(new_q_yes, new_q_no, state.b)?;
    Ok(Quote {
        outcome,
        qty,
        payment,
        avg_price: payment / qty,
        prices_before,
        prices_after,
    })
}

/// Maximum bisection iterations for `quoteSpendBuy`, fixed per
/// SPEC_FULL.md §9 ("deterministic bisection", no adaptive time
/// budget). 128 halvings of any reasonable bracket comfortably clears
/// the 1e-9 spend-unit tolerance.
const SPEND_BISECTION_ITERATIONS: u32 = 128;
const BRACKET_EXPANSION_CAP: u32 = 256;
const SPEND_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// `quoteSpendBuy(state, outcome, spend)`: largest `qty` whose
/// `quoteQtyBuy` payment does not exceed `spend`, found by monotone
/// bisection (payment is strictly increasing in qty since price ∈
/// (0,1)). Bracket is established by doubling from 1 unit until the
/// cost at the upper bound meets or exceeds `spend`.
pub fn quote_spend_buy(
    state: &LmsrMarketState,
    outcome: Outcome,
    spend: Decimal,
) -> Result<Quote, EngineError> {
    if state.settled {
        return Err(EngineError::invalid_state("market is settled"));
    }
    if spend <= DEC_ZERO {
        return Err(EngineError::invalid_input("spend must be strictly positive"));
    }

    let mut low = DEC_ZERO;
    let mut high = DEC_ONE;
    let mut expanded = 0;
    loop {
        let payment = quote_qty_buy(state, outcome, high)?.payment;
        if payment >= spend {
            break;
        }
        if expanded >= BRACKET_EXPANSION_CAP {
            return Err(EngineError::precision_failure(
                "quoteSpendBuy bracket expansion did not converge",
            ));
        }
        high *= DEC_TWO;
        expanded += 1;
    }

    for _ in 0..SPEND_BISECTION_ITERATIONS {
        let mid = (low + high) / DEC_TWO;
        if mid == low || mid == high {
            break;
        }
        let payment = quote_qty_buy(state, outcome, mid)?.payment;
        if payment <= spend {
            low = mid;
        } else {
            high = mid;
        }
        let gap = quote_qty_buy(state, outcome, high)?.payment
            - quote_qty_buy(state, outcome, low)?.payment;
        if gap.abs() <= SPEND_TOLERANCE {
            break;
        }
    }

    if low <= DEC_ZERO {
        return Err(EngineError::precision_failure(
            "quoteSpendBuy could not find a positive qty within spend",
        ));
    }

    quote_qty_buy(state, outcome, low)
}

/// `executeBuy(ledger, trader, outcome, qty)`.
pub fn execute_buy(
    ledger: &mut Ledger,
    state: &mut LmsrMarketState,
    trader_id: &str,
    outcome: Outcome,
    qty: Decimal,
    timestamp: u64,
) -> Result<ExecutionResult, EngineError> {
    let quote = quote_qty_buy(state, outcome, qty)?;
    commit_buy(ledger, state, trader_id, quote, timestamp)
}

/// `executeBuySpend(ledger, trader, outcome, spend)`.
pub fn execute_buy_spend(
    ledger: &mut Ledger,
    state: &mut LmsrMarketState,
    trader_id: &str,
    outcome: Outcome,
    spend: Decimal,
    timestamp: u64,
) -> Result<ExecutionResult, EngineError> {
    let quote = quote_spend_buy(state, outcome, spend)?;
    commit_buy(ledger, state, trader_id, quote, timestamp)
}

fn commit_buy(
    ledger: &mut Ledger,
    state: &mut LmsrMarketState,
    trader_id: &str,
    quote: Quote,
    timestamp: u64,
) -> Result<ExecutionResult, EngineError> {
    ledger.check_buy_collateral(trader_id, quote.payment)?;

    let (new_q_yes, new_q_no) = state.inventory_after(quote.outcome, quote.qty);
    state.q_yes = new_q_yes;
    state.q_no = new_q_no;
    state.total_collected += quote.payment;

    let sequence = ledger.next_sequence();
    let intent = OrderIntent {
        intent_id: format!("lmsr-buy-{sequence}"),
        trader_id: trader_id.to_string(),
        outcome: quote.outcome,
        side: crate::types::Side::Buy,
        order_type: crate::types::OrderType::Market,
        price: None,
        qty: Some(quote.qty),
        spend: None,
        timestamp,
    };
    let fill = Fill {
        trade_id: format!("lmsr-fill-{sequence}"),
        price: quote.avg_price,
        qty: quote.qty,
        engine: EngineTag::Lmsr,
        maker_order_id: None,
        timestamp,
    };
    let snapshot = state.snapshot(timestamp)?;
    let result = ExecutionResult {
        engine: EngineTag::Lmsr,
        status: OrderStatus::Filled,
        fills: vec![fill],
        filled_qty: quote.qty,
        remaining_qty: DEC_ZERO,
        avg_fill_price: Some(quote.avg_price),
        price_before: match quote.outcome {
            Outcome::Yes => quote.prices_before.0,
            Outcome::No => quote.prices_before.1,
        },
        price_after: match quote.outcome {
            Outcome::Yes => quote.prices_after.0,
            Outcome::No => quote.prices_after.1,
        },
        slippage: None,
        price_impact: Some(match quote.outcome {
            Outcome::Yes => quote.prices_after.0 - quote.prices_before.0,
            Outcome::No => quote.prices_after.1 - quote.prices_before.1,
        }),
        rejection_reason: None,
        balance_deltas: vec![(trader_id.to_string(), -quote.payment, quote.qty)],
        timestamp,
        sequence,
        intent,
        market_snapshot: Some(snapshot),
    };
    ledger.apply_execution(&result)?;
    Ok(result)
}

/// `settle(ledger, outcome)`: pays winning shares $1 each, losers to
/// zero, market becomes terminal.
pub fn settle(
    ledger: &mut Ledger,
    state: &mut LmsrMarketState,
    outcome: Outcome,
    timestamp: u64,
    log: &mut LogSink,
) -> Result<SettlementResult, EngineError> {
    if state.settled {
        return Err(EngineError::AlreadySettled);
    }
    let mut payouts = Vec::new();
    let mut total_payout = DEC_ZERO;
    for trader in ledger.traders() {
        let winning_shares = match outcome {
            Outcome::Yes => trader.yes_shares,
            Outcome::No => trader.no_shares,
        };
        if winning_shares > DEC_ZERO {
            payouts.push(SettlementPayout {
                trader_id: trader.id.clone(),
                payout: winning_shares,
            });
            total_payout += winning_shares;
        }
    }
    let sequence = ledger.next_sequence();
    let worst_case_loss = state.b * decimal::ln(DEC_TWO)?;
    let result = SettlementResult {
        outcome,
        payouts,
        total_collected: state.total_collected,
        total_payout,
        profit_loss: state.total_collected - total_payout,
        worst_case_loss,
        sequence,
    };
    ledger.apply_settlement(&result)?;
    state.settled = true;
    state.outcome = Some(outcome);
    log.push(
        EngineTag::Lmsr,
        timestamp,
        LogPayload::Settlement(SettlementData { result: result.clone() }),
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use rust_decimal_macros::dec;

    fn tolerance_eq(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn cost_at_origin_is_b_ln2() {
        let state = LmsrMarketState::new(dec!(100)).unwrap();
        let c = state.cost().unwrap();
        let expected = dec!(100) * decimal::ln(DEC_TWO).unwrap();
        assert!(tolerance_eq(c, expected, dec!(0.0000000001)));
    }

    #[test]
    fn prices_sum_to_exactly_one() {
        let state = LmsrMarketState::new(dec!(100)).unwrap();
        let (p_yes, p_no) = state.get_prices().unwrap();
        assert_eq!(p_yes + p_no, DEC_ONE);
    }

    // Scenario 1 from SPEC_FULL.md §8.
    #[test]
    fn single_yes_trade_matches_golden_scenario() {
        let mut ledger = Ledger::init([
            ("alice".to_string(), dec!(10000)),
            ("bob".to_string(), dec!(10000)),
        ]);
        let mut state = LmsrMarketState::new(dec!(100)).unwrap();
        let result = execute_buy(&mut ledger, &mut state, "alice", Outcome::Yes, dec!(50), 1).unwrap();

        assert_eq!(state.q_yes, dec!(50));
        assert_eq!(state.q_no, DEC_ZERO);
        let tol = dec!(0.0000000000000000000001);
        assert!(tolerance_eq(
            state.total_collected,
            dec!(28.09298036201613714557652336),
            tol
        ));
        let (p_yes, _p_no) = state.get_prices().unwrap();
        assert!(tolerance_eq(p_yes, dec!(0.6224593312018545646389005657), tol));
        let alice = ledger.trader("alice").unwrap();
        assert!(tolerance_eq(
            alice.cash,
            dec!(9971.907019637983862854423477),
            tol
        ));
        assert_eq!(result.filled_qty, dec!(50));
    }

    // Scenario 2 from SPEC_FULL.md §8: opposing buys of equal size bring
    // the market back to an even price.
    #[test]
    fn balanced_yes_no_trades_return_price_to_half() {
        let mut ledger = Ledger::init([
            ("alice".to_string(), dec!(10000)),
            ("bob".to_string(), dec!(10000)),
        ]);
        let mut state = LmsrMarketState::new(dec!(100)).unwrap();
        execute_buy(&mut ledger, &mut state, "alice", Outcome::Yes, dec!(50), 1).unwrap();
        execute_buy(&mut ledger, &mut state, "bob", Outcome::No, dec!(50), 2).unwrap();

        assert_eq!(state.q_yes, dec!(50));
        assert_eq!(state.q_no, dec!(50));
        let (p_yes, p_no) = state.get_prices().unwrap();
        assert_eq!(p_yes, dec!(0.5));
        assert_eq!(p_no, dec!(0.5));

        let tol = dec!(0.0000000000000001);
        assert!(tolerance_eq(
            state.total_collected,
            dec!(50.00000000000000000000000005),
            tol
        ));
        let alice = ledger.trader("alice").unwrap();
        assert!(tolerance_eq(
            alice.cash,
            dec!(9971.907019637983862854423477),
            tol
        ));
        let bob = ledger.trader("bob").unwrap();
        assert!(tolerance_eq(
            bob.cash,
            dec!(9978.092980362016137145576523),
            tol
        ));
    }

    #[test]
    fn quote_execute_consistency() {
        let mut ledger = Ledger::init([("alice".to_string(), dec!(10000))]);
        let mut state = LmsrMarketState::new(dec!(100)).unwrap();
        let quote = quote_qty_buy(&state, Outcome::Yes, dec!(20)).unwrap();
        let result = execute_buy(&mut ledger, &mut state, "alice", Outcome::Yes, dec!(20), 1).unwrap();
        assert_eq!(quote.payment, -result.balance_deltas[0].1);
    }

    #[test]
    fn spend_inversion_monotone() {
        let state = LmsrMarketState::new(dec!(100)).unwrap();
        let q1 = quote_spend_buy(&state, Outcome::Yes, dec!(10)).unwrap();
        let q2 = quote_spend_buy(&state, Outcome::Yes, dec!(20)).unwrap();
        assert!(q1.qty < q2.qty);
    }

    #[test]
    fn insufficient_cash_rejected() {
        let mut ledger = Ledger::init([("alice".to_string(), dec!(1))]);
        let mut state = LmsrMarketState::new(dec!(100)).unwrap();
        let err = execute_buy(&mut ledger, &mut state, "alice", Outcome::Yes, dec!(50), 1).unwrap_err();
        assert_eq!(err.kind(), "InsufficientCash");
    }

    #[test]
    fn double_settle_fails() {
        let mut ledger = Ledger::init([("alice".to_string(), dec!(100))]);
        let mut state = LmsrMarketState::new(dec!(100)).unwrap();
        let mut log = LogSink::new();
        settle(&mut ledger, &mut state, Outcome::Yes, 1, &mut log).unwrap();
        let err = settle(&mut ledger, &mut state, Outcome::Yes, 2, &mut log).unwrap_err();
        assert_eq!(err, EngineError::AlreadySettled);
    }

    #[test]
    fn settle_emits_settlement_event() {
        let mut ledger = Ledger::init([("alice".to_string(), dec!(100))]);
        let mut state = LmsrMarketState::new(dec!(100)).unwrap();
        execute_buy(&mut ledger, &mut state, "alice", Outcome::Yes, dec!(10), 1).unwrap();
        let mut log = LogSink::new();
        settle(&mut ledger, &mut state, Outcome::Yes, 2, &mut log).unwrap();
        assert!(log
            .events()
            .iter()
            .any(|e| matches!(e.payload, LogPayload::Settlement(_))));
    }

    proptest::proptest! {
        #[test]
        fn worst_case_loss_bound(q in 1u32..500) {
            let mut ledger = Ledger::init([("alice".to_string(), dec!(1000000))]);
            let mut state = LmsrMarketState::new(dec!(100)).unwrap();
            let qty = Decimal::from(q);
            if execute_buy(&mut ledger, &mut state, "alice", Outcome::Yes, qty, 1).is_ok() {
                let mut log = LogSink::new();
                let settlement = settle(&mut ledger, &mut state, Outcome::Yes, 2, &mut log).unwrap();
                let bound = dec!(100) * decimal::ln(DEC_TWO).unwrap();
                proptest::prop_assert!(settlement.profit_loss.abs() <= bound + dec!(0.0001));
            }
        }
    }
}
