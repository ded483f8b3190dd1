//! End-to-end golden scenarios (SPEC_FULL.md §8), driven entirely
//! through the public `TradingEngine` facade rather than the engines'
//! internal modules: the black-box counterpart to the per-module unit
//! tests, covering full API-surface flows (buy YES, buy NO, partial
//! sell, resolve) against in-memory `Ledger`/`TradingEngine` state.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use binary_market_core::config::{RouterConfig, RoutingMode};
use binary_market_core::driver;
use binary_market_core::engine::{ClobEngine, LmsrEngine, TradingEngine};
use binary_market_core::ledger::Ledger;
use binary_market_core::log::LogSink;
use binary_market_core::router::HybridEngine;
use binary_market_core::scenario::ScenarioConfig;
use binary_market_core::types::{EngineTag, OrderIntent, OrderType, Outcome, Side};

fn tolerance_eq(a: Decimal, b: Decimal, tol: Decimal) -> bool {
    (a - b).abs() <= tol
}

fn buy(id: &str, trader: &str, outcome: Outcome, qty: Decimal) -> OrderIntent {
    OrderIntent {
        intent_id: id.to_string(),
        trader_id: trader.to_string(),
        outcome,
        side: Side::Buy,
        order_type: OrderType::Market,
        price: None,
        qty: Some(qty),
        spend: None,
        timestamp: 1,
    }
}

// Scenario 1: LMSR single YES trade.
#[test]
fn scenario_1_lmsr_single_yes_trade() {
    let mut ledger = Ledger::init([
        ("alice".to_string(), dec!(10000)),
        ("bob".to_string(), dec!(10000)),
    ]);
    let mut engine = LmsrEngine::new(dec!(100)).unwrap();
    let mut log = LogSink::new();

    let result = engine
        .submit(&mut ledger, buy("i1", "alice", Outcome::Yes, dec!(50)), 1, &mut log)
        .unwrap();
    assert_eq!(result.status, binary_market_core::types::OrderStatus::Filled);

    let tol = dec!(0.0000000000000000000001);
    assert_eq!(engine.state.q_yes, dec!(50));
    assert_eq!(engine.state.q_no, Decimal::ZERO);
    assert!(tolerance_eq(
        engine.state.total_collected,
        dec!(28.09298036201613714557652336),
        tol
    ));
    let (p_yes, p_no) = engine.state.get_prices().unwrap();
    assert!(tolerance_eq(p_yes, dec!(0.6224593312018545646389005657), tol));
    assert!(tolerance_eq(p_no, dec!(0.3775406687981454353610994343), tol));
    assert!(tolerance_eq(
        ledger.trader("alice").unwrap().cash,
        dec!(9971.907019637983862854423477),
        tol
    ));
}

// Scenario 2: LMSR balanced trades (opposing buys bring price back to 0.5).
#[test]
fn scenario_2_lmsr_balanced_trades() {
    let mut ledger = Ledger::init([
        ("alice".to_string(), dec!(10000)),
        ("bob".to_string(), dec!(10000)),
    ]);
    let mut engine = LmsrEngine::new(dec!(100)).unwrap();
    let mut log = LogSink::new();

    engine
        .submit(&mut ledger, buy("i1", "alice", Outcome::Yes, dec!(50)), 1, &mut log)
        .unwrap();
    engine
        .submit(&mut ledger, buy("i2", "bob", Outcome::No, dec!(50)), 2, &mut log)
        .unwrap();

    let tol = dec!(0.0000000000000001);
    assert_eq!(engine.state.q_yes, dec!(50));
    assert_eq!(engine.state.q_no, dec!(50));
    let (p_yes, p_no) = engine.state.get_prices().unwrap();
    assert_eq!(p_yes, dec!(0.5));
    assert_eq!(p_no, dec!(0.5));
    assert!(tolerance_eq(
        engine.state.total_collected,
        dec!(50.00000000000000000000000005),
        tol
    ));
    assert!(tolerance_eq(
        ledger.trader("alice").unwrap().cash,
        dec!(9971.907019637983862854423477),
        tol
    ));
    assert!(tolerance_eq(
        ledger.trader("bob").unwrap().cash,
        dec!(9978.092980362016137145576523),
        tol
    ));
}

// Scenario 3: CLOB simple cross.
#[test]
fn scenario_3_clob_simple_cross() {
    let mut ledger = Ledger::init([
        ("alice".to_string(), dec!(10000)),
        ("bob".to_string(), dec!(10000)),
    ]);
    ledger.trader_mut("alice").unwrap().yes_shares = dec!(100);
    ledger.trader_mut("bob").unwrap().yes_shares = dec!(100);
    let mut engine = ClobEngine::new(dec!(0.01)).unwrap();
    let mut log = LogSink::new();

    let sell = OrderIntent {
        intent_id: "s1".into(),
        trader_id: "alice".into(),
        outcome: Outcome::Yes,
        side: Side::Sell,
        order_type: OrderType::Limit,
        price: Some(dec!(0.50)),
        qty: Some(dec!(10)),
        spend: None,
        timestamp: 1,
    };
    let buy_order = OrderIntent {
        intent_id: "b1".into(),
        trader_id: "bob".into(),
        outcome: Outcome::Yes,
        side: Side::Buy,
        order_type: OrderType::Limit,
        price: Some(dec!(0.55)),
        qty: Some(dec!(10)),
        spend: None,
        timestamp: 2,
    };
    engine.submit(&mut ledger, sell, 1, &mut log).unwrap();
    let result = engine.submit(&mut ledger, buy_order, 2, &mut log).unwrap();

    assert_eq!(result.fills.len(), 1);
    assert_eq!(result.fills[0].price, dec!(0.50));
    assert_eq!(ledger.trader("alice").unwrap().cash, dec!(10005));
    assert_eq!(ledger.trader("alice").unwrap().yes_shares, dec!(90));
    assert_eq!(ledger.trader("bob").unwrap().cash, dec!(9995));
    assert_eq!(ledger.trader("bob").unwrap().yes_shares, dec!(110));
    assert!(engine.book.best_bid().is_none());
    assert!(engine.book.best_ask().is_none());
}

// Scenario 6: hybrid CLOB_FIRST split.
#[test]
fn scenario_6_hybrid_split_and_fallback() {
    let mut ledger = Ledger::init([
        ("maker".to_string(), dec!(100000)),
        ("taker".to_string(), dec!(100000)),
    ]);
    ledger.trader_mut("maker").unwrap().yes_shares = dec!(50);
    let config = RouterConfig {
        routing_mode: RoutingMode::ClobFirst,
        ..RouterConfig::default()
    };
    let mut engine = HybridEngine::new(dec!(0.01), dec!(100), config).unwrap();
    let mut log = LogSink::new();

    let offer = OrderIntent {
        intent_id: "s1".into(),
        trader_id: "maker".into(),
        outcome: Outcome::Yes,
        side: Side::Sell,
        order_type: OrderType::Limit,
        price: Some(dec!(0.50)),
        qty: Some(dec!(50)),
        spend: None,
        timestamp: 1,
    };
    engine.submit(&mut ledger, offer, 1, &mut log).unwrap();

    let market_buy = OrderIntent {
        intent_id: "b1".into(),
        trader_id: "taker".into(),
        outcome: Outcome::Yes,
        side: Side::Buy,
        order_type: OrderType::Market,
        price: None,
        qty: Some(dec!(150)),
        spend: None,
        timestamp: 2,
    };
    let result = engine.submit(&mut ledger, market_buy, 2, &mut log).unwrap();

    assert_eq!(result.filled_qty, dec!(150));
    assert!(result.engine.as_str().contains("CLOB"));
    assert!(result.engine.as_str().contains("LMSR"));
    let clob_qty: Decimal = result.fills.iter().filter(|f| f.engine == EngineTag::Clob).map(|f| f.qty).sum();
    let lmsr_qty: Decimal = result.fills.iter().filter(|f| f.engine == EngineTag::Lmsr).map(|f| f.qty).sum();
    assert_eq!(clob_qty, dec!(50));
    assert_eq!(lmsr_qty, dec!(100));
}

// Determinism law (SPEC_FULL.md §8): identical (seed, scenario, engine
// config) produces a byte-identical `SimulationOutput`.
#[test]
fn determinism_same_seed_same_everything() {
    let cfg = ScenarioConfig {
        num_orders: 50,
        ..ScenarioConfig::default()
    };
    let mut e1 = HybridEngine::new(dec!(0.01), dec!(100), RouterConfig::default()).unwrap();
    let mut e2 = HybridEngine::new(dec!(0.01), dec!(100), RouterConfig::default()).unwrap();

    let out1 = driver::run(&mut e1, &cfg).unwrap();
    let out2 = driver::run(&mut e2, &cfg).unwrap();

    assert_eq!(
        serde_json::to_string(&out1.intents).unwrap(),
        serde_json::to_string(&out2.intents).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&out1.results).unwrap(),
        serde_json::to_string(&out2.results).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&out1.snapshots).unwrap(),
        serde_json::to_string(&out2.snapshots).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&out1.logs).unwrap(),
        serde_json::to_string(&out2.logs).unwrap()
    );
}

// Settlement pays winning shares and appends a SETTLEMENT log event.
#[test]
fn settlement_pays_winners_and_logs_the_event() {
    let mut ledger = Ledger::init([
        ("alice".to_string(), dec!(10000)),
        ("bob".to_string(), dec!(10000)),
    ]);
    let mut engine = LmsrEngine::new(dec!(100)).unwrap();
    let mut log = LogSink::new();

    engine
        .submit(&mut ledger, buy("i1", "alice", Outcome::Yes, dec!(50)), 1, &mut log)
        .unwrap();

    let alice_cash_before = ledger.trader("alice").unwrap().cash;
    let result = engine.settle(&mut ledger, Outcome::Yes, 2, &mut log).unwrap();

    assert_eq!(result.total_payout, dec!(50));
    assert_eq!(
        ledger.trader("alice").unwrap().cash,
        alice_cash_before + dec!(50)
    );
    assert_eq!(ledger.trader("alice").unwrap().yes_shares, Decimal::ZERO);
    assert!(log.events().iter().any(|e| matches!(
        e.payload,
        binary_market_core::log::LogPayload::Settlement(_)
    )));

    let err = engine.settle(&mut ledger, Outcome::Yes, 3, &mut log).unwrap_err();
    assert_eq!(err.kind(), "AlreadySettled");
}

// Cash conservation (CLOB), ignoring settlement: total cash across
// traders is invariant under any sequence of limit/market/cancel ops.
#[test]
fn clob_cash_is_conserved_across_a_sequence_of_orders() {
    let mut ledger = Ledger::init([
        ("a".to_string(), dec!(10000)),
        ("b".to_string(), dec!(10000)),
        ("c".to_string(), dec!(10000)),
    ]);
    for id in ["a", "b", "c"] {
        ledger.trader_mut(id).unwrap().yes_shares = dec!(50);
    }
    let total_before: Decimal = ledger.traders().map(|t| t.cash).sum();

    let mut engine = ClobEngine::new(dec!(0.01)).unwrap();
    let mut log = LogSink::new();
    let intents = [
        OrderIntent { intent_id: "1".into(), trader_id: "a".into(), outcome: Outcome::Yes, side: Side::Sell, order_type: OrderType::Limit, price: Some(dec!(0.40)), qty: Some(dec!(10)), spend: None, timestamp: 1 },
        OrderIntent { intent_id: "2".into(), trader_id: "b".into(), outcome: Outcome::Yes, side: Side::Buy, order_type: OrderType::Limit, price: Some(dec!(0.45)), qty: Some(dec!(5)), spend: None, timestamp: 2 },
        OrderIntent { intent_id: "3".into(), trader_id: "c".into(), outcome: Outcome::Yes, side: Side::Sell, order_type: OrderType::Limit, price: Some(dec!(0.38)), qty: Some(dec!(3)), spend: None, timestamp: 3 },
        OrderIntent { intent_id: "4".into(), trader_id: "b".into(), outcome: Outcome::Yes, side: Side::Buy, order_type: OrderType::Market, price: None, qty: Some(dec!(20)), spend: None, timestamp: 4 },
    ];
    for intent in intents {
        engine.submit(&mut ledger, intent, 1, &mut log).unwrap();
    }

    let total_after: Decimal = ledger.traders().map(|t| t.cash).sum();
    assert_eq!(total_before, total_after);
}
