//! Central limit order book engine (SPEC_FULL.md §4.4).
//!
//! Price levels are kept as one `Vec<PriceLevel>` per side, sorted
//! best-first (bids descending, asks ascending) rather than as a
//! doubly-linked list, per the arena-plus-index design in SPEC_FULL.md
//! §9. Sidesteps pointer cycles, keeps the book clonable for
//! property-based tests. Within a level, orders are a FIFO `VecDeque`
//! ordered by submission sequence number.
//!
//! Unlike the LMSR engine, the CLOB mutates trader cash/shares/
//! `pendingSellQty` directly inside its matching loop rather than
//! through `Ledger::apply_execution`. The driver never replays a
//! `processOrder` call, so no idempotent-mutator contract is needed
//! here (see DESIGN.md).

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::DEC_ZERO;
use crate::error::EngineError;
use crate::ledger::Ledger;
use crate::types::{
    EngineTag, ExecutionResult, Fill, MarketStateSnapshot, Outcome, OrderIntent, OrderStatus,
    OrderType, Side,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestingOrder {
    pub id: String,
    pub trader_id: String,
    pub side: Side,
    pub price: Decimal,
    pub remaining: Decimal,
    pub original_qty: Decimal,
    pub seq: u64,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub side: Side,
    pub total_qty: Decimal,
    pub orders: VecDeque<RestingOrder>,
}

#[derive(Debug, Clone)]
pub struct OrderBook {
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    tick_size: Decimal,
    next_order_seq: u64,
    next_trade_seq: u64,
    settled: bool,
}

/// Market BUY crosses any ask; market SELL crosses any bid.
const MARKET_BUY_LIMIT: Decimal = Decimal::ONE;
const MARKET_SELL_LIMIT: Decimal = Decimal::ZERO;

impl OrderBook {
    pub fn new(tick_size: Decimal) -> Result<Self, EngineError> {
        if tick_size <= DEC_ZERO {
            return Err(EngineError::invalid_input("tick_size must be positive"));
        }
        Ok(OrderBook {
            bids: Vec::new(),
            asks: Vec::new(),
            tick_size,
            next_order_seq: 1,
            next_trade_seq: 1,
            settled: false,
        })
    }

    pub fn tick_size(&self) -> Decimal {
        self.tick_size
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        Some((self.best_bid()? + self.best_ask()?) / Decimal::TWO)
    }

    /// Sum of aggregate quantity across the top `ticks` price levels on
    /// `side` (levels are already stored best-first).
    pub fn depth(&self, side: Side, ticks: usize) -> Decimal {
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        levels.iter().take(ticks).map(|l| l.total_qty).sum()
    }

    pub fn orders_at_price(&self, side: Side, price: Decimal) -> Vec<RestingOrder> {
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        levels
            .iter()
            .find(|l| l.price == price)
            .map(|l| l.orders.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Depth sampled for time-series metrics (SPEC_FULL.md §4.8) uses
    /// this many top ticks per side; callers wanting a different window
    /// use [`OrderBook::depth`] directly.
    pub const SNAPSHOT_DEPTH_TICKS: usize = 5;

    pub fn snapshot(&self, timestamp: u64) -> MarketStateSnapshot {
        MarketStateSnapshot {
            timestamp,
            mid_price: self.mid_price(),
            best_bid: self.best_bid(),
            best_ask: self.best_ask(),
            bid_depth: Some(self.depth(Side::Buy, Self::SNAPSHOT_DEPTH_TICKS)),
            ask_depth: Some(self.depth(Side::Sell, Self::SNAPSHOT_DEPTH_TICKS)),
            lmsr_p_yes: None,
            lmsr_p_no: None,
            lmsr_q_yes: None,
            lmsr_q_no: None,
        }
    }

    /// Total resting quantity reachable by a taker on `side` at or
    /// better than `limit`, without mutating the book. Used by the
    /// hybrid router's split-and-fallback algorithm (SPEC_FULL.md
    /// §4.5) to compute `k = min(qty, fillable)`.
    pub fn fillable_qty(&self, taker_side: Side, limit: Decimal) -> Decimal {
        let maker_side = taker_side.opposite();
        let crosses = |price: Decimal| match taker_side {
            Side::Buy => price <= limit,
            Side::Sell => price >= limit,
        };
        self.levels(maker_side)
            .iter()
            .take_while(|l| crosses(l.price))
            .map(|l| l.total_qty)
            .sum()
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Marks the book terminal; no further placement, matching, or
    /// cancellation is permitted.
    pub fn close(&mut self) {
        self.settled = true;
    }

    fn levels_mut(&mut self, side: Side) -> &mut Vec<PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn levels(&self, side: Side) -> &Vec<PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Finds (or creates, in sorted position) the level for `price` on
    /// `side` and returns its index.
    fn level_index_for_insert(&mut self, side: Side, price: Decimal) -> usize {
        let levels = self.levels_mut(side);
        if let Some(idx) = levels.iter().position(|l| l.price == price) {
            return idx;
        }
        let insert_at = match side {
            Side::Buy => levels
                .iter()
                .position(|l| l.price < price)
                .unwrap_or(levels.len()),
            Side::Sell => levels
                .iter()
                .position(|l| l.price > price)
                .unwrap_or(levels.len()),
        };
        levels.insert(
            insert_at,
            PriceLevel {
                price,
                side,
                total_qty: DEC_ZERO,
                orders: VecDeque::new(),
            },
        );
        insert_at
    }

    fn rest_order(&mut self, side: Side, order: RestingOrder) {
        let idx = self.level_index_for_insert(side, order.price);
        let levels = self.levels_mut(side);
        levels[idx].total_qty += order.remaining;
        levels[idx].orders.push_back(order);
    }

    /// Removes an order by id from wherever it rests. Returns the
    /// removed order, if any.
    fn remove_order(&mut self, side: Side, order_id: &str) -> Option<RestingOrder> {
        let levels = self.levels_mut(side);
        for level_idx in 0..levels.len() {
            if let Some(pos) = levels[level_idx].orders.iter().position(|o| o.id == order_id) {
                let removed = levels[level_idx].orders.remove(pos).unwrap();
                levels[level_idx].total_qty -= removed.remaining;
                if levels[level_idx].orders.is_empty() {
                    levels.remove(level_idx);
                }
                return Some(removed);
            }
        }
        None
    }

    fn find_order_side(&self, order_id: &str) -> Option<Side> {
        if self.levels(Side::Buy).iter().any(|l| l.orders.iter().any(|o| o.id == order_id)) {
            return Some(Side::Buy);
        }
        if self.levels(Side::Sell).iter().any(|l| l.orders.iter().any(|o| o.id == order_id)) {
            return Some(Side::Sell);
        }
        None
    }

    fn next_order_id(&mut self) -> (String, u64) {
        let seq = self.next_order_seq;
        self.next_order_seq += 1;
        (format!("clob-order-{seq}"), seq)
    }

    fn next_trade_id(&mut self) -> String {
        let seq = self.next_trade_seq;
        self.next_trade_seq += 1;
        format!("clob-trade-{seq}")
    }

    /// Places an order (LIMIT or MARKET) for `intent`. `intent.outcome`
    /// must be `Outcome::Yes`; the CLOB trades YES exclusively.
    pub fn place_order(
        &mut self,
        ledger: &mut Ledger,
        intent: OrderIntent,
        timestamp: u64,
    ) -> Result<ExecutionResult, EngineError> {
        if self.settled {
            return Err(EngineError::invalid_state("book is settled"));
        }
        intent.validate()?;
        if intent.outcome != Outcome::Yes {
            return Err(EngineError::invalid_input(
                "the CLOB trades YES exclusively",
            ));
        }
        if intent.spend.is_some() {
            return Err(EngineError::invalid_input(
                "the CLOB does not support spend-denominated orders",
            ));
        }
        let qty = intent.qty.expect("validated: qty present");
        let price_ref = self.mid_price().unwrap_or_else(|| Decimal::new(5, 1));

        if ledger.trader(&intent.trader_id).is_none() {
            return Ok(ExecutionResult::rejected(
                EngineTag::Clob,
                intent.clone(),
                EngineError::unknown_trader(intent.trader_id.clone()).to_string(),
                price_ref,
                timestamp,
                0,
            ));
        }

        let limit = match (intent.order_type, intent.side) {
            (OrderType::Market, Side::Buy) => MARKET_BUY_LIMIT,
            (OrderType::Market, Side::Sell) => MARKET_SELL_LIMIT,
            (OrderType::Limit, _) => intent.price.expect("validated: price present"),
        };

        // Pre-flight validation: collateral for BUY, sell-to-close for SELL.
        // Violations reject the whole order and touch nothing (§4.4).
        match intent.side {
            Side::Buy => {
                let required = limit * qty;
                if let Err(e) = ledger.check_buy_collateral(&intent.trader_id, required) {
                    return Ok(ExecutionResult::rejected(
                        EngineTag::Clob, intent, e.to_string(), price_ref, timestamp, 0,
                    ));
                }
            }
            Side::Sell => {
                if let Err(e) = ledger.check_sellable(&intent.trader_id, qty) {
                    return Ok(ExecutionResult::rejected(
                        EngineTag::Clob, intent, e.to_string(), price_ref, timestamp, 0,
                    ));
                }
            }
        }

        let price_before = self.mid_price().unwrap_or(price_ref);
        let (filled_qty, fills, balance_deltas) = self.match_against_book(
            ledger,
            &intent.trader_id,
            intent.side,
            limit,
            qty,
            timestamp,
        )?;
        let remaining = qty - filled_qty;

        // market orders never rest; zero depth crossed is a rejection,
        // not a vacuous fill.
        let status = if remaining == DEC_ZERO {
            OrderStatus::Filled
        } else if filled_qty > DEC_ZERO {
            OrderStatus::PartiallyFilled
        } else if intent.order_type == OrderType::Market {
            OrderStatus::Rejected
        } else {
            OrderStatus::Open
        };

        if intent.order_type == OrderType::Limit && remaining > DEC_ZERO {
            let (order_id, seq) = self.next_order_id();
            let resting = RestingOrder {
                id: order_id,
                trader_id: intent.trader_id.clone(),
                side: intent.side,
                price: limit,
                remaining,
                original_qty: qty,
                seq,
                status,
            };
            if let Some(trader) = ledger.trader_mut(&intent.trader_id) {
                trader.open_order_ids.insert(resting.id.clone());
                if intent.side == Side::Sell {
                    trader.pending_sell_qty += remaining;
                }
            }
            self.rest_order(intent.side, resting);
        }

        let price_after = self.mid_price().unwrap_or(price_before);
        let avg_fill_price = if filled_qty > DEC_ZERO {
            Some(fills.iter().map(|f| f.price * f.qty).sum::<Decimal>() / filled_qty)
        } else {
            None
        };
        let slippage = avg_fill_price.map(|p| match intent.side {
            Side::Buy => p - price_before,
            Side::Sell => price_before - p,
        });

        let rejection_reason = if status == OrderStatus::Rejected {
            Some("no crossing liquidity".to_string())
        } else {
            None
        };

        let result = ExecutionResult {
            engine: EngineTag::Clob,
            status,
            fills,
            filled_qty,
            remaining_qty: remaining,
            avg_fill_price,
            price_before,
            price_after,
            slippage,
            price_impact: Some(price_after - price_before),
            rejection_reason,
            balance_deltas,
            timestamp,
            sequence: ledger.next_sequence(),
            market_snapshot: Some(self.snapshot(timestamp)),
            intent,
        };
        Ok(result)
    }

    /// Walks the resting side opposite `taker_side` and matches at
    /// maker prices (the maker-price execution rule, §4.4). Mutates
    /// both the taker's and each maker's ledger entries directly.
    /// Returns total filled qty, the fills produced, and the
    /// accumulated `(trader_id, cash_delta, share_delta)` tuples for
    /// reporting (taker first, then one entry per maker touched).
    fn match_against_book(
        &mut self,
        ledger: &mut Ledger,
        taker_id: &str,
        taker_side: Side,
        limit: Decimal,
        qty: Decimal,
        timestamp: u64,
    ) -> Result<(Decimal, Vec<Fill>, Vec<(String, Decimal, Decimal)>), EngineError> {
        let mut remaining = qty;
        let mut fills = Vec::new();
        let mut deltas: Vec<(String, Decimal, Decimal)> = Vec::new();
        let maker_side = taker_side.opposite();
        let mut taker_cash_delta = DEC_ZERO;
        let mut taker_share_delta = DEC_ZERO;

        while remaining > DEC_ZERO {
            let crosses = match taker_side {
                Side::Buy => self.asks.first().map(|l| l.price <= limit).unwrap_or(false),
                Side::Sell => self.bids.first().map(|l| l.price >= limit).unwrap_or(false),
            };
            if !crosses {
                break;
            }

            let levels = self.levels_mut(maker_side);
            let maker_price = levels[0].price;
            let (trade_qty, maker_order_id, maker_trader_id, maker_done);
            {
                let maker = levels[0].orders.front_mut().expect("non-empty level invariant");
                trade_qty = remaining.min(maker.remaining);
                maker.remaining -= trade_qty;
                maker_order_id = maker.id.clone();
                maker_trader_id = maker.trader_id.clone();
                maker_done = maker.remaining == DEC_ZERO;
                maker.status = if maker_done {
                    OrderStatus::Filled
                } else {
                    OrderStatus::PartiallyFilled
                };
            }
            levels[0].total_qty -= trade_qty;
            if maker_done {
                levels[0].orders.pop_front();
            }
            if levels[0].orders.is_empty() {
                levels.remove(0);
            }
            remaining -= trade_qty;

            let cash_move = maker_price * trade_qty;
            let trade_id = self.next_trade_id();
            fills.push(Fill {
                trade_id,
                price: maker_price,
                qty: trade_qty,
                engine: EngineTag::Clob,
                maker_order_id: Some(maker_order_id.clone()),
                timestamp,
            });

            let (maker_cash_delta, maker_share_delta) = match taker_side {
                // Taker buys from a resting SELL maker: maker is credited
                // cash and had already reserved the shares via
                // pendingSellQty at rest time, now actually loses them.
                Side::Buy => {
                    taker_cash_delta -= cash_move;
                    taker_share_delta += trade_qty;
                    if let Some(maker) = ledger.trader_mut(&maker_trader_id) {
                        maker.cash += cash_move;
                        maker.yes_shares -= trade_qty;
                        maker.pending_sell_qty -= trade_qty.min(maker.pending_sell_qty);
                    }
                    (cash_move, -trade_qty)
                }
                // Taker sells into a resting BUY maker: maker is debited
                // cash and credited shares at their own bid price.
                Side::Sell => {
                    taker_cash_delta += cash_move;
                    taker_share_delta -= trade_qty;
                    if let Some(maker) = ledger.trader_mut(&maker_trader_id) {
                        maker.cash -= cash_move;
                        maker.yes_shares += trade_qty;
                    }
                    (-cash_move, trade_qty)
                }
            };
            deltas.push((maker_trader_id, maker_cash_delta, maker_share_delta));
        }

        let filled = qty - remaining;
        if filled > DEC_ZERO {
            if let Some(taker) = ledger.trader_mut(taker_id) {
                taker.cash += taker_cash_delta;
                taker.yes_shares += taker_share_delta;
            }
            deltas.insert(0, (taker_id.to_string(), taker_cash_delta, taker_share_delta));
        }

        Ok((filled, fills, deltas))
    }

    /// Cancels an order by id. Idempotent: an unknown id returns
    /// CANCELLED with no side effects.
    pub fn cancel_order(
        &mut self,
        ledger: &mut Ledger,
        order_id: &str,
        timestamp: u64,
    ) -> Result<CancelResult, EngineError> {
        if self.settled {
            return Err(EngineError::invalid_state("book is settled"));
        }
        let side = match self.find_order_side(order_id) {
            Some(s) => s,
            None => {
                return Ok(CancelResult {
                    order_id: order_id.to_string(),
                    status: OrderStatus::Cancelled,
                    cancelled_qty: DEC_ZERO,
                    timestamp,
                })
            }
        };
        let removed = self
            .remove_order(side, order_id)
            .expect("find_order_side just confirmed presence");
        if let Some(trader) = ledger.trader_mut(&removed.trader_id) {
            trader.open_order_ids.remove(order_id);
            if side == Side::Sell {
                trader.pending_sell_qty -= removed.remaining.min(trader.pending_sell_qty);
            }
        }
        Ok(CancelResult {
            order_id: order_id.to_string(),
            status: OrderStatus::Cancelled,
            cancelled_qty: removed.remaining,
            timestamp,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResult {
    pub order_id: String,
    pub status: OrderStatus,
    pub cancelled_qty: Decimal,
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderIntent, OrderType, Outcome};
    use rust_decimal_macros::dec;

    fn intent(
        id: &str,
        trader: &str,
        side: Side,
        order_type: OrderType,
        price: Option<Decimal>,
        qty: Decimal,
        ts: u64,
    ) -> OrderIntent {
        OrderIntent {
            intent_id: id.to_string(),
            trader_id: trader.to_string(),
            outcome: Outcome::Yes,
            side,
            order_type,
            price,
            qty: Some(qty),
            spend: None,
            timestamp: ts,
        }
    }

    fn ledger_with_shares(traders: &[(&str, Decimal, Decimal)]) -> Ledger {
        let mut ledger = Ledger::init(traders.iter().map(|(id, cash, _)| (id.to_string(), *cash)));
        for (id, _, shares) in traders {
            if let Some(t) = ledger.trader_mut(id) {
                t.yes_shares = *shares;
            }
        }
        ledger
    }

    // Scenario 3: CLOB simple cross.
    #[test]
    fn simple_cross_matches_at_maker_price() {
        let mut ledger = ledger_with_shares(&[
            ("alice", dec!(10000), dec!(100)),
            ("bob", dec!(10000), dec!(100)),
        ]);
        let mut book = OrderBook::new(dec!(0.01)).unwrap();

        book.place_order(
            &mut ledger,
            intent("i1", "alice", Side::Sell, OrderType::Limit, Some(dec!(0.50)), dec!(10), 1),
            1,
        )
        .unwrap();
        let result = book
            .place_order(
                &mut ledger,
                intent("i2", "bob", Side::Buy, OrderType::Limit, Some(dec!(0.55)), dec!(10), 2),
                2,
            )
            .unwrap();

        assert_eq!(result.filled_qty, dec!(10));
        assert_eq!(result.fills[0].price, dec!(0.50));
        let alice = ledger.trader("alice").unwrap();
        let bob = ledger.trader("bob").unwrap();
        assert_eq!(alice.cash, dec!(10005));
        assert_eq!(alice.yes_shares, dec!(90));
        assert_eq!(bob.cash, dec!(9995));
        assert_eq!(bob.yes_shares, dec!(110));
        assert!(book.best_bid().is_none());
        assert!(book.best_ask().is_none());
    }

    // Scenario 4: FIFO within a price level.
    #[test]
    fn fifo_within_price_level() {
        let mut ledger = ledger_with_shares(&[
            ("alice", dec!(10000), dec!(100)),
            ("bob", dec!(10000), dec!(100)),
            ("carol", dec!(10000), dec!(100)),
            ("dave", dec!(10000), dec!(100)),
        ]);
        let mut book = OrderBook::new(dec!(0.01)).unwrap();
        for (i, trader) in ["alice", "bob", "carol"].iter().enumerate() {
            book.place_order(
                &mut ledger,
                intent(&format!("s{i}"), trader, Side::Sell, OrderType::Limit, Some(dec!(0.50)), dec!(5), i as u64),
                i as u64,
            )
            .unwrap();
        }
        let result = book
            .place_order(
                &mut ledger,
                intent("buy1", "dave", Side::Buy, OrderType::Limit, Some(dec!(0.55)), dec!(12), 10),
                10,
            )
            .unwrap();

        assert_eq!(result.fills.len(), 3);
        assert_eq!(result.fills[0].qty, dec!(5));
        assert_eq!(result.fills[1].qty, dec!(5));
        assert_eq!(result.fills[2].qty, dec!(2));
        let remaining_at_level = book.orders_at_price(Side::Sell, dec!(0.50));
        assert_eq!(remaining_at_level.len(), 1);
        assert_eq!(remaining_at_level[0].trader_id, "carol");
        assert_eq!(remaining_at_level[0].remaining, dec!(3));
    }

    // Scenario 5: market order walks levels.
    #[test]
    fn market_order_walks_levels() {
        let mut ledger = ledger_with_shares(&[
            ("a", dec!(10000), dec!(100)),
            ("b", dec!(10000), dec!(100)),
            ("c", dec!(10000), dec!(100)),
            ("taker", dec!(10000), dec!(0)),
        ]);
        let mut book = OrderBook::new(dec!(0.01)).unwrap();
        book.place_order(&mut ledger, intent("s1", "a", Side::Sell, OrderType::Limit, Some(dec!(0.50)), dec!(5), 1), 1).unwrap();
        book.place_order(&mut ledger, intent("s2", "b", Side::Sell, OrderType::Limit, Some(dec!(0.55)), dec!(5), 2), 2).unwrap();
        book.place_order(&mut ledger, intent("s3", "c", Side::Sell, OrderType::Limit, Some(dec!(0.60)), dec!(5), 3), 3).unwrap();

        let result = book
            .place_order(
                &mut ledger,
                intent("m1", "taker", Side::Buy, OrderType::Market, None, dec!(12), 10),
                10,
            )
            .unwrap();

        assert_eq!(result.filled_qty, dec!(12));
        let total_payment: Decimal = result.fills.iter().map(|f| f.price * f.qty).sum();
        assert_eq!(total_payment, dec!(6.45));
        assert_eq!(result.remaining_qty, DEC_ZERO);
    }

    #[test]
    fn market_order_partial_fill_reports_remaining() {
        let mut ledger = ledger_with_shares(&[
            ("a", dec!(10000), dec!(100)),
            ("taker", dec!(10000), dec!(0)),
        ]);
        let mut book = OrderBook::new(dec!(0.01)).unwrap();
        book.place_order(&mut ledger, intent("s1", "a", Side::Sell, OrderType::Limit, Some(dec!(0.50)), dec!(5), 1), 1).unwrap();

        let result = book
            .place_order(
                &mut ledger,
                intent("m1", "taker", Side::Buy, OrderType::Market, None, dec!(12), 10),
                10,
            )
            .unwrap();

        assert_eq!(result.filled_qty, dec!(5));
        assert_eq!(result.remaining_qty, dec!(7));
        assert_eq!(result.status, OrderStatus::PartiallyFilled);
    }

    #[test]
    fn market_order_with_no_liquidity_is_rejected() {
        let mut ledger = ledger_with_shares(&[("taker", dec!(10000), dec!(0))]);
        let mut book = OrderBook::new(dec!(0.01)).unwrap();

        let result = book
            .place_order(
                &mut ledger,
                intent("m1", "taker", Side::Buy, OrderType::Market, None, dec!(12), 1),
                1,
            )
            .unwrap();

        assert_eq!(result.filled_qty, DEC_ZERO);
        assert_eq!(result.remaining_qty, dec!(12));
        assert_eq!(result.status, OrderStatus::Rejected);
    }

    #[test]
    fn sell_exceeding_shares_is_rejected() {
        let mut ledger = ledger_with_shares(&[("alice", dec!(1000), dec!(5))]);
        let mut book = OrderBook::new(dec!(0.01)).unwrap();
        let result = book
            .place_order(
                &mut ledger,
                intent("s1", "alice", Side::Sell, OrderType::Limit, Some(dec!(0.50)), dec!(10), 1),
                1,
            )
            .unwrap();
        assert_eq!(result.status, OrderStatus::Rejected);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut ledger = ledger_with_shares(&[("alice", dec!(1000), dec!(5))]);
        let mut book = OrderBook::new(dec!(0.01)).unwrap();
        let result = book
            .place_order(
                &mut ledger,
                intent("s1", "alice", Side::Sell, OrderType::Limit, Some(dec!(0.50)), dec!(3), 1),
                1,
            )
            .unwrap();
        assert_eq!(ledger.trader("alice").unwrap().pending_sell_qty, dec!(3));
        let order_id = book.orders_at_price(Side::Sell, dec!(0.50))[0].id.clone();
        let _ = result;

        let c1 = book.cancel_order(&mut ledger, &order_id, 2).unwrap();
        assert_eq!(c1.status, OrderStatus::Cancelled);
        assert_eq!(ledger.trader("alice").unwrap().pending_sell_qty, dec!(0));

        let c2 = book.cancel_order(&mut ledger, &order_id, 3).unwrap();
        assert_eq!(c2.status, OrderStatus::Cancelled);
        assert_eq!(c2.cancelled_qty, DEC_ZERO);
    }

    #[test]
    fn no_crossed_book_invariant_holds() {
        let mut ledger = ledger_with_shares(&[
            ("alice", dec!(10000), dec!(100)),
            ("bob", dec!(10000), dec!(100)),
        ]);
        let mut book = OrderBook::new(dec!(0.01)).unwrap();
        book.place_order(&mut ledger, intent("s1", "alice", Side::Sell, OrderType::Limit, Some(dec!(0.52)), dec!(5), 1), 1).unwrap();
        book.place_order(&mut ledger, intent("b1", "bob", Side::Buy, OrderType::Limit, Some(dec!(0.48)), dec!(5), 2), 2).unwrap();
        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            assert!(bid < ask);
        }
    }
}
