//! Typed, append-only log sink (SPEC_FULL.md §4.9).
//!
//! Every event carries an emitting-engine tag, a logical timestamp, and
//! a typed payload; the whole stream serializes to deterministic JSON
//! (`serde`'s struct-field order is stable, unlike a hand-assembled
//! `serde_json::Map`, which is why every payload below is a concrete
//! struct rather than a loose `Value`). Event order is part of the
//! observable contract (SPEC_FULL.md §5); `LogSink` is append-only and
//! never reorders or batches.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    EngineTag, ExecutionResult, Fill, MarketStateSnapshot, OrderIntent, OrderStatus, Outcome,
    SettlementResult,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceivedData {
    pub intent: OrderIntent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAcceptedData {
    pub intent_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRejectedData {
    pub intent_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFilledData {
    pub intent_id: String,
    pub filled_qty: Decimal,
    pub avg_fill_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPartiallyFilledData {
    pub intent_id: String,
    pub filled_qty: Decimal,
    pub remaining_qty: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledData {
    pub order_id: String,
    pub cancelled_qty: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeExecutedData {
    pub fill: Fill,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStateUpdateData {
    pub snapshot: MarketStateSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecisionData {
    pub intent_id: String,
    pub chosen_engine: EngineTag,
    pub observed_spread: Option<Decimal>,
    pub observed_depth: Option<Decimal>,
    pub max_spread: Decimal,
    pub min_depth: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshotData {
    pub bids_top: Vec<(Decimal, Decimal)>,
    pub asks_top: Vec<(Decimal, Decimal)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementData {
    pub result: SettlementResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteData {
    pub outcome: Outcome,
    pub qty: Decimal,
    pub payment: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    pub message: String,
}

/// One variant per SPEC_FULL.md §4.9 event kind; `#[serde(tag, content)]`
/// gives each serialized event a `"type"` discriminant and a nested
/// `"data"` object, matching the produced-artifact shape in §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogPayload {
    OrderReceived(OrderReceivedData),
    OrderAccepted(OrderAcceptedData),
    OrderRejected(OrderRejectedData),
    OrderFilled(OrderFilledData),
    OrderPartiallyFilled(OrderPartiallyFilledData),
    OrderCancelled(OrderCancelledData),
    TradeExecuted(TradeExecutedData),
    MarketStateUpdate(MarketStateUpdateData),
    RoutingDecision(RoutingDecisionData),
    BookSnapshot(BookSnapshotData),
    Settlement(SettlementData),
    Quote(QuoteData),
    Error(ErrorData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(rename = "engineType")]
    pub engine_type: EngineTag,
    pub timestamp: u64,
    #[serde(flatten)]
    pub payload: LogPayload,
}

/// Append-only event list. Never reorders or drops events; the log
/// stream's order is an observable part of the contract.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    events: Vec<LogEvent>,
}

impl LogSink {
    pub fn new() -> Self {
        LogSink { events: Vec::new() }
    }

    pub fn push(&mut self, engine_type: EngineTag, timestamp: u64, payload: LogPayload) {
        self.events.push(LogEvent {
            engine_type,
            timestamp,
            payload,
        });
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    /// The slice of events appended since `from` (an index previously
    /// read via `events().len()`), used to attach a per-`ExecutionResult`
    /// log slice (SPEC_FULL.md §4.6).
    pub fn since(&self, from: usize) -> &[LogEvent] {
        &self.events[from.min(self.events.len())..]
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.events)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }
}

/// Shared by every `TradingEngine` implementor: appends the
/// ORDER_ACCEPTED/FILLED/PARTIALLY_FILLED/REJECTED event implied by
/// `result.status`, plus one TRADE_EXECUTED per fill. Centralized here
/// so the three engine facades (`LmsrEngine`, `ClobEngine`,
/// `HybridEngine`) can't drift on what gets logged for a given result.
pub fn log_execution_result(sink: &mut LogSink, tag: EngineTag, result: &ExecutionResult) {
    match result.status {
        OrderStatus::Rejected => sink.push(
            tag,
            result.timestamp,
            LogPayload::OrderRejected(OrderRejectedData {
                intent_id: result.intent.intent_id.clone(),
                reason: result.rejection_reason.clone().unwrap_or_default(),
            }),
        ),
        OrderStatus::Filled => sink.push(
            tag,
            result.timestamp,
            LogPayload::OrderFilled(OrderFilledData {
                intent_id: result.intent.intent_id.clone(),
                filled_qty: result.filled_qty,
                avg_fill_price: result.avg_fill_price,
            }),
        ),
        OrderStatus::PartiallyFilled => sink.push(
            tag,
            result.timestamp,
            LogPayload::OrderPartiallyFilled(OrderPartiallyFilledData {
                intent_id: result.intent.intent_id.clone(),
                filled_qty: result.filled_qty,
                remaining_qty: result.remaining_qty,
            }),
        ),
        OrderStatus::Open => sink.push(
            tag,
            result.timestamp,
            LogPayload::OrderAccepted(OrderAcceptedData {
                intent_id: result.intent.intent_id.clone(),
            }),
        ),
        OrderStatus::Cancelled => {}
    }
    for fill in &result.fills {
        sink.push(
            tag,
            result.timestamp,
            LogPayload::TradeExecuted(TradeExecutedData { fill: fill.clone() }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn event_order_is_preserved() {
        let mut sink = LogSink::new();
        sink.push(
            EngineTag::Clob,
            1,
            LogPayload::OrderReceived(OrderReceivedData {
                intent: OrderIntent {
                    intent_id: "i1".into(),
                    trader_id: "alice".into(),
                    outcome: Outcome::Yes,
                    side: crate::types::Side::Buy,
                    order_type: crate::types::OrderType::Market,
                    price: None,
                    qty: Some(dec!(1)),
                    spend: None,
                    timestamp: 1,
                },
            }),
        );
        sink.push(
            EngineTag::Clob,
            2,
            LogPayload::Error(ErrorData {
                message: "boom".into(),
            }),
        );
        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.events()[0].timestamp, 1);
        assert_eq!(sink.events()[1].timestamp, 2);
    }

    #[test]
    fn serializes_with_type_and_data_tags() {
        let mut sink = LogSink::new();
        sink.push(
            EngineTag::Lmsr,
            5,
            LogPayload::Quote(QuoteData {
                outcome: Outcome::Yes,
                qty: dec!(10),
                payment: dec!(5.1),
            }),
        );
        let json = sink.to_json().unwrap();
        assert!(json.contains("\"type\":\"QUOTE\""));
        assert!(json.contains("\"engineType\":\"LMSR\""));
    }

    #[test]
    fn since_returns_only_new_events() {
        let mut sink = LogSink::new();
        sink.push(EngineTag::Clob, 1, LogPayload::Error(ErrorData { message: "a".into() }));
        let mark = sink.events().len();
        sink.push(EngineTag::Clob, 2, LogPayload::Error(ErrorData { message: "b".into() }));
        assert_eq!(sink.since(mark).len(), 1);
    }
}
