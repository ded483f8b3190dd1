//! Market ledger primitives (SPEC_FULL.md §4.2).
//!
//! `Ledger` owns the set of `TraderAccount`s shared across engines. The
//! only sanctioned mutators are [`Ledger::apply_execution`] and
//! [`Ledger::apply_settlement`]; both are idempotent with respect to a
//! result that has already been applied, tracked via a monotone
//! `sequence` counter, the same way a row version is bumped on every
//! update.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::EngineError;
use crate::types::{ExecutionResult, Outcome, SettlementResult, TraderAccount};

#[derive(Debug, Clone)]
pub struct Ledger {
    traders: HashMap<String, TraderAccount>,
    settled: bool,
    last_applied_sequence: u64,
    next_sequence: u64,
}

impl Ledger {
    /// `initLedger(b, [(id, cash)])` minus the LMSR `b`, which belongs
    /// to the LMSR engine's own state, not the shared ledger.
    pub fn init(traders: impl IntoIterator<Item = (String, Decimal)>) -> Self {
        let mut map = HashMap::new();
        for (id, cash) in traders {
            map.insert(id.clone(), TraderAccount::new(id, cash));
        }
        Ledger {
            traders: map,
            settled: false,
            last_applied_sequence: 0,
            next_sequence: 1,
        }
    }

    pub fn init_trader(id: impl Into<String>, cash: Decimal) -> TraderAccount {
        TraderAccount::new(id, cash)
    }

    pub fn add_trader(&mut self, id: impl Into<String>, cash: Decimal) -> Result<(), EngineError> {
        if self.settled {
            return Err(EngineError::invalid_state(
                "cannot add a trader after settlement",
            ));
        }
        let id = id.into();
        if self.traders.contains_key(&id) {
            return Err(EngineError::invalid_input(format!(
                "trader {id} already exists"
            )));
        }
        self.traders.insert(id.clone(), TraderAccount::new(id, cash));
        Ok(())
    }

    pub fn trader(&self, id: &str) -> Option<&TraderAccount> {
        self.traders.get(id)
    }

    pub fn trader_mut(&mut self, id: &str) -> Option<&mut TraderAccount> {
        self.traders.get_mut(id)
    }

    pub fn traders(&self) -> impl Iterator<Item = &TraderAccount> {
        self.traders.values()
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn next_sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    /// The only sanctioned mutator besides `apply_settlement`. Debits
    /// and credits trader balances per `result.balance_deltas`. A
    /// result whose `sequence` has already been applied is a no-op.
    pub fn apply_execution(&mut self, result: &ExecutionResult) -> Result<(), EngineError> {
        if result.sequence <= self.last_applied_sequence {
            return Ok(());
        }
        for (trader_id, cash_delta, share_delta) in &result.balance_deltas {
            let trader = self
                .traders
                .get_mut(trader_id)
                .ok_or_else(|| EngineError::unknown_trader(trader_id.clone()))?;
            trader.cash += *cash_delta;
            match result.intent.outcome {
                Outcome::Yes => trader.yes_shares += *share_delta,
                Outcome::No => trader.no_shares += *share_delta,
            }
        }
        self.last_applied_sequence = result.sequence;
        Ok(())
    }

    /// Pays winning share-holders $1/share, zeroes losing shares, and
    /// marks the ledger terminal. Idempotent on `sequence`.
    pub fn apply_settlement(&mut self, result: &SettlementResult) -> Result<(), EngineError> {
        if result.sequence <= self.last_applied_sequence {
            return Ok(());
        }
        for payout in &result.payouts {
            if let Some(trader) = self.traders.get_mut(&payout.trader_id) {
                trader.cash += payout.payout;
                trader.yes_shares = Decimal::ZERO;
                trader.no_shares = Decimal::ZERO;
            }
        }
        self.settled = true;
        self.last_applied_sequence = result.sequence;
        Ok(())
    }

    /// Validates a prospective SELL against the sell-to-close budget
    /// without mutating state. Engines call this before committing a
    /// fill or resting order.
    pub fn check_sellable(&self, trader_id: &str, qty: Decimal) -> Result<(), EngineError> {
        let trader = self
            .traders
            .get(trader_id)
            .ok_or_else(|| EngineError::unknown_trader(trader_id))?;
        let sellable = trader.sellable_yes_qty();
        if qty > sellable {
            return Err(EngineError::InsufficientShares {
                requested: qty.to_string(),
                available: sellable.to_string(),
            });
        }
        Ok(())
    }

    pub fn check_buy_collateral(&self, trader_id: &str, required: Decimal) -> Result<(), EngineError> {
        let trader = self
            .traders
            .get(trader_id)
            .ok_or_else(|| EngineError::unknown_trader(trader_id))?;
        if trader.cash < required {
            return Err(EngineError::InsufficientCash {
                required: required.to_string(),
                available: trader.cash.to_string(),
            });
        }
        Ok(())
    }
}
