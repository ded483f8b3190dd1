//! Engine error taxonomy.
//!
//! These are the kinds the core distinguishes internally so that a
//! trader-facing `ExecutionResult` can carry a typed rejection reason
//! instead of an opaque string. `anyhow` stays at the outer (driver,
//! example binary) layer for freeform context; inside the engines every
//! fallible operation returns `Result<_, EngineError>`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    InvalidInput(String),
    InvalidState(String),
    AlreadySettled,
    UnknownTrader(String),
    InsufficientCash { required: String, available: String },
    InsufficientShares { requested: String, available: String },
    PrecisionFailure(String),
}

impl EngineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        EngineError::InvalidInput(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        EngineError::InvalidState(msg.into())
    }

    pub fn unknown_trader(id: impl Into<String>) -> Self {
        EngineError::UnknownTrader(id.into())
    }

    pub fn precision_failure(msg: impl Into<String>) -> Self {
        EngineError::PrecisionFailure(msg.into())
    }

    /// Short machine-stable tag, used as the `rejectionReason` kind and
    /// in log event payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidInput(_) => "InvalidInput",
            EngineError::InvalidState(_) => "InvalidState",
            EngineError::AlreadySettled => "AlreadySettled",
            EngineError::UnknownTrader(_) => "UnknownTrader",
            EngineError::InsufficientCash { .. } => "InsufficientCash",
            EngineError::InsufficientShares { .. } => "InsufficientShares",
            EngineError::PrecisionFailure(_) => "PrecisionFailure",
        }
    }

    /// True for errors that must halt the engine rather than surface as
    /// a rejected order (see SPEC_FULL.md §7).
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::PrecisionFailure(_))
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EngineError::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            EngineError::AlreadySettled => write!(f, "market already settled"),
            EngineError::UnknownTrader(id) => write!(f, "unknown trader: {id}"),
            EngineError::InsufficientCash { required, available } => write!(
                f,
                "insufficient cash: required {required}, available {available}"
            ),
            EngineError::InsufficientShares { requested, available } => write!(
                f,
                "insufficient shares: requested {requested}, available {available}"
            ),
            EngineError::PrecisionFailure(msg) => write!(f, "precision failure: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
