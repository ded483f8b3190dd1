//! Fixed-precision decimal facade.
//!
//! Every monetary, share, or price quantity in this crate is a
//! `rust_decimal::Decimal`, never `f64`. ~28-29 significant digits,
//! exact base-10 arithmetic, and a stable `to_string` so identical
//! computations emit byte-identical strings across runs.

use rust_decimal::MathematicalOps;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::EngineError;

pub const DEC_ZERO: Decimal = Decimal::ZERO;
pub const DEC_ONE: Decimal = Decimal::ONE;
pub const DEC_TWO: Decimal = Decimal::TWO;

/// Natural log of `x`, `x` must be strictly positive.
pub fn ln(x: Decimal) -> Result<Decimal, EngineError> {
    x.checked_ln()
        .ok_or_else(|| EngineError::precision_failure(format!("ln({x}) did not converge")))
}

/// `e^x`.
pub fn exp(x: Decimal) -> Result<Decimal, EngineError> {
    x.checked_exp()
        .ok_or_else(|| EngineError::precision_failure(format!("exp({x}) did not converge")))
}

/// Square root of `x`, `x` must be non-negative.
pub fn sqrt(x: Decimal) -> Result<Decimal, EngineError> {
    x.sqrt()
        .ok_or_else(|| EngineError::precision_failure(format!("sqrt({x}) did not converge")))
}

/// Full-precision stable string form, used everywhere a decimal crosses
/// a log/JSON/CSV boundary.
pub fn to_decimal_string(x: Decimal) -> String {
    x.normalize().to_string()
}

/// Lossy conversion used only where a `Decimal` must feed a transcendental
/// helper with no closed-form `Decimal` equivalent (Box-Muller draws in
/// the RNG). Never used on money, shares, or prices.
pub fn to_f64_lossy(x: Decimal) -> f64 {
    x.to_f64().unwrap_or(0.0)
}
