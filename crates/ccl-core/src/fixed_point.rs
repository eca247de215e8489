//! # Decimal-Normalized Notional Arithmetic
//!
//! Converts between a collateral amount, an oracle-scaled strike, and the
//! settlement-token notional the auction is run for.
//!
//! ```text
//! notional       = collateral * strike * 10^settlement_decimals
//!                  / 10^collateral_decimals / PRICE_SCALE
//! contract_count = notional * PRICE_SCALE / strike
//! ```
//!
//! Decimals are normalized by their difference before the oracle scale is
//! applied, so the intermediate product only grows by `10^(sd - cd)` when the
//! settlement token has more decimals than the collateral, and shrinks
//! otherwise. Every step is checked; the floors are identical to evaluating
//! the formula left to right with unbounded integers.
//!
//! `contract_count` is re-derived from the notional, not cached from the
//! collateral amount, so both values carry the same rounding.

use crate::error::MathError;
use crate::Amount;

/// Fixed-point scale of oracle prices and strikes (8 decimals).
pub const PRICE_SCALE: Amount = 100_000_000;

fn pow10(exp: u32, op: &'static str) -> Result<Amount, MathError> {
    Amount::from(10u8)
        .checked_pow(exp)
        .ok_or(MathError::Overflow { op })
}

/// Settlement-token notional of `collateral_amount` at `strike`.
///
/// `strike` is expressed at [`PRICE_SCALE`]; the result is in the smallest
/// unit of the settlement token.
pub fn notional(
    collateral_amount: Amount,
    strike: Amount,
    collateral_decimals: u8,
    settlement_decimals: u8,
) -> Result<Amount, MathError> {
    const OP: &str = "notional";
    let product = collateral_amount
        .checked_mul(strike)
        .ok_or(MathError::Overflow { op: OP })?;
    let normalized = if settlement_decimals >= collateral_decimals {
        let up = pow10(u32::from(settlement_decimals - collateral_decimals), OP)?;
        product.checked_mul(up).ok_or(MathError::Overflow { op: OP })?
    } else {
        product / pow10(u32::from(collateral_decimals - settlement_decimals), OP)?
    };
    Ok(normalized / PRICE_SCALE)
}

/// Number of option contracts (in settlement units) backing `notional`.
pub fn contract_count(notional: Amount, strike: Amount) -> Result<Amount, MathError> {
    const OP: &str = "contract_count";
    if strike == 0 {
        return Err(MathError::DivisionByZero { op: OP });
    }
    let scaled = notional
        .checked_mul(PRICE_SCALE)
        .ok_or(MathError::Overflow { op: OP })?;
    Ok(scaled / strike)
}

/// Inverse of [`contract_count`]: the notional represented by `contracts`.
pub fn notional_for_contracts(contracts: Amount, strike: Amount) -> Result<Amount, MathError> {
    const OP: &str = "notional_for_contracts";
    let product = contracts
        .checked_mul(strike)
        .ok_or(MathError::Overflow { op: OP })?;
    Ok(product / PRICE_SCALE)
}
