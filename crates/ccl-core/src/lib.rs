//! # ccl-core — Foundational Types for Covered-Call Loans
//!
//! This crate is the leaf of the workspace DAG. It defines the primitives
//! every other `ccl-*` crate builds on:
//!
//! 1. **Identity newtypes.** `Address`, `LoanId`, `AssetConfigId`. No bare
//!    byte arrays or integers cross a crate boundary as identifiers.
//!
//! 2. **Fee Engine** (`fee.rs`). A pure, bounded basis-point split of a
//!    premium into a coordinator fee and a net amount.
//!
//! 3. **Fixed-point notional arithmetic** (`fixed_point.rs`). Converts a
//!    collateral amount and an oracle-scaled strike into a settlement-token
//!    notional, normalizing token decimals before applying `PRICE_SCALE`.
//!
//! 4. **Error taxonomy** (`error.rs`). Every failure in the workspace is
//!    classified as validation, authorization, state, or consistency.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `ccl-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests. All arithmetic is checked.

pub mod error;
pub mod fee;
pub mod fixed_point;
pub mod identity;

/// Token amounts in the smallest unit of the token.
pub type Amount = u128;

pub use error::{ErrorKind, HexParseError, MathError};
pub use fee::{compute_fee, FeeBps, FeeSplit, BPS_DENOMINATOR, MAX_FEE_BPS};
pub use fixed_point::{contract_count, notional, notional_for_contracts, PRICE_SCALE};
pub use identity::{Address, AssetConfigId, LoanId};
