//! # ccl-state — Loan Request State Machine
//!
//! A loan request is created `Open` together with its collateral lock and
//! leaves `Open` exactly once:
//!
//! ```text
//!            ┌──settle(contract)──▶ Settled   (terminal)
//!   Open ────┤
//!            └──cancel()──────────▶ Cancelled (terminal)
//! ```
//!
//! Terminal states are immutable. Any further transition attempt fails with
//! [`LoanError::AlreadyResolved`] and leaves the record untouched.
//!
//! The coordinator owns every `LoanRequest`; this crate only enforces which
//! transitions are legal and records them.

pub mod loan;

pub use loan::{LoanError, LoanRequest, LoanStatus, LoanTerms, LoanTransitionRecord};
