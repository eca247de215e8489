//! # ccl-cli — Covered-Call Loan Command-Line Interface
//!
//! ## Subcommands
//!
//! - `quote` — notional, contract count, and fee split for a prospective loan
//! - `simulate` — run a YAML scenario end-to-end against the in-memory
//!   collaborators and print the committed event log
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; every rule lives in the domain crates.
//! - Output is JSON on stdout. Logs go to stderr.

pub mod quote;
pub mod simulate;
