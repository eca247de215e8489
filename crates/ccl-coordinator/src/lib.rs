//! # ccl-coordinator — Loan Request Coordinator
//!
//! Sits between a borrower, an external auction engine, and the settlement
//! contract each resolved auction produces. It owns four pieces of state:
//!
//! - **Asset config registry** (`registry.rs`): the approved
//!   (collateral, price feed, settlement) triples.
//! - **Collateral custody ledger** (`custody.rs`): locked aggregate per
//!   token; bounds every discretionary withdrawal.
//! - **Loan request ledger** (`ledger.rs`): the per-request state machine
//!   from `ccl-state`, keyed by engine-assigned ids.
//! - **Fee rate and authority**: configuration set by a privileged address.
//!
//! The settlement handoff (`handoff.rs`) consumes a resolved auction and
//! releases custody exactly once.
//!
//! ## Collaborators
//!
//! The coordinator talks to the outside world through two trait objects:
//! [`AuctionEngine`] and [`TokenLedger`]. Both implement [`Transactional`]
//! so a failed operation rolls them back together with local state.
//! [`StubAuctionEngine`] and [`InMemoryTokenLedger`] are complete
//! in-process implementations used by the CLI and the test suites.
//!
//! ## Execution
//!
//! See [`coordinator`] for the serialization, reentrancy, and
//! all-or-nothing rules every entry point follows.

pub mod auction;
pub mod config;
pub mod coordinator;
pub mod custody;
pub mod error;
pub mod events;
mod handoff;
pub mod ledger;
pub mod registry;
pub mod settlement;
pub mod stub;
pub mod token;
pub mod transactional;

pub use auction::{AuctionEngine, AuctionError, AuctionStatus, AuctionTerms, EarlySettlementOffer};
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, LoanParams};
pub use custody::CustodyLedger;
pub use error::CoordinatorError;
pub use events::CoordinatorEvent;
pub use ledger::LoanLedger;
pub use registry::{AssetConfig, AssetRegistry};
pub use settlement::{
    SequentialSettlementFactory, SettlementContract, SettlementFactory, SettlementHandoff,
};
pub use stub::StubAuctionEngine;
pub use token::{InMemoryTokenLedger, TokenError, TokenLedger};
pub use transactional::{SnapshotStack, Transactional};
