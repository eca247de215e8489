//! # Auction Engine Interface
//!
//! Price discovery is delegated to an external request-for-quotation engine.
//! The coordinator only opens, cancels, and nudges auctions, and reads back
//! how they resolved. Bidding, reserve enforcement, limit-order conversion,
//! and referral tracking are the engine's concern.
//!
//! ## Id Agreement
//!
//! The engine owns the id sequence. Before opening an auction the
//! coordinator reads [`AuctionEngine::next_auction_id`]; the id returned by
//! [`AuctionEngine::open_auction`] must match it or the whole request is
//! aborted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ccl_core::{Address, Amount, LoanId};

use crate::transactional::Transactional;

/// Failure reported by the auction engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuctionError {
    /// No auction with this id.
    #[error("unknown auction {0}")]
    UnknownAuction(LoanId),

    /// The auction already concluded or was cancelled.
    #[error("auction {0} is closed")]
    Closed(LoanId),

    /// The engine refused the call.
    #[error("auction engine rejected call: {0}")]
    Rejected(String),
}

/// Terms the coordinator opens an auction with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionTerms {
    /// Borrower on whose behalf the auction runs.
    pub requester: Address,
    /// Collateral backing the option.
    pub collateral_token: Address,
    /// Oracle feed for the option.
    pub price_feed: Address,
    /// Token bids are denominated in.
    pub settlement_token: Address,
    /// Collateral amount.
    pub collateral_amount: Amount,
    /// Strike at `PRICE_SCALE`.
    pub strike: Amount,
    /// Settlement-token notional being auctioned.
    pub notional: Amount,
    /// Contracts backing the notional.
    pub contract_count: Amount,
    /// Option expiry.
    pub expiry: DateTime<Utc>,
    /// Bidding closes at this instant.
    pub deadline: DateTime<Utc>,
    /// Lowest bid the requester accepts.
    pub min_acceptable_notional: Amount,
    /// Convert to a resting limit order if unfilled at the deadline.
    pub convert_to_limit_order: bool,
    /// Opaque key lenders use to reach the requester.
    pub requester_contact_key: String,
}

/// Engine-side view of an auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionStatus {
    /// Bidding still running.
    pub is_open: bool,
    /// Premium of the winning bid (zero while open).
    pub winning_premium: Amount,
    /// Fee the engine kept before forwarding the premium.
    pub fee_withheld: Amount,
    /// Single-use settlement contract created for the resolved auction.
    pub settlement_contract: Option<Address>,
}

/// A take-it-now instruction forwarded to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarlySettlementOffer {
    /// Premium the requester accepts.
    pub amount: Amount,
    /// Offer nonce, as signed by the counterparty.
    pub nonce: u64,
    /// Lender whose quote is accepted.
    pub counterparty: Address,
}

/// The request-for-quotation engine the coordinator brokers through.
pub trait AuctionEngine: Transactional + Send {
    /// The id the next `open_auction` call will assign.
    fn next_auction_id(&self) -> LoanId;

    /// Open bidding. Returns the assigned id.
    fn open_auction(&mut self, terms: AuctionTerms) -> Result<LoanId, AuctionError>;

    /// Current status of an auction.
    fn report_status(&self, id: LoanId) -> Result<AuctionStatus, AuctionError>;

    /// Withdraw an open auction.
    fn cancel_auction(&mut self, id: LoanId) -> Result<(), AuctionError>;

    /// Accept a quote before the deadline.
    fn early_settle(&mut self, id: LoanId, offer: &EarlySettlementOffer) -> Result<(), AuctionError>;
}
