//! # Loan Request Lifecycle
//!
//! ## States
//!
//! - `Open` → collateral is locked and the auction is live.
//! - `Settled` → the auction resolved and custody was handed to the
//!   settlement contract recorded in `settled_contract` (terminal).
//! - `Cancelled` → the requester withdrew before resolution (terminal).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ccl_core::{Address, Amount, LoanId};

// ─── Loan Status ─────────────────────────────────────────────────────

/// The lifecycle state of a loan request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    /// Collateral locked, auction running.
    Open,
    /// Auction resolved and custody handed off (terminal).
    Settled,
    /// Withdrawn by the requester (terminal).
    Cancelled,
}

impl LoanStatus {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Cancelled)
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Open => "OPEN",
            Self::Settled => "SETTLED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by loan lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoanError {
    /// The request already left `Open`.
    #[error("{id} already resolved as {state}")]
    AlreadyResolved {
        /// The loan request.
        id: LoanId,
        /// Its terminal state.
        state: LoanStatus,
    },
}

// ─── Terms & Records ─────────────────────────────────────────────────

/// Economic terms fixed when the request is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Token deposited as collateral.
    pub collateral_token: Address,
    /// Oracle feed the option settles against.
    pub price_feed: Address,
    /// Token the premium and strike are paid in.
    pub settlement_token: Address,
    /// Collateral locked for this request.
    pub collateral_amount: Amount,
    /// Strike at `PRICE_SCALE`.
    pub strike: Amount,
    /// Settlement-token notional the auction was opened for.
    pub notional: Amount,
    /// Contracts backing the notional, derived from it at the same rounding.
    pub contract_count: Amount,
    /// Option expiry.
    pub expiry: DateTime<Utc>,
    /// End of bidding.
    pub auction_deadline: DateTime<Utc>,
}

/// Record of a loan status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTransitionRecord {
    /// State before the transition.
    pub from_state: LoanStatus,
    /// State after the transition.
    pub to_state: LoanStatus,
    /// When the transition was applied.
    pub timestamp: DateTime<Utc>,
}

// ─── Loan Request ────────────────────────────────────────────────────

/// A loan request and its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRequest {
    /// Identifier assigned by the auction engine.
    pub id: LoanId,
    /// The borrower.
    pub requester: Address,
    /// Terms fixed at creation.
    pub terms: LoanTerms,
    /// Current lifecycle state.
    pub status: LoanStatus,
    /// Settlement contract that took custody, once settled.
    pub settled_contract: Option<Address>,
    /// When the request was opened.
    pub created_at: DateTime<Utc>,
    /// When the request left `Open`.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Ordered log of status transitions.
    pub transitions: Vec<LoanTransitionRecord>,
}

impl LoanRequest {
    /// Open a new request.
    pub fn open(id: LoanId, requester: Address, terms: LoanTerms, now: DateTime<Utc>) -> Self {
        Self {
            id,
            requester,
            terms,
            status: LoanStatus::Open,
            settled_contract: None,
            created_at: now,
            resolved_at: None,
            transitions: Vec::new(),
        }
    }

    /// Whether the request is still open.
    pub fn is_open(&self) -> bool {
        self.status == LoanStatus::Open
    }

    /// Fail unless the request is `Open`.
    pub fn ensure_open(&self) -> Result<(), LoanError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(LoanError::AlreadyResolved {
                id: self.id,
                state: self.status,
            })
        }
    }

    /// OPEN → CANCELLED.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), LoanError> {
        self.ensure_open()?;
        self.do_transition(LoanStatus::Cancelled, now);
        Ok(())
    }

    /// OPEN → SETTLED, recording the contract that took custody.
    pub fn settle(&mut self, contract: Address, now: DateTime<Utc>) -> Result<(), LoanError> {
        self.ensure_open()?;
        self.settled_contract = Some(contract);
        self.do_transition(LoanStatus::Settled, now);
        Ok(())
    }

    fn do_transition(&mut self, to: LoanStatus, now: DateTime<Utc>) {
        self.transitions.push(LoanTransitionRecord {
            from_state: self.status,
            to_state: to,
            timestamp: now,
        });
        self.status = to;
        self.resolved_at = Some(now);
    }
}
