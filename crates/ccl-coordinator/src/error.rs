//! # Coordinator Errors
//!
//! Every entry point returns `Result<_, CoordinatorError>`. A returned error
//! means the operation had no effect: staged state is discarded and the
//! collaborators are rolled back.

use thiserror::Error;

use ccl_core::{Address, AssetConfigId, ErrorKind, LoanId, MathError};
use ccl_state::{LoanError, LoanStatus};

use crate::auction::AuctionError;
use crate::token::TokenError;

/// Error returned by coordinator entry points.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    // ── Validation ───────────────────────────────────────────────────
    /// A required address was zero.
    #[error("{field} must not be the zero address")]
    ZeroAddress {
        /// Parameter name.
        field: &'static str,
    },

    /// A required amount was zero.
    #[error("{field} must be positive")]
    ZeroAmount {
        /// Parameter name.
        field: &'static str,
    },

    /// The (collateral, feed, settlement) triple is not active.
    #[error("asset combination {0} is not approved")]
    AssetNotApproved(AssetConfigId),

    /// Deconfiguring a triple that is not active.
    #[error("asset combination {0} is not active")]
    AssetNotFound(AssetConfigId),

    /// Fee above `MAX_FEE_BPS`.
    #[error("fee {requested} bps exceeds cap {cap} bps")]
    FeeAboveCap {
        /// Requested rate.
        requested: u16,
        /// The cap.
        cap: u16,
    },

    /// Bidding must close strictly before the option expires.
    #[error("auction deadline must precede expiry")]
    InvalidSchedule,

    /// No request with this id.
    #[error("unknown loan request {0}")]
    UnknownRequest(LoanId),

    /// Withdrawal would dip into collateral owed to open requests.
    #[error("sweep of {requested} {token} exceeds surplus {available}")]
    InsufficientSurplus {
        /// Token being swept.
        token: Address,
        /// Amount requested.
        requested: u128,
        /// Held balance minus locked aggregate.
        available: u128,
    },

    /// Fixed-point arithmetic failed on the supplied amounts.
    #[error(transparent)]
    Math(#[from] MathError),

    /// Token interface rejected a transfer.
    #[error(transparent)]
    Token(#[from] TokenError),

    // ── Authorization ────────────────────────────────────────────────
    /// Caller is not the configuration authority.
    #[error("{caller} is not the configuration authority")]
    NotAuthority {
        /// The caller.
        caller: Address,
    },

    /// Caller is not the requester of this loan.
    #[error("{caller} is not the requester of {id}")]
    NotRequester {
        /// The loan.
        id: LoanId,
        /// The caller.
        caller: Address,
    },

    /// Caller is not the settlement contract the engine designated.
    #[error("{caller} is not the designated settlement contract for {id}")]
    UnauthorizedCaller {
        /// The loan.
        id: LoanId,
        /// The caller.
        caller: Address,
    },

    // ── State ────────────────────────────────────────────────────────
    /// Request already left `Open`.
    #[error("{id} already resolved as {state}")]
    AlreadyResolved {
        /// The loan.
        id: LoanId,
        /// Its terminal state.
        state: LoanStatus,
    },

    /// The engine still reports the auction as open.
    #[error("auction for {0} is still open")]
    AuctionStillOpen(LoanId),

    /// The engine already closed bidding on this auction, so it can no
    /// longer be withdrawn or settled early.
    #[error("auction for {0} is already closed")]
    AuctionClosed(LoanId),

    /// Entry point called while another entry point is executing on this
    /// thread.
    #[error("reentrant call to {operation} rejected")]
    Reentrant {
        /// The rejected entry point.
        operation: &'static str,
    },

    // ── Consistency ──────────────────────────────────────────────────
    /// The auction engine assigned a different id than it advertised.
    #[error("auction engine assigned {assigned}, expected {predicted}")]
    IdMismatch {
        /// Id read before opening the auction.
        predicted: LoanId,
        /// Id returned by `open_auction`.
        assigned: LoanId,
    },

    /// The auction engine assigned an id that already has a request.
    #[error("auction engine reused id {0}")]
    DuplicateRequest(LoanId),

    /// Unlocking more collateral than the aggregate holds.
    #[error("custody underflow for {token}: unlock {requested}, locked {locked}")]
    CustodyUnderflow {
        /// Collateral token.
        token: Address,
        /// Amount to unlock.
        requested: u128,
        /// Current aggregate.
        locked: u128,
    },

    /// Engine reported a withheld fee larger than the winning premium.
    #[error("engine withheld {withheld} from premium {premium} for {id}")]
    PremiumAccounting {
        /// The loan.
        id: LoanId,
        /// Winning premium.
        premium: u128,
        /// Fee withheld by the engine.
        withheld: u128,
    },

    /// The net premium is not covered by the settlement-token balance held
    /// above that token's locked aggregate.
    #[error("premium for {id} undelivered: expected {expected} {token}, surplus {surplus}")]
    PremiumUndelivered {
        /// The loan.
        id: LoanId,
        /// Settlement token.
        token: Address,
        /// Winning premium minus the engine's withheld fee.
        expected: u128,
        /// Held balance minus locked aggregate.
        surplus: u128,
    },

    /// Auction engine call failed.
    #[error(transparent)]
    Auction(#[from] AuctionError),
}

impl CoordinatorError {
    /// Taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroAddress { .. }
            | Self::ZeroAmount { .. }
            | Self::AssetNotApproved(_)
            | Self::AssetNotFound(_)
            | Self::FeeAboveCap { .. }
            | Self::InvalidSchedule
            | Self::UnknownRequest(_)
            | Self::InsufficientSurplus { .. }
            | Self::Math(_)
            | Self::Token(_) => ErrorKind::Validation,
            Self::NotAuthority { .. } | Self::NotRequester { .. } | Self::UnauthorizedCaller { .. } => {
                ErrorKind::Authorization
            }
            Self::AlreadyResolved { .. }
            | Self::AuctionStillOpen(_)
            | Self::AuctionClosed(_)
            | Self::Reentrant { .. } => ErrorKind::State,
            Self::IdMismatch { .. }
            | Self::DuplicateRequest(_)
            | Self::CustodyUnderflow { .. }
            | Self::PremiumAccounting { .. }
            | Self::PremiumUndelivered { .. }
            | Self::Auction(_) => ErrorKind::Consistency,
        }
    }
}

impl CoordinatorError {
    /// Lift an engine failure on an existing request, reporting a closed
    /// auction as a state error rather than a collaborator fault.
    pub(crate) fn from_auction(err: AuctionError) -> Self {
        match err {
            AuctionError::Closed(id) => Self::AuctionClosed(id),
            other => Self::Auction(other),
        }
    }
}

impl From<LoanError> for CoordinatorError {
    fn from(err: LoanError) -> Self {
        match err {
            LoanError::AlreadyResolved { id, state } => Self::AlreadyResolved { id, state },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let id = LoanId(1);
        let who = Address::from_low_u64(9);
        assert_eq!(CoordinatorError::InvalidSchedule.kind(), ErrorKind::Validation);
        assert_eq!(
            CoordinatorError::NotRequester { id, caller: who }.kind(),
            ErrorKind::Authorization
        );
        assert_eq!(CoordinatorError::AuctionStillOpen(id).kind(), ErrorKind::State);
        assert_eq!(
            CoordinatorError::IdMismatch {
                predicted: id,
                assigned: LoanId(2)
            }
            .kind(),
            ErrorKind::Consistency
        );
    }

    #[test]
    fn loan_error_maps_to_state_kind() {
        let err: CoordinatorError = LoanError::AlreadyResolved {
            id: LoanId(3),
            state: LoanStatus::Cancelled,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(err.to_string(), "loan:3 already resolved as CANCELLED");
    }

    #[test]
    fn closed_auction_is_state_kind() {
        let err = CoordinatorError::from_auction(AuctionError::Closed(LoanId(4)));
        assert_eq!(err, CoordinatorError::AuctionClosed(LoanId(4)));
        assert_eq!(err.kind(), ErrorKind::State);

        let err = CoordinatorError::from_auction(AuctionError::UnknownAuction(LoanId(4)));
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }

    #[test]
    fn undelivered_premium_is_consistency_kind() {
        let err = CoordinatorError::PremiumUndelivered {
            id: LoanId(1),
            token: Address::from_low_u64(3),
            expected: 10,
            surplus: 4,
        };
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }
}
