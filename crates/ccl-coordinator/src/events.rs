//! # Coordinator Events
//!
//! Notifications for off-chain observers. An event is appended to the log
//! only when the entry point that produced it commits; aborted operations
//! leave no trace.

use serde::{Deserialize, Serialize};

use ccl_core::{Address, Amount, AssetConfigId, FeeBps, LoanId};

/// A committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CoordinatorEvent {
    /// A triple was activated.
    AssetConfigured {
        /// Config key.
        config: AssetConfigId,
        /// Collateral token.
        collateral_token: Address,
        /// Price feed.
        price_feed: Address,
        /// Settlement token.
        settlement_token: Address,
    },
    /// A triple was deactivated.
    AssetDeconfigured {
        /// Config key.
        config: AssetConfigId,
    },
    /// A loan request was opened and its collateral locked.
    LoanRequested {
        /// Loan id.
        id: LoanId,
        /// Borrower.
        requester: Address,
        /// Collateral token.
        collateral_token: Address,
        /// Collateral locked.
        collateral_amount: Amount,
        /// Notional put up for auction.
        notional: Amount,
        /// Contracts backing the notional.
        contract_count: Amount,
    },
    /// A loan request was withdrawn and its collateral returned.
    LoanCancelled {
        /// Loan id.
        id: LoanId,
        /// Borrower.
        requester: Address,
        /// Collateral returned.
        collateral_amount: Amount,
    },
    /// A take-it-now instruction was forwarded to the engine.
    EarlySettlementRequested {
        /// Loan id.
        id: LoanId,
        /// Accepted premium.
        amount: Amount,
        /// Offer nonce.
        nonce: u64,
        /// Accepted lender.
        counterparty: Address,
    },
    /// Custody was handed to the settlement contract.
    LoanSettled {
        /// Loan id.
        id: LoanId,
        /// Settlement contract.
        settlement_contract: Address,
        /// Winning premium.
        winning_premium: Amount,
        /// Premium paid to the borrower.
        net_premium: Amount,
    },
    /// The coordinator retained a fee.
    FeeCollected {
        /// Loan id.
        id: LoanId,
        /// Settlement token.
        token: Address,
        /// Fee amount.
        amount: Amount,
    },
    /// The fee rate changed.
    FeeUpdated {
        /// Previous rate.
        old: FeeBps,
        /// New rate.
        new: FeeBps,
    },
    /// Surplus above locked collateral was withdrawn.
    SurplusSwept {
        /// Token.
        token: Address,
        /// Amount withdrawn.
        amount: Amount,
        /// Recipient.
        to: Address,
    },
    /// The configuration authority changed.
    AuthorityTransferred {
        /// Previous authority.
        previous: Address,
        /// New authority.
        new: Address,
    },
}

impl CoordinatorEvent {
    /// Short name used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AssetConfigured { .. } => "asset_configured",
            Self::AssetDeconfigured { .. } => "asset_deconfigured",
            Self::LoanRequested { .. } => "loan_requested",
            Self::LoanCancelled { .. } => "loan_cancelled",
            Self::EarlySettlementRequested { .. } => "early_settlement_requested",
            Self::LoanSettled { .. } => "loan_settled",
            Self::FeeCollected { .. } => "fee_collected",
            Self::FeeUpdated { .. } => "fee_updated",
            Self::SurplusSwept { .. } => "surplus_swept",
            Self::AuthorityTransferred { .. } => "authority_transferred",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_tag() {
        let event = CoordinatorEvent::FeeCollected {
            id: LoanId(4),
            token: Address::from_low_u64(1),
            amount: 25,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "fee_collected");
        assert_eq!(json["id"], 4);
        assert_eq!(event.name(), "fee_collected");
    }
}
