//! # Settlement Handoff
//!
//! Turns a resolved auction into ledger and custody updates and releases
//! the collateral to the settlement contract the engine designated.
//!
//! ## Ordering
//!
//! All checks, then all local effects (status, custody), then the token
//! movements. The settlement contract is freshly instantiated and untrusted
//! until it has been matched against the engine's record, and anything it
//! does from inside a transfer sees the request already `Settled`.
//!
//! ## Premium
//!
//! The engine reports the winning premium and the part of it it withheld.
//! The remainder must already have been delivered to the coordinator: it
//! has to be covered by the settlement-token balance above that token's
//! locked aggregate, otherwise the handoff fails with `PremiumUndelivered`.
//! The coordinator fee is taken from that remainder; the borrower gets the
//! rest. The fee stays in the coordinator's balance, above the locked
//! aggregate, where `sweep_surplus` can reach it.

use ccl_core::{compute_fee, Address, LoanId};

use crate::coordinator::Tx;
use crate::error::CoordinatorError;
use crate::events::CoordinatorEvent;
use crate::settlement::SettlementHandoff;

impl Tx<'_> {
    pub(crate) fn settle_handoff(
        &mut self,
        caller: Address,
        id: LoanId,
        settlement_contract: Address,
    ) -> Result<SettlementHandoff, CoordinatorError> {
        // Checks.
        let status = self.auction.report_status(id)?;
        if status.settlement_contract != Some(caller) || settlement_contract != caller {
            return Err(CoordinatorError::UnauthorizedCaller { id, caller });
        }
        if status.is_open {
            return Err(CoordinatorError::AuctionStillOpen(id));
        }
        let fee_bps = self.state.fee_bps;
        let request = self
            .state
            .loans
            .get(id)
            .ok_or(CoordinatorError::UnknownRequest(id))?;
        request.ensure_open()?;
        let settlement_token = request.terms.settlement_token;

        let available = status
            .winning_premium
            .checked_sub(status.fee_withheld)
            .ok_or(CoordinatorError::PremiumAccounting {
                id,
                premium: status.winning_premium,
                withheld: status.fee_withheld,
            })?;
        // The premium must already sit above the locked aggregate, or paying
        // it out would spend collateral owed to other open requests.
        let held = self.tokens.balance_of(&settlement_token, &self.this);
        let surplus = self.state.custody.sweepable(&settlement_token, held);
        if surplus < available {
            return Err(CoordinatorError::PremiumUndelivered {
                id,
                token: settlement_token,
                expected: available,
                surplus,
            });
        }
        let split = compute_fee(available, fee_bps);

        // Effects.
        let request = self
            .state
            .loans
            .get_mut(id)
            .ok_or(CoordinatorError::UnknownRequest(id))?;
        request.settle(caller, self.now)?;
        let requester = request.requester;
        let collateral_token = request.terms.collateral_token;
        let collateral_amount = request.terms.collateral_amount;
        self.state.custody.unlock(collateral_token, collateral_amount)?;

        // Interactions.
        if split.net > 0 {
            self.tokens
                .transfer(&settlement_token, &self.this, &requester, split.net)?;
        }
        if split.fee > 0 {
            self.emit(CoordinatorEvent::FeeCollected {
                id,
                token: settlement_token,
                amount: split.fee,
            });
        }
        self.tokens
            .transfer(&collateral_token, &self.this, &caller, collateral_amount)?;

        self.emit(CoordinatorEvent::LoanSettled {
            id,
            settlement_contract: caller,
            winning_premium: status.winning_premium,
            net_premium: split.net,
        });
        Ok(SettlementHandoff {
            requester,
            winning_premium: status.winning_premium,
            collateral_token,
            collateral_amount,
        })
    }
}
