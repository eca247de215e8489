//! # Settlement Contracts
//!
//! Each resolved auction gets a fresh, single-use settlement contract. The
//! coordinator never inspects it: it is an address that is allowed to call
//! `handle_settlement` once, receives the collateral, and builds the final
//! escrow leg on its own.
//!
//! [`SettlementFactory`] is the capability that mints those addresses.
//! [`SettlementContract`] is a minimal client that performs the handoff call
//! and keeps what it received.

use serde::{Deserialize, Serialize};

use ccl_core::{Address, Amount, LoanId};

use crate::coordinator::Coordinator;
use crate::error::CoordinatorError;

/// Produces a fresh settlement contract address per resolved auction.
pub trait SettlementFactory: Send {
    /// Instantiate the contract for `id`.
    fn instantiate(&mut self, id: LoanId) -> Address;
}

/// Factory handing out consecutive addresses from a base.
#[derive(Debug, Clone)]
pub struct SequentialSettlementFactory {
    next: u64,
}

impl SequentialSettlementFactory {
    /// Start handing out addresses at `base`.
    pub fn starting_at(base: u64) -> Self {
        Self { next: base }
    }
}

impl Default for SequentialSettlementFactory {
    fn default() -> Self {
        Self::starting_at(0x5e77_0000)
    }
}

impl SettlementFactory for SequentialSettlementFactory {
    fn instantiate(&mut self, _id: LoanId) -> Address {
        let address = Address::from_low_u64(self.next);
        self.next += 1;
        address
    }
}

/// What the coordinator hands to the settlement contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementHandoff {
    /// The borrower.
    pub requester: Address,
    /// Winning premium as reported by the engine.
    pub winning_premium: Amount,
    /// Collateral token transferred to the contract.
    pub collateral_token: Address,
    /// Collateral amount transferred to the contract.
    pub collateral_amount: Amount,
}

/// Client side of a settlement contract.
#[derive(Debug, Clone)]
pub struct SettlementContract {
    address: Address,
    loan: LoanId,
    received: Option<SettlementHandoff>,
}

impl SettlementContract {
    /// Bind a contract address to the loan it was created for.
    pub fn new(address: Address, loan: LoanId) -> Self {
        Self {
            address,
            loan,
            received: None,
        }
    }

    /// The contract's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Pull custody from the coordinator.
    pub fn finalize(&mut self, coordinator: &Coordinator) -> Result<&SettlementHandoff, CoordinatorError> {
        let handoff = coordinator.handle_settlement(self.address, self.loan, self.address)?;
        let received: &SettlementHandoff = self.received.insert(handoff);
        Ok(received)
    }

    /// Handoff data, once finalized.
    pub fn received(&self) -> Option<&SettlementHandoff> {
        self.received.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_factory_yields_distinct_addresses() {
        let mut factory = SequentialSettlementFactory::starting_at(10);
        let a = factory.instantiate(LoanId(1));
        let b = factory.instantiate(LoanId(2));
        assert_eq!(a, Address::from_low_u64(10));
        assert_eq!(b, Address::from_low_u64(11));
    }
}
