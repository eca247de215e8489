//! # Collateral Custody Ledger
//!
//! Running total of collateral locked against open requests, per token.
//!
//! ## Invariant
//!
//! For every token, the coordinator's held balance is at least the locked
//! aggregate, and the aggregate equals the sum of `collateral_amount` over
//! open requests for that token. Discretionary withdrawals are bounded by
//! [`CustodyLedger::sweepable`] so they can never dip into collateral owed
//! to an open request.

use std::collections::BTreeMap;

use ccl_core::{Address, Amount};

use crate::error::CoordinatorError;

/// Locked-collateral aggregates keyed by token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustodyLedger {
    locked: BTreeMap<Address, Amount>,
}

impl CustodyLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate locked for `token`.
    pub fn locked(&self, token: &Address) -> Amount {
        self.locked.get(token).copied().unwrap_or(0)
    }

    /// Increase the aggregate for `token`.
    pub fn lock(&mut self, token: Address, amount: Amount) -> Result<(), CoordinatorError> {
        let next = self
            .locked(&token)
            .checked_add(amount)
            .ok_or(ccl_core::MathError::Overflow { op: "custody_lock" })?;
        self.locked.insert(token, next);
        Ok(())
    }

    /// Decrease the aggregate for `token`.
    ///
    /// Unlocking more than is locked means the request ledger and the
    /// custody ledger disagree; that is a consistency failure.
    pub fn unlock(&mut self, token: Address, amount: Amount) -> Result<(), CoordinatorError> {
        let locked = self.locked(&token);
        if amount > locked {
            return Err(CoordinatorError::CustodyUnderflow {
                token,
                requested: amount,
                locked,
            });
        }
        let next = locked - amount;
        if next == 0 {
            self.locked.remove(&token);
        } else {
            self.locked.insert(token, next);
        }
        Ok(())
    }

    /// Balance above what open requests are owed.
    pub fn sweepable(&self, token: &Address, held: Amount) -> Amount {
        held.saturating_sub(self.locked(token))
    }

    /// Check that withdrawing `amount` keeps `held - amount >= locked`.
    pub fn authorize_withdrawal(
        &self,
        token: &Address,
        held: Amount,
        amount: Amount,
    ) -> Result<(), CoordinatorError> {
        let available = self.sweepable(token, held);
        if amount > available {
            return Err(CoordinatorError::InsufficientSurplus {
                token: *token,
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    /// Tokens with a non-zero aggregate.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.locked.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> Address {
        Address::from_low_u64(1)
    }

    #[test]
    fn lock_and_unlock() {
        let mut c = CustodyLedger::new();
        c.lock(token(), 100).unwrap();
        c.lock(token(), 50).unwrap();
        assert_eq!(c.locked(&token()), 150);
        c.unlock(token(), 150).unwrap();
        assert_eq!(c.locked(&token()), 0);
        assert_eq!(c.iter().count(), 0);
    }

    #[test]
    fn unlock_underflow_fails_unchanged() {
        let mut c = CustodyLedger::new();
        c.lock(token(), 10).unwrap();
        let err = c.unlock(token(), 11).unwrap_err();
        assert_eq!(
            err,
            CoordinatorError::CustodyUnderflow {
                token: token(),
                requested: 11,
                locked: 10
            }
        );
        assert_eq!(c.locked(&token()), 10);
    }

    #[test]
    fn sweepable_is_held_minus_locked() {
        let mut c = CustodyLedger::new();
        c.lock(token(), 70).unwrap();
        assert_eq!(c.sweepable(&token(), 100), 30);
        assert_eq!(c.sweepable(&token(), 50), 0);
    }

    #[test]
    fn withdrawal_bounded_by_surplus() {
        let mut c = CustodyLedger::new();
        c.lock(token(), 70).unwrap();
        c.authorize_withdrawal(&token(), 100, 30).unwrap();
        let err = c.authorize_withdrawal(&token(), 100, 31).unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::InsufficientSurplus { available: 30, .. }
        ));
    }

    #[test]
    fn lock_overflow_reported() {
        let mut c = CustodyLedger::new();
        c.lock(token(), Amount::MAX).unwrap();
        assert!(matches!(c.lock(token(), 1), Err(CoordinatorError::Math(_))));
    }
}
