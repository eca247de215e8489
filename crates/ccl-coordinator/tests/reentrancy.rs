//! # Reentrancy Tests
//!
//! A token ledger that calls back into the coordinator from inside every
//! transfer, the way a malicious token or a freshly created settlement
//! contract could. Every nested call must be rejected with `Reentrant`,
//! views must keep showing the last committed state, and the outer call
//! must complete exactly once.

mod common;

use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;

use ccl_coordinator::{
    Coordinator, CoordinatorError, InMemoryTokenLedger, StubAuctionEngine, TokenError, TokenLedger,
    Transactional,
};
use ccl_core::{Address, Amount, LoanId};
use ccl_state::LoanStatus;

use common::{Fixture, ONE_ETH, USDC};

/// What a nested call observed.
#[derive(Debug, Clone)]
struct Observation {
    results: Vec<Result<(), CoordinatorError>>,
    status_seen: Option<LoanStatus>,
    locked_seen: Amount,
}

#[derive(Clone, Default)]
struct Hostile {
    coordinator: Arc<OnceLock<Weak<Coordinator>>>,
    target: Arc<Mutex<Option<LoanId>>>,
    observations: Arc<Mutex<Vec<Observation>>>,
}

impl Hostile {
    fn attack(&self, to: Address) {
        let Some(coordinator) = self.coordinator.get().and_then(Weak::upgrade) else {
            return;
        };
        let Some(id) = *self.target.lock() else {
            return;
        };
        let weth = Address::from_low_u64(0x1);
        let results = vec![
            coordinator.handle_settlement(to, id, to).map(|_| ()),
            coordinator.cancel_loan(to, id),
            coordinator.set_fee(to, 0),
            coordinator.sweepable(weth).map(|_| ()),
            coordinator.drain_events().map(|_| ()),
        ];
        let request = coordinator.request(id);
        self.observations.lock().push(Observation {
            results,
            status_seen: request.map(|r| r.status),
            locked_seen: coordinator.locked_collateral(weth),
        });
    }
}

/// Delegates to an in-memory ledger, then calls back into the coordinator.
struct HostileLedger {
    inner: InMemoryTokenLedger,
    hostile: Hostile,
}

impl Transactional for HostileLedger {
    fn checkpoint(&mut self) {
        self.inner.checkpoint();
    }
    fn commit(&mut self) {
        self.inner.commit();
    }
    fn rollback(&mut self) {
        self.inner.rollback();
    }
}

impl TokenLedger for HostileLedger {
    fn decimals(&self, token: &Address) -> Result<u8, TokenError> {
        self.inner.decimals(token)
    }

    fn balance_of(&self, token: &Address, holder: &Address) -> Amount {
        self.inner.balance_of(token, holder)
    }

    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.inner.transfer(token, from, to, amount)?;
        self.hostile.attack(*to);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.inner.transfer_from(token, spender, owner, to, amount)?;
        self.hostile.attack(*to);
        Ok(())
    }
}

fn hostile_fixture() -> (Fixture, Hostile) {
    let engine = StubAuctionEngine::new(1);
    let tokens = InMemoryTokenLedger::new();
    let hostile = Hostile::default();
    let f = Fixture::with_collaborators(
        0,
        engine.clone(),
        tokens.clone(),
        Box::new(engine),
        Box::new(HostileLedger {
            inner: tokens,
            hostile: hostile.clone(),
        }),
    );
    let _ = hostile.coordinator.set(Arc::downgrade(&f.coordinator));
    (f, hostile)
}

fn assert_all_reentrant(observation: &Observation) {
    assert_eq!(observation.results.len(), 5);
    for result in &observation.results {
        assert!(
            matches!(result, Err(CoordinatorError::Reentrant { .. })),
            "nested call not rejected: {result:?}"
        );
    }
}

#[test]
fn settlement_contract_cannot_reenter_during_handoff() {
    let (f, hostile) = hostile_fixture();
    let id = f.coordinator.request_loan(f.borrower, f.params(ONE_ETH)).unwrap();
    let contract_addr = f.engine.resolve(id, 100 * USDC, 0).unwrap();
    f.deliver_premium(100 * USDC);
    *hostile.target.lock() = Some(id);

    f.coordinator
        .handle_settlement(contract_addr, id, contract_addr)
        .unwrap();

    let observations = hostile.observations.lock().clone();
    // Premium to the borrower, then collateral to the contract.
    assert_eq!(observations.len(), 2);
    for observation in &observations {
        assert_all_reentrant(observation);
        assert_eq!(observation.status_seen, Some(LoanStatus::Open));
        assert_eq!(observation.locked_seen, ONE_ETH);
    }

    assert_eq!(f.coordinator.request(id).unwrap().status, LoanStatus::Settled);
    assert_eq!(f.tokens.balance(&f.weth, &contract_addr), ONE_ETH);
    assert_eq!(f.tokens.balance(&f.weth, &f.this()), 0);
    assert_eq!(f.coordinator.locked_collateral(f.weth), 0);
}

#[test]
fn requester_cannot_reenter_during_cancel() {
    let (f, hostile) = hostile_fixture();
    let id = f.coordinator.request_loan(f.borrower, f.params(ONE_ETH)).unwrap();
    *hostile.target.lock() = Some(id);

    f.coordinator.cancel_loan(f.borrower, id).unwrap();

    let observations = hostile.observations.lock().clone();
    assert_eq!(observations.len(), 1);
    assert_all_reentrant(&observations[0]);
    assert_eq!(f.tokens.balance(&f.weth, &f.borrower), 10 * ONE_ETH);
    assert_eq!(f.coordinator.request(id).unwrap().status, LoanStatus::Cancelled);
}

#[test]
fn collateral_pull_cannot_reenter() {
    let (f, hostile) = hostile_fixture();
    *hostile.target.lock() = Some(LoanId(1));

    let id = f.coordinator.request_loan(f.borrower, f.params(ONE_ETH)).unwrap();

    let observations = hostile.observations.lock().clone();
    assert_eq!(observations.len(), 1);
    assert_all_reentrant(&observations[0]);
    // The request was not yet committed when the callback ran.
    assert_eq!(observations[0].status_seen, None);
    assert_eq!(observations[0].locked_seen, 0);
    assert_eq!(f.coordinator.request(id).unwrap().status, LoanStatus::Open);
}

#[test]
fn guard_is_released_after_a_failed_operation() {
    let (f, _hostile) = hostile_fixture();
    assert!(f.coordinator.cancel_loan(f.borrower, LoanId(9)).is_err());
    f.coordinator.request_loan(f.borrower, f.params(ONE_ETH)).unwrap();
    assert!(f.coordinator.sweepable(f.weth).is_ok());
}
