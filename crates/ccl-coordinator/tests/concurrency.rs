//! # Concurrency Tests
//!
//! Entry points called from many threads are serialized: every request gets
//! a distinct engine id and the custody aggregate matches the open requests
//! once all threads finish.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use ccl_coordinator::Coordinator;
use ccl_core::LoanId;

use common::{addr, Fixture, ONE_ETH};

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn coordinator_is_shareable() {
    assert_send_sync::<Coordinator>();
}

#[test]
fn parallel_requests_get_distinct_ids() {
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 5;

    let f = Fixture::new(0);
    let borrowers: Vec<_> = (0..THREADS).map(|i| addr(0x1000 + i)).collect();
    for b in &borrowers {
        f.fund(*b, u128::from(PER_THREAD) * ONE_ETH);
    }

    let handles: Vec<_> = borrowers
        .iter()
        .map(|&borrower| {
            let coordinator = Arc::clone(&f.coordinator);
            let params = f.params(ONE_ETH);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|_| coordinator.request_loan(borrower, params.clone()).unwrap())
                    .collect::<Vec<LoanId>>()
            })
        })
        .collect();

    let ids: BTreeSet<LoanId> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(ids.len() as u64, THREADS * PER_THREAD);
    assert_eq!(ids.first(), Some(&LoanId(1)));
    assert_eq!(ids.last(), Some(&LoanId(THREADS * PER_THREAD)));

    let total = u128::from(THREADS * PER_THREAD) * ONE_ETH;
    assert_eq!(f.coordinator.locked_collateral(f.weth), total);
    assert_eq!(f.tokens.balance(&f.weth, &f.this()), total);
}

#[test]
fn parallel_cancels_settle_each_request_once() {
    let f = Fixture::new(0);
    let ids: Vec<LoanId> = (0..6)
        .map(|_| f.coordinator.request_loan(f.borrower, f.params(ONE_ETH)).unwrap())
        .collect();

    // Two threads race to cancel every request.
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let coordinator = Arc::clone(&f.coordinator);
            let ids = ids.clone();
            let borrower = f.borrower;
            thread::spawn(move || {
                ids.iter()
                    .filter(|id| coordinator.cancel_loan(borrower, **id).is_ok())
                    .count()
            })
        })
        .collect();
    let succeeded: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(succeeded, ids.len());
    assert_eq!(f.coordinator.locked_collateral(f.weth), 0);
    assert_eq!(f.tokens.balance(&f.weth, &f.borrower), 10 * ONE_ETH);
}
