//! # Stub Auction Engine
//!
//! In-process stand-in for the external request-for-quotation engine. It
//! keeps an auction book, assigns sequential ids, and lets the driver (a
//! test or the CLI simulator) decide how each auction resolves. No bidding
//! logic is modelled.
//!
//! Like [`InMemoryTokenLedger`](crate::token::InMemoryTokenLedger) this is a
//! cloneable handle over shared state.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use ccl_core::{Address, Amount, LoanId};

use crate::auction::{AuctionEngine, AuctionError, AuctionStatus, AuctionTerms, EarlySettlementOffer};
use crate::settlement::{SequentialSettlementFactory, SettlementFactory};
use crate::transactional::{SnapshotStack, Transactional};

#[derive(Debug, Clone)]
struct StubAuction {
    terms: AuctionTerms,
    status: AuctionStatus,
    cancelled: bool,
    offers: Vec<EarlySettlementOffer>,
}

#[derive(Debug, Clone, Default)]
struct Book {
    next_id: u64,
    id_skew: u64,
    auctions: BTreeMap<LoanId, StubAuction>,
}

impl Book {
    fn open_entry(&mut self, id: LoanId) -> Result<&mut StubAuction, AuctionError> {
        let auction = self
            .auctions
            .get_mut(&id)
            .ok_or(AuctionError::UnknownAuction(id))?;
        if auction.cancelled || !auction.status.is_open {
            return Err(AuctionError::Closed(id));
        }
        Ok(auction)
    }
}

struct Inner {
    book: Book,
    undo: SnapshotStack<Book>,
    factory: Box<dyn SettlementFactory>,
}

/// Shared in-process auction engine.
#[derive(Clone)]
pub struct StubAuctionEngine {
    inner: Arc<Mutex<Inner>>,
}

impl StubAuctionEngine {
    /// Engine whose first auction gets `first_id`.
    pub fn new(first_id: u64) -> Self {
        Self::with_factory(first_id, Box::new(SequentialSettlementFactory::default()))
    }

    /// Engine using a custom settlement factory.
    pub fn with_factory(first_id: u64, factory: Box<dyn SettlementFactory>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                book: Book {
                    next_id: first_id,
                    ..Book::default()
                },
                undo: SnapshotStack::new(),
                factory,
            })),
        }
    }

    /// Make `open_auction` assign `skew` ids past the advertised one.
    ///
    /// Simulates an engine whose sequence moved between the coordinator's
    /// read and its open call.
    pub fn skew_next_id(&self, skew: u64) {
        self.inner.lock().book.id_skew = skew;
    }

    /// Conclude bidding with a winner and instantiate its settlement contract.
    pub fn resolve(
        &self,
        id: LoanId,
        winning_premium: Amount,
        fee_withheld: Amount,
    ) -> Result<Address, AuctionError> {
        let mut inner = self.inner.lock();
        let Inner { book, factory, .. } = &mut *inner;
        let auction = book.open_entry(id)?;
        let contract = factory.instantiate(id);
        auction.status = AuctionStatus {
            is_open: false,
            winning_premium,
            fee_withheld,
            settlement_contract: Some(contract),
        };
        Ok(contract)
    }

    /// Conclude bidding on the most recent early-settlement offer.
    pub fn resolve_early(&self, id: LoanId) -> Result<(Address, Amount), AuctionError> {
        let premium = {
            let inner = self.inner.lock();
            let auction = inner
                .book
                .auctions
                .get(&id)
                .ok_or(AuctionError::UnknownAuction(id))?;
            auction
                .offers
                .last()
                .map(|o| o.amount)
                .ok_or_else(|| AuctionError::Rejected(format!("no early offer for {id}")))?
        };
        let contract = self.resolve(id, premium, 0)?;
        Ok((contract, premium))
    }

    /// Terms an auction was opened with.
    pub fn terms(&self, id: LoanId) -> Option<AuctionTerms> {
        self.inner.lock().book.auctions.get(&id).map(|a| a.terms.clone())
    }

    /// Early-settlement offers forwarded for an auction.
    pub fn offers(&self, id: LoanId) -> Vec<EarlySettlementOffer> {
        self.inner
            .lock()
            .book
            .auctions
            .get(&id)
            .map(|a| a.offers.clone())
            .unwrap_or_default()
    }

    /// Whether an auction was withdrawn.
    pub fn is_cancelled(&self, id: LoanId) -> bool {
        self.inner
            .lock()
            .book
            .auctions
            .get(&id)
            .is_some_and(|a| a.cancelled)
    }

    /// Number of auctions ever opened (and committed).
    pub fn auction_count(&self) -> usize {
        self.inner.lock().book.auctions.len()
    }
}

impl std::fmt::Debug for StubAuctionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("StubAuctionEngine")
            .field("next_id", &inner.book.next_id)
            .field("auctions", &inner.book.auctions.len())
            .finish()
    }
}

impl Transactional for StubAuctionEngine {
    fn checkpoint(&mut self) {
        let mut inner = self.inner.lock();
        let Inner { book, undo, .. } = &mut *inner;
        undo.push(book);
    }

    fn commit(&mut self) {
        self.inner.lock().undo.discard();
    }

    fn rollback(&mut self) {
        let mut inner = self.inner.lock();
        let Inner { book, undo, .. } = &mut *inner;
        undo.restore(book);
    }
}

impl AuctionEngine for StubAuctionEngine {
    fn next_auction_id(&self) -> LoanId {
        LoanId(self.inner.lock().book.next_id)
    }

    fn open_auction(&mut self, terms: AuctionTerms) -> Result<LoanId, AuctionError> {
        let mut inner = self.inner.lock();
        let book = &mut inner.book;
        let id = LoanId(book.next_id + book.id_skew);
        book.next_id = id.value() + 1;
        book.auctions.insert(
            id,
            StubAuction {
                terms,
                status: AuctionStatus {
                    is_open: true,
                    winning_premium: 0,
                    fee_withheld: 0,
                    settlement_contract: None,
                },
                cancelled: false,
                offers: Vec::new(),
            },
        );
        Ok(id)
    }

    fn report_status(&self, id: LoanId) -> Result<AuctionStatus, AuctionError> {
        let inner = self.inner.lock();
        let auction = inner
            .book
            .auctions
            .get(&id)
            .ok_or(AuctionError::UnknownAuction(id))?;
        if auction.cancelled {
            return Ok(AuctionStatus {
                is_open: false,
                winning_premium: 0,
                fee_withheld: 0,
                settlement_contract: None,
            });
        }
        Ok(auction.status.clone())
    }

    fn cancel_auction(&mut self, id: LoanId) -> Result<(), AuctionError> {
        let mut inner = self.inner.lock();
        let auction = inner.book.open_entry(id)?;
        auction.cancelled = true;
        auction.status.is_open = false;
        Ok(())
    }

    fn early_settle(&mut self, id: LoanId, offer: &EarlySettlementOffer) -> Result<(), AuctionError> {
        let mut inner = self.inner.lock();
        let auction = inner.book.open_entry(id)?;
        auction.offers.push(offer.clone());
        Ok(())
    }
}
