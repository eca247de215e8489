//! Shared fixture: a coordinator wired to the stub engine and an in-memory
//! token ledger with an ETH-like collateral and a USDC-like settlement token.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};

use ccl_coordinator::{
    Coordinator, CoordinatorConfig, InMemoryTokenLedger, LoanParams, StubAuctionEngine,
};
use ccl_core::{Address, Amount, AssetConfigId, FeeBps, PRICE_SCALE};

pub const ONE_ETH: Amount = 1_000_000_000_000_000_000;
pub const STRIKE_2000: Amount = 2_000 * PRICE_SCALE;
pub const USDC: Amount = 1_000_000;

pub fn addr(n: u64) -> Address {
    Address::from_low_u64(n)
}

pub struct Fixture {
    pub coordinator: Arc<Coordinator>,
    pub engine: StubAuctionEngine,
    pub tokens: InMemoryTokenLedger,
    pub authority: Address,
    pub borrower: Address,
    pub weth: Address,
    pub feed: Address,
    pub usdc: Address,
    pub config: AssetConfigId,
}

impl Fixture {
    /// Coordinator at `fee_bps`, one approved triple, a borrower holding
    /// 10 ETH with the coordinator approved for all of it.
    pub fn new(fee_bps: u16) -> Self {
        let tokens = InMemoryTokenLedger::new();
        let engine = StubAuctionEngine::new(1);
        Self::with_collaborators(
            fee_bps,
            engine.clone(),
            tokens.clone(),
            Box::new(engine),
            Box::new(tokens),
        )
    }

    /// Same fixture over caller-supplied trait objects that share books
    /// with `engine` and `tokens`.
    pub fn with_collaborators(
        fee_bps: u16,
        engine: StubAuctionEngine,
        tokens: InMemoryTokenLedger,
        auction: Box<dyn ccl_coordinator::AuctionEngine>,
        ledger: Box<dyn ccl_coordinator::TokenLedger>,
    ) -> Self {
        let authority = addr(0xA0);
        let borrower = addr(0xB0);
        let weth = addr(0x1);
        let feed = addr(0x2);
        let usdc = addr(0x3);

        tokens.register(weth, 18);
        tokens.register(usdc, 6);

        let coordinator = Coordinator::new(
            CoordinatorConfig {
                address: addr(0xC0),
                authority,
                fee_bps: FeeBps::new(fee_bps).expect("fee within cap"),
            },
            auction,
            ledger,
        )
        .expect("valid config");
        let config = coordinator
            .configure_asset(authority, weth, feed, usdc)
            .expect("configure");

        tokens.mint(&weth, &borrower, 10 * ONE_ETH).unwrap();
        tokens
            .approve(&weth, &borrower, &coordinator.address(), 10 * ONE_ETH)
            .unwrap();

        Self {
            coordinator: Arc::new(coordinator),
            engine,
            tokens,
            authority,
            borrower,
            weth,
            feed,
            usdc,
            config,
        }
    }

    pub fn this(&self) -> Address {
        self.coordinator.address()
    }

    /// Loan of `collateral` WETH at strike 2000, bidding for an hour.
    pub fn params(&self, collateral: Amount) -> LoanParams {
        let now = Utc::now();
        LoanParams {
            collateral_token: self.weth,
            price_feed: self.feed,
            settlement_token: self.usdc,
            collateral_amount: collateral,
            strike: STRIKE_2000,
            expiry: now + Duration::days(30),
            auction_deadline: now + Duration::hours(1),
            min_acceptable_notional: 0,
            convert_to_limit_order: false,
            requester_contact_key: "borrower-key".to_string(),
        }
    }

    /// Give `who` WETH and approve the coordinator for it.
    pub fn fund(&self, who: Address, amount: Amount) {
        self.tokens.mint(&self.weth, &who, amount).unwrap();
        let current = self.tokens.allowance(&self.weth, &who, &self.this());
        self.tokens
            .approve(&self.weth, &who, &self.this(), current + amount)
            .unwrap();
    }

    /// Deliver the net-of-engine premium to the coordinator, as the engine
    /// would before the settlement contract calls in.
    pub fn deliver_premium(&self, amount: Amount) {
        self.tokens.mint(&self.usdc, &self.this(), amount).unwrap();
    }
}
