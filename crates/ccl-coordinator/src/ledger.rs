//! # Loan Request Ledger
//!
//! Per-request records keyed by the id the auction engine assigns, and the
//! borrower-facing operations that create and withdraw them.
//!
//! Every record is created `Open` together with its collateral lock and
//! leaves `Open` exactly once. Records are never removed, so a terminal
//! request keeps answering `AlreadyResolved`.

use std::collections::BTreeMap;

use ccl_core::{contract_count, notional, Address, Amount, AssetConfigId, LoanId};
use ccl_state::{LoanRequest, LoanTerms};

use crate::auction::{AuctionTerms, EarlySettlementOffer};
use crate::coordinator::{LoanParams, Tx};
use crate::error::CoordinatorError;
use crate::events::CoordinatorEvent;

/// All loan requests ever created, in id order.
#[derive(Debug, Clone, Default)]
pub struct LoanLedger {
    requests: BTreeMap<LoanId, LoanRequest>,
}

impl LoanLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests, open or resolved.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether no request was ever created.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// A request by id.
    pub fn get(&self, id: LoanId) -> Option<&LoanRequest> {
        self.requests.get(&id)
    }

    /// Record a new request. Ids are never reused.
    pub fn insert(&mut self, request: LoanRequest) -> Result<(), CoordinatorError> {
        if self.requests.contains_key(&request.id) {
            return Err(CoordinatorError::DuplicateRequest(request.id));
        }
        self.requests.insert(request.id, request);
        Ok(())
    }

    /// The request `id`, provided `caller` made it and it is still open.
    ///
    /// Checks run in order: existence, ownership, status.
    pub fn open_for_requester(
        &mut self,
        id: LoanId,
        caller: Address,
    ) -> Result<&mut LoanRequest, CoordinatorError> {
        let request = self
            .requests
            .get_mut(&id)
            .ok_or(CoordinatorError::UnknownRequest(id))?;
        if request.requester != caller {
            return Err(CoordinatorError::NotRequester { id, caller });
        }
        request.ensure_open()?;
        Ok(request)
    }

    /// Mutable access for the settlement path.
    pub(crate) fn get_mut(&mut self, id: LoanId) -> Option<&mut LoanRequest> {
        self.requests.get_mut(&id)
    }

    /// Requests still open.
    pub fn open(&self) -> impl Iterator<Item = &LoanRequest> {
        self.requests.values().filter(|r| r.is_open())
    }

    /// Requests made by `requester`.
    pub fn by_requester(&self, requester: Address) -> impl Iterator<Item = &LoanRequest> {
        self.requests.values().filter(move |r| r.requester == requester)
    }

    /// Collateral of open requests for `token`; what custody should hold.
    pub fn locked_sum(&self, token: &Address) -> Amount {
        self.open()
            .filter(|r| r.terms.collateral_token == *token)
            .map(|r| r.terms.collateral_amount)
            .sum()
    }

    /// All requests.
    pub fn iter(&self) -> impl Iterator<Item = &LoanRequest> {
        self.requests.values()
    }
}

// ─── Borrower Operations ─────────────────────────────────────────────

impl Tx<'_> {
    /// Validate, record, lock, pull collateral, then open the auction.
    pub(crate) fn create_request(
        &mut self,
        requester: Address,
        params: LoanParams,
    ) -> Result<LoanId, CoordinatorError> {
        if requester.is_zero() {
            return Err(CoordinatorError::ZeroAddress { field: "requester" });
        }
        if params.collateral_amount == 0 {
            return Err(CoordinatorError::ZeroAmount {
                field: "collateral_amount",
            });
        }
        if params.strike == 0 {
            return Err(CoordinatorError::ZeroAmount { field: "strike" });
        }
        if params.auction_deadline >= params.expiry {
            return Err(CoordinatorError::InvalidSchedule);
        }
        let config = AssetConfigId::derive(
            &params.collateral_token,
            &params.price_feed,
            &params.settlement_token,
        );
        if !self.state.registry.is_approved(&config) {
            return Err(CoordinatorError::AssetNotApproved(config));
        }

        let collateral_decimals = self.tokens.decimals(&params.collateral_token)?;
        let settlement_decimals = self.tokens.decimals(&params.settlement_token)?;
        let notional = notional(
            params.collateral_amount,
            params.strike,
            collateral_decimals,
            settlement_decimals,
        )?;
        if notional == 0 {
            return Err(CoordinatorError::ZeroAmount { field: "notional" });
        }
        let contract_count = contract_count(notional, params.strike)?;

        let predicted = self.auction.next_auction_id();
        let terms = LoanTerms {
            collateral_token: params.collateral_token,
            price_feed: params.price_feed,
            settlement_token: params.settlement_token,
            collateral_amount: params.collateral_amount,
            strike: params.strike,
            notional,
            contract_count,
            expiry: params.expiry,
            auction_deadline: params.auction_deadline,
        };
        self.state
            .loans
            .insert(LoanRequest::open(predicted, requester, terms, self.now))?;
        self.state
            .custody
            .lock(params.collateral_token, params.collateral_amount)?;

        self.tokens.transfer_from(
            &params.collateral_token,
            &self.this,
            &requester,
            &self.this,
            params.collateral_amount,
        )?;
        let assigned = self.auction.open_auction(AuctionTerms {
            requester,
            collateral_token: params.collateral_token,
            price_feed: params.price_feed,
            settlement_token: params.settlement_token,
            collateral_amount: params.collateral_amount,
            strike: params.strike,
            notional,
            contract_count,
            expiry: params.expiry,
            deadline: params.auction_deadline,
            min_acceptable_notional: params.min_acceptable_notional,
            convert_to_limit_order: params.convert_to_limit_order,
            requester_contact_key: params.requester_contact_key,
        })?;
        if assigned != predicted {
            return Err(CoordinatorError::IdMismatch { predicted, assigned });
        }

        self.emit(CoordinatorEvent::LoanRequested {
            id: predicted,
            requester,
            collateral_token: params.collateral_token,
            collateral_amount: params.collateral_amount,
            notional,
            contract_count,
        });
        Ok(predicted)
    }

    /// OPEN → CANCELLED, withdraw the auction, return the collateral.
    pub(crate) fn cancel_request(&mut self, caller: Address, id: LoanId) -> Result<(), CoordinatorError> {
        let now = self.now;
        let request = self.state.loans.open_for_requester(id, caller)?;
        request.cancel(now)?;
        let token = request.terms.collateral_token;
        let amount = request.terms.collateral_amount;
        self.state.custody.unlock(token, amount)?;

        self.auction
            .cancel_auction(id)
            .map_err(CoordinatorError::from_auction)?;
        self.tokens.transfer(&token, &self.this, &caller, amount)?;

        self.emit(CoordinatorEvent::LoanCancelled {
            id,
            requester: caller,
            collateral_amount: amount,
        });
        Ok(())
    }

    /// Pass a take-it-now instruction through; local state is untouched.
    pub(crate) fn forward_early_settlement(
        &mut self,
        caller: Address,
        id: LoanId,
        offer: EarlySettlementOffer,
    ) -> Result<(), CoordinatorError> {
        self.state.loans.open_for_requester(id, caller)?;
        if offer.counterparty.is_zero() {
            return Err(CoordinatorError::ZeroAddress { field: "counterparty" });
        }
        if offer.amount == 0 {
            return Err(CoordinatorError::ZeroAmount { field: "amount" });
        }
        self.auction
            .early_settle(id, &offer)
            .map_err(CoordinatorError::from_auction)?;
        self.emit(CoordinatorEvent::EarlySettlementRequested {
            id,
            amount: offer.amount,
            nonce: offer.nonce,
            counterparty: offer.counterparty,
        });
        Ok(())
    }
}
