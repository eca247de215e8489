//! # Coordinator
//!
//! Entry points, serialization, and all-or-nothing execution.
//!
//! ## Execution Model
//!
//! Every state-mutating entry point runs through [`Coordinator::execute`]:
//!
//! 1. Acquire the gate, a `parking_lot::ReentrantMutex`. Calls from other
//!    threads block here, so entry points never interleave.
//! 2. If the gate is already held *by this thread* (a collaborator called
//!    back into the coordinator), reject with `Reentrant` before touching
//!    anything.
//! 3. Stage: clone the committed state and open a checkpoint on each
//!    collaborator.
//! 4. Run the operation against the staged copy.
//! 5. On `Ok`, publish the staged state and commit the collaborators. On
//!    `Err`, roll the collaborators back and drop the staged state.
//!
//! Views read the last committed state through an `RwLock` and never see a
//! half-applied operation.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use parking_lot::{ReentrantMutex, RwLock};
use serde::{Deserialize, Serialize};

use ccl_core::{Address, Amount, AssetConfigId, FeeBps, LoanId, MAX_FEE_BPS};
use ccl_state::LoanRequest;

use crate::auction::{AuctionEngine, EarlySettlementOffer};
use crate::config::CoordinatorConfig;
use crate::custody::CustodyLedger;
use crate::error::CoordinatorError;
use crate::events::CoordinatorEvent;
use crate::ledger::LoanLedger;
use crate::registry::{AssetConfig, AssetRegistry};
use crate::settlement::SettlementHandoff;
use crate::token::TokenLedger;

// ─── Parameters ──────────────────────────────────────────────────────

/// Borrower-supplied parameters of `request_loan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanParams {
    /// Token deposited as collateral.
    pub collateral_token: Address,
    /// Oracle feed for the option.
    pub price_feed: Address,
    /// Token premium and strike are paid in.
    pub settlement_token: Address,
    /// Collateral to lock.
    pub collateral_amount: Amount,
    /// Strike at `PRICE_SCALE`.
    pub strike: Amount,
    /// Option expiry.
    pub expiry: DateTime<Utc>,
    /// End of bidding; must precede `expiry`.
    pub auction_deadline: DateTime<Utc>,
    /// Lowest bid the borrower accepts.
    pub min_acceptable_notional: Amount,
    /// Let the engine rest the request as a limit order if unfilled.
    pub convert_to_limit_order: bool,
    /// Opaque key lenders use to reach the borrower.
    pub requester_contact_key: String,
}

// ─── State ───────────────────────────────────────────────────────────

/// Everything the coordinator owns. Cloned to stage each operation.
#[derive(Debug, Clone)]
pub(crate) struct CoordinatorState {
    pub(crate) authority: Address,
    pub(crate) fee_bps: FeeBps,
    pub(crate) registry: AssetRegistry,
    pub(crate) custody: CustodyLedger,
    pub(crate) loans: LoanLedger,
}

/// What views observe: the last committed state and the event log.
struct Committed {
    state: CoordinatorState,
    events: Vec<CoordinatorEvent>,
}

/// One staged operation: the working copy plus the collaborators.
pub(crate) struct Tx<'a> {
    pub(crate) state: &'a mut CoordinatorState,
    pub(crate) auction: &'a mut dyn AuctionEngine,
    pub(crate) tokens: &'a mut dyn TokenLedger,
    /// The coordinator's own custody address.
    pub(crate) this: Address,
    pub(crate) now: DateTime<Utc>,
    /// Events published if the operation commits.
    pub(crate) events: Vec<CoordinatorEvent>,
}

impl Tx<'_> {
    pub(crate) fn emit(&mut self, event: CoordinatorEvent) {
        self.events.push(event);
    }

    pub(crate) fn require_authority(&self, caller: Address) -> Result<(), CoordinatorError> {
        if caller != self.state.authority {
            return Err(CoordinatorError::NotAuthority { caller });
        }
        Ok(())
    }
}

struct Collaborators {
    auction: Box<dyn AuctionEngine>,
    tokens: Box<dyn TokenLedger>,
}

struct Gate {
    entered: Cell<bool>,
    collaborators: RefCell<Collaborators>,
}

/// Clears the entered flag however the operation exits.
struct EnteredGuard<'a>(&'a Cell<bool>);

impl Drop for EnteredGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

// ─── Coordinator ─────────────────────────────────────────────────────

/// Loan request coordinator.
///
/// `Send + Sync`; share it behind an `Arc`.
pub struct Coordinator {
    address: Address,
    gate: ReentrantMutex<Gate>,
    committed: RwLock<Committed>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let committed = self.committed.read();
        f.debug_struct("Coordinator")
            .field("address", &self.address)
            .field("authority", &committed.state.authority)
            .field("fee_bps", &committed.state.fee_bps)
            .field("requests", &committed.state.loans.len())
            .field("events", &committed.events.len())
            .finish()
    }
}

impl Coordinator {
    /// Build a coordinator with empty registry, custody, and request ledgers.
    pub fn new(
        config: CoordinatorConfig,
        auction: Box<dyn AuctionEngine>,
        tokens: Box<dyn TokenLedger>,
    ) -> Result<Self, CoordinatorError> {
        if config.address.is_zero() {
            return Err(CoordinatorError::ZeroAddress { field: "address" });
        }
        if config.authority.is_zero() {
            return Err(CoordinatorError::ZeroAddress { field: "authority" });
        }
        tracing::info!(
            address = %config.address,
            authority = %config.authority,
            fee_bps = config.fee_bps.get(),
            "coordinator initialized"
        );
        Ok(Self {
            address: config.address,
            gate: ReentrantMutex::new(Gate {
                entered: Cell::new(false),
                collaborators: RefCell::new(Collaborators { auction, tokens }),
            }),
            committed: RwLock::new(Committed {
                state: CoordinatorState {
                    authority: config.authority,
                    fee_bps: config.fee_bps,
                    registry: AssetRegistry::new(),
                    custody: CustodyLedger::new(),
                    loans: LoanLedger::new(),
                },
                events: Vec::new(),
            }),
        })
    }

    /// Run `op` serialized, guarded against re-entry, and all-or-nothing.
    fn execute<R>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&mut Tx<'_>) -> Result<R, CoordinatorError>,
    ) -> Result<R, CoordinatorError> {
        let gate = self.gate.lock();
        if gate.entered.replace(true) {
            tracing::warn!(operation, "reentrant call rejected");
            return Err(CoordinatorError::Reentrant { operation });
        }
        let _entered = EnteredGuard(&gate.entered);

        let mut collaborators = gate.collaborators.borrow_mut();
        let Collaborators { auction, tokens } = &mut *collaborators;

        let mut staged = self.committed.read().state.clone();
        auction.checkpoint();
        tokens.checkpoint();

        let mut tx = Tx {
            state: &mut staged,
            auction: auction.as_mut(),
            tokens: tokens.as_mut(),
            this: self.address,
            now: Utc::now(),
            events: Vec::new(),
        };
        let result = op(&mut tx);
        let published = tx.events;

        match result {
            Ok(value) => {
                auction.commit();
                tokens.commit();
                let locked = {
                    let mut committed = self.committed.write();
                    let touched: BTreeSet<Address> = committed
                        .state
                        .custody
                        .iter()
                        .chain(staged.custody.iter())
                        .map(|(token, _)| *token)
                        .collect();
                    let locked: Vec<(Address, Amount)> = touched
                        .into_iter()
                        .map(|token| {
                            let amount = staged.custody.locked(&token);
                            debug_assert_eq!(
                                amount,
                                staged.loans.locked_sum(&token),
                                "custody aggregate for {token} diverged from open requests"
                            );
                            (token, amount)
                        })
                        .collect();
                    committed.state = staged;
                    committed.events.extend(published.iter().cloned());
                    locked
                };
                record_committed(operation, &published, &locked);
                Ok(value)
            }
            Err(err) => {
                auction.rollback();
                tokens.rollback();
                log_rejection(operation, &err);
                Err(err)
            }
        }
    }

    // ── Configuration authority ──────────────────────────────────────

    /// Approve a (collateral, feed, settlement) triple. Authority only.
    pub fn configure_asset(
        &self,
        caller: Address,
        collateral_token: Address,
        price_feed: Address,
        settlement_token: Address,
    ) -> Result<AssetConfigId, CoordinatorError> {
        self.execute("configure_asset", |tx| {
            tx.require_authority(caller)?;
            let config = tx
                .state
                .registry
                .add(collateral_token, price_feed, settlement_token)?;
            tx.emit(CoordinatorEvent::AssetConfigured {
                config,
                collateral_token,
                price_feed,
                settlement_token,
            });
            Ok(config)
        })
    }

    /// Deactivate a triple. Authority only. Open requests are unaffected.
    pub fn deconfigure_asset(
        &self,
        caller: Address,
        collateral_token: Address,
        price_feed: Address,
        settlement_token: Address,
    ) -> Result<AssetConfigId, CoordinatorError> {
        self.execute("deconfigure_asset", |tx| {
            tx.require_authority(caller)?;
            let config = tx
                .state
                .registry
                .remove(collateral_token, price_feed, settlement_token)?;
            tx.emit(CoordinatorEvent::AssetDeconfigured { config });
            Ok(config)
        })
    }

    /// Change the coordinator fee. Authority only, bounded by `MAX_FEE_BPS`.
    pub fn set_fee(&self, caller: Address, bps: u16) -> Result<(), CoordinatorError> {
        self.execute("set_fee", |tx| {
            tx.require_authority(caller)?;
            let new = FeeBps::new(bps).ok_or(CoordinatorError::FeeAboveCap {
                requested: bps,
                cap: MAX_FEE_BPS,
            })?;
            let old = std::mem::replace(&mut tx.state.fee_bps, new);
            tx.emit(CoordinatorEvent::FeeUpdated { old, new });
            Ok(())
        })
    }

    /// Withdraw settlement fees or stray deposits to the authority.
    ///
    /// Bounded by held balance minus locked collateral.
    pub fn sweep_surplus(&self, caller: Address, token: Address, amount: Amount) -> Result<(), CoordinatorError> {
        self.execute("sweep_surplus", |tx| {
            tx.require_authority(caller)?;
            if amount == 0 {
                return Err(CoordinatorError::ZeroAmount { field: "amount" });
            }
            let held = tx.tokens.balance_of(&token, &tx.this);
            tx.state.custody.authorize_withdrawal(&token, held, amount)?;
            let to = tx.state.authority;
            tx.tokens.transfer(&token, &tx.this, &to, amount)?;
            tx.emit(CoordinatorEvent::SurplusSwept { token, amount, to });
            Ok(())
        })
    }

    /// Hand the configuration authority to another address.
    pub fn transfer_authority(&self, caller: Address, new_authority: Address) -> Result<(), CoordinatorError> {
        self.execute("transfer_authority", |tx| {
            tx.require_authority(caller)?;
            if new_authority.is_zero() {
                return Err(CoordinatorError::ZeroAddress { field: "new_authority" });
            }
            let previous = std::mem::replace(&mut tx.state.authority, new_authority);
            tx.emit(CoordinatorEvent::AuthorityTransferred {
                previous,
                new: new_authority,
            });
            Ok(())
        })
    }

    // ── Borrower ─────────────────────────────────────────────────────

    /// Lock collateral and open an auction for its notional.
    ///
    /// The caller must have approved the coordinator for `collateral_amount`
    /// of the collateral token.
    pub fn request_loan(&self, caller: Address, params: LoanParams) -> Result<LoanId, CoordinatorError> {
        self.execute("request_loan", |tx| tx.create_request(caller, params))
    }

    /// Withdraw an open request and return its collateral.
    pub fn cancel_loan(&self, caller: Address, id: LoanId) -> Result<(), CoordinatorError> {
        self.execute("cancel_loan", |tx| tx.cancel_request(caller, id))
    }

    /// Ask the engine to close the auction on a specific quote.
    ///
    /// Local state is unchanged; the request settles later through
    /// `handle_settlement`.
    pub fn request_early_settlement(
        &self,
        caller: Address,
        id: LoanId,
        offer: EarlySettlementOffer,
    ) -> Result<(), CoordinatorError> {
        self.execute("request_early_settlement", |tx| {
            tx.forward_early_settlement(caller, id, offer)
        })
    }

    // ── Settlement contract ──────────────────────────────────────────

    /// Hand custody of a resolved request to its settlement contract.
    ///
    /// `caller` must be the contract the engine designated for `id`, and
    /// `settlement_contract` must name that same contract.
    pub fn handle_settlement(
        &self,
        caller: Address,
        id: LoanId,
        settlement_contract: Address,
    ) -> Result<SettlementHandoff, CoordinatorError> {
        self.execute("handle_settlement", |tx| {
            tx.settle_handoff(caller, id, settlement_contract)
        })
    }

    // ── Views ────────────────────────────────────────────────────────

    /// The coordinator's custody address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current configuration authority.
    pub fn authority(&self) -> Address {
        self.committed.read().state.authority
    }

    /// Current fee rate.
    pub fn fee_bps(&self) -> FeeBps {
        self.committed.read().state.fee_bps
    }

    /// A request by id.
    pub fn request(&self, id: LoanId) -> Option<LoanRequest> {
        self.committed.read().state.loans.get(id).cloned()
    }

    /// All requests still open.
    pub fn open_requests(&self) -> Vec<LoanRequest> {
        self.committed.read().state.loans.open().cloned().collect()
    }

    /// All requests made by `requester`, in id order.
    pub fn requests_by(&self, requester: Address) -> Vec<LoanRequest> {
        self.committed
            .read()
            .state
            .loans
            .by_requester(requester)
            .cloned()
            .collect()
    }

    /// Collateral locked against open requests for `token`.
    pub fn locked_collateral(&self, token: Address) -> Amount {
        self.committed.read().state.custody.locked(&token)
    }

    /// A registered asset config.
    pub fn asset_config(&self, id: AssetConfigId) -> Option<AssetConfig> {
        self.committed.read().state.registry.get(&id).cloned()
    }

    /// Whether a triple may originate new requests.
    pub fn is_approved(&self, id: AssetConfigId) -> bool {
        self.committed.read().state.registry.is_approved(&id)
    }

    /// Balance of `token` the authority could sweep right now.
    ///
    /// Needs the token ledger, so it is rejected while an entry point runs.
    pub fn sweepable(&self, token: Address) -> Result<Amount, CoordinatorError> {
        let gate = self.gate.lock();
        if gate.entered.get() {
            return Err(CoordinatorError::Reentrant { operation: "sweepable" });
        }
        let collaborators = gate.collaborators.borrow();
        let held = collaborators.tokens.balance_of(&token, &self.address);
        Ok(self.committed.read().state.custody.sweepable(&token, held))
    }

    /// Committed event log.
    pub fn events(&self) -> Vec<CoordinatorEvent> {
        self.committed.read().events.clone()
    }

    /// Take the committed event log, leaving it empty.
    pub fn drain_events(&self) -> Result<Vec<CoordinatorEvent>, CoordinatorError> {
        let gate = self.gate.lock();
        if gate.entered.get() {
            return Err(CoordinatorError::Reentrant { operation: "drain_events" });
        }
        Ok(std::mem::take(&mut self.committed.write().events))
    }
}

// ─── Observability ───────────────────────────────────────────────────

fn record_committed(operation: &'static str, events: &[CoordinatorEvent], locked: &[(Address, Amount)]) {
    for event in events {
        match event {
            CoordinatorEvent::LoanRequested {
                id,
                requester,
                collateral_amount,
                notional,
                ..
            } => {
                tracing::info!(
                    loan_id = %id,
                    requester = %requester,
                    collateral_amount = %collateral_amount,
                    notional = %notional,
                    "loan requested"
                );
                metrics::counter!("ccl_loans_requested_total").increment(1);
            }
            CoordinatorEvent::LoanCancelled { id, collateral_amount, .. } => {
                tracing::info!(loan_id = %id, collateral_amount = %collateral_amount, "loan cancelled");
                metrics::counter!("ccl_loans_cancelled_total").increment(1);
            }
            CoordinatorEvent::LoanSettled {
                id,
                settlement_contract,
                winning_premium,
                net_premium,
            } => {
                tracing::info!(
                    loan_id = %id,
                    settlement_contract = %settlement_contract,
                    winning_premium = %winning_premium,
                    net_premium = %net_premium,
                    "loan settled"
                );
                metrics::counter!("ccl_loans_settled_total").increment(1);
            }
            CoordinatorEvent::FeeCollected { id, token, amount } => {
                tracing::info!(loan_id = %id, token = %token, amount = %amount, "fee collected");
                metrics::counter!("ccl_fees_collected_total").increment(1);
            }
            other => {
                tracing::info!(operation, event = other.name(), "committed");
            }
        }
    }
    for (token, amount) in locked {
        metrics::gauge!("ccl_locked_collateral", "token" => token.to_string()).set(*amount as f64);
    }
}

fn log_rejection(operation: &'static str, err: &CoordinatorError) {
    match err.kind() {
        ccl_core::ErrorKind::Consistency => {
            tracing::error!(operation, kind = %err.kind(), error = %err, "operation aborted");
        }
        ccl_core::ErrorKind::Authorization | ccl_core::ErrorKind::State => {
            tracing::warn!(operation, kind = %err.kind(), error = %err, "operation rejected");
        }
        ccl_core::ErrorKind::Validation => {
            tracing::debug!(operation, kind = %err.kind(), error = %err, "operation rejected");
        }
    }
}
