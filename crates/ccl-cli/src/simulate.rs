//! # Simulate Subcommand
//!
//! Runs a YAML scenario against a coordinator wired to the in-memory token
//! ledger and the stub auction engine, then prints the committed event log
//! and the final request table as JSON.
//!
//! ## Scenario Format
//!
//! ```yaml
//! coordinator: { address: "0x…c0", authority: "0x…a0", fee_bps: 50 }
//! tokens:   [{ address: "0x…01", symbol: WETH, decimals: 18 }]
//! balances: [{ token: "0x…01", holder: "0x…b0", amount: "10000000000000000000" }]
//! assets:   [{ collateral_token: …, price_feed: …, settlement_token: … }]
//! loans:
//!   - requester: "0x…b0"
//!     collateral_token: …
//!     price_feed: …
//!     settlement_token: …
//!     collateral_amount: "1000000000000000000"
//!     strike: "200000000000"
//!     outcome: { kind: settle, premium: "100000000" }
//! sweeps:   [{ token: …, amount: "500000" }]
//! ```
//!
//! Amounts are decimal strings so they survive YAML's integer range.
//! Outcomes are `open`, `cancel`, `settle`, or `early`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::{Deserialize, Deserializer, Serialize};

use ccl_coordinator::{
    Coordinator, CoordinatorConfig, CoordinatorEvent, EarlySettlementOffer, InMemoryTokenLedger,
    LoanParams, SettlementContract, StubAuctionEngine,
};
use ccl_core::{Address, Amount, LoanId};
use ccl_state::LoanRequest;

/// Arguments for the `ccl simulate` subcommand.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Scenario file (YAML).
    pub scenario: PathBuf,

    /// Append the Prometheus scrape text after the report.
    #[arg(long)]
    pub metrics: bool,
}

// ─── Scenario ────────────────────────────────────────────────────────

fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.trim()
        .parse()
        .map_err(|e| serde::de::Error::custom(format!("invalid amount {raw:?}: {e}")))
}

fn default_expiry_secs() -> i64 {
    30 * 24 * 3600
}

fn default_auction_secs() -> i64 {
    3600
}

/// A complete simulation input.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Coordinator address, authority, and fee.
    pub coordinator: CoordinatorConfig,
    /// Tokens registered with the in-memory ledger.
    #[serde(default)]
    pub tokens: Vec<TokenSpec>,
    /// Opening balances.
    #[serde(default)]
    pub balances: Vec<BalanceSpec>,
    /// Asset triples the authority approves before any loan.
    #[serde(default)]
    pub assets: Vec<AssetSpec>,
    /// Loans, run in order.
    #[serde(default)]
    pub loans: Vec<LoanSpec>,
    /// Surplus withdrawals after all loans.
    #[serde(default)]
    pub sweeps: Vec<SweepSpec>,
}

/// A token known to the ledger.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSpec {
    /// Token address.
    pub address: Address,
    /// Display symbol, for logs only.
    #[serde(default)]
    pub symbol: String,
    /// Decimal places of the smallest unit.
    pub decimals: u8,
}

/// An opening balance minted before the run.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceSpec {
    /// Token minted.
    pub token: Address,
    /// Recipient.
    pub holder: Address,
    /// Amount in the token's smallest unit.
    #[serde(deserialize_with = "decimal")]
    pub amount: Amount,
}

/// An approved (collateral, feed, settlement) triple.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetSpec {
    /// Collateral token.
    pub collateral_token: Address,
    /// Oracle feed.
    pub price_feed: Address,
    /// Settlement token.
    pub settlement_token: Address,
}

/// One loan request and how its auction ends.
#[derive(Debug, Clone, Deserialize)]
pub struct LoanSpec {
    /// Borrower; approval for the collateral is granted automatically.
    pub requester: Address,
    /// Collateral token.
    pub collateral_token: Address,
    /// Oracle feed.
    pub price_feed: Address,
    /// Settlement token.
    pub settlement_token: Address,
    /// Collateral in the token's smallest unit.
    #[serde(deserialize_with = "decimal")]
    pub collateral_amount: Amount,
    /// Strike at the oracle scale (1e8).
    #[serde(deserialize_with = "decimal")]
    pub strike: Amount,
    /// Seconds from now until expiry.
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: i64,
    /// Seconds from now until bidding closes.
    #[serde(default = "default_auction_secs")]
    pub auction_secs: i64,
    /// Convert to a resting limit order if unfilled.
    #[serde(default)]
    pub convert_to_limit_order: bool,
    /// Key lenders use to reach the requester.
    #[serde(default)]
    pub contact_key: String,
    /// How the auction resolves.
    pub outcome: Outcome,
}

/// How the stub engine resolves a loan's auction.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Leave the auction running.
    Open,
    /// The requester withdraws.
    Cancel,
    /// Bidding concludes with a winner.
    Settle {
        /// Winning premium.
        #[serde(deserialize_with = "decimal")]
        premium: Amount,
        /// Part of the premium the engine keeps.
        #[serde(default, deserialize_with = "decimal")]
        fee_withheld: Amount,
    },
    /// The requester accepts a quote before the deadline.
    Early {
        /// Premium accepted.
        #[serde(deserialize_with = "decimal")]
        amount: Amount,
        /// Offer nonce.
        nonce: u64,
        /// Lender whose quote is taken.
        counterparty: Address,
    },
}

/// A surplus withdrawal by the authority.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepSpec {
    /// Token swept.
    pub token: Address,
    /// Amount in the token's smallest unit.
    #[serde(deserialize_with = "decimal")]
    pub amount: Amount,
}

impl Scenario {
    /// Parse a scenario from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing scenario")
    }
}

// ─── Report ──────────────────────────────────────────────────────────

/// What `ccl simulate` prints.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Committed event log, in order.
    pub events: Vec<CoordinatorEvent>,
    /// Final state of every request the scenario created.
    pub requests: Vec<LoanRequest>,
    /// Locked collateral per token, keyed by address.
    pub locked: BTreeMap<String, Amount>,
    /// Sweepable surplus per token, keyed by address.
    pub surplus: BTreeMap<String, Amount>,
}

// ─── Driver ──────────────────────────────────────────────────────────

/// Run a scenario to completion.
///
/// Coordinator rejections fail the whole run; the scenario is expected to
/// describe a valid sequence.
pub fn simulate(scenario: &Scenario) -> Result<Report> {
    let tokens = InMemoryTokenLedger::new();
    let engine = StubAuctionEngine::new(1);
    let coordinator = Coordinator::new(
        scenario.coordinator.clone(),
        Box::new(engine.clone()),
        Box::new(tokens.clone()),
    )?;
    let this = coordinator.address();
    let authority = coordinator.authority();

    for token in &scenario.tokens {
        tracing::debug!(token = %token.address, symbol = %token.symbol, decimals = token.decimals, "token registered");
        tokens.register(token.address, token.decimals);
    }
    for balance in &scenario.balances {
        tokens.mint(&balance.token, &balance.holder, balance.amount)?;
    }
    for asset in &scenario.assets {
        coordinator.configure_asset(
            authority,
            asset.collateral_token,
            asset.price_feed,
            asset.settlement_token,
        )?;
    }

    let mut ids = Vec::with_capacity(scenario.loans.len());
    for (index, loan) in scenario.loans.iter().enumerate() {
        let id = run_loan(&coordinator, &engine, &tokens, loan)
            .with_context(|| format!("loan #{index} for {}", loan.requester))?;
        ids.push(id);
    }

    for sweep in &scenario.sweeps {
        coordinator
            .sweep_surplus(authority, sweep.token, sweep.amount)
            .with_context(|| format!("sweeping {} of {}", sweep.amount, sweep.token))?;
    }

    let mut locked = BTreeMap::new();
    let mut surplus = BTreeMap::new();
    for token in &scenario.tokens {
        locked.insert(token.address.to_string(), coordinator.locked_collateral(token.address));
        surplus.insert(token.address.to_string(), coordinator.sweepable(token.address)?);
    }
    tracing::info!(
        loans = ids.len(),
        held_by = %this,
        "simulation complete"
    );

    Ok(Report {
        events: coordinator.events(),
        requests: ids.into_iter().filter_map(|id| coordinator.request(id)).collect(),
        locked,
        surplus,
    })
}

fn run_loan(
    coordinator: &Coordinator,
    engine: &StubAuctionEngine,
    tokens: &InMemoryTokenLedger,
    loan: &LoanSpec,
) -> Result<LoanId> {
    let this = coordinator.address();
    let allowance = tokens.allowance(&loan.collateral_token, &loan.requester, &this);
    let allowance = allowance
        .checked_add(loan.collateral_amount)
        .context("allowance overflow")?;
    tokens.approve(&loan.collateral_token, &loan.requester, &this, allowance)?;

    let now = Utc::now();
    let id = coordinator.request_loan(
        loan.requester,
        LoanParams {
            collateral_token: loan.collateral_token,
            price_feed: loan.price_feed,
            settlement_token: loan.settlement_token,
            collateral_amount: loan.collateral_amount,
            strike: loan.strike,
            expiry: offset(now, loan.expiry_secs, "expiry_secs")?,
            auction_deadline: offset(now, loan.auction_secs, "auction_secs")?,
            min_acceptable_notional: 0,
            convert_to_limit_order: loan.convert_to_limit_order,
            requester_contact_key: loan.contact_key.clone(),
        },
    )?;

    match &loan.outcome {
        Outcome::Open => {}
        Outcome::Cancel => coordinator.cancel_loan(loan.requester, id)?,
        Outcome::Settle {
            premium,
            fee_withheld,
        } => {
            let contract = engine.resolve(id, *premium, *fee_withheld)?;
            deliver(tokens, loan, this, premium.saturating_sub(*fee_withheld))?;
            SettlementContract::new(contract, id).finalize(coordinator)?;
        }
        Outcome::Early {
            amount,
            nonce,
            counterparty,
        } => {
            coordinator.request_early_settlement(
                loan.requester,
                id,
                EarlySettlementOffer {
                    amount: *amount,
                    nonce: *nonce,
                    counterparty: *counterparty,
                },
            )?;
            let (contract, premium) = engine.resolve_early(id)?;
            deliver(tokens, loan, this, premium)?;
            SettlementContract::new(contract, id).finalize(coordinator)?;
        }
    }
    Ok(id)
}

fn offset(now: DateTime<Utc>, secs: i64, field: &str) -> Result<DateTime<Utc>> {
    Duration::try_seconds(secs)
        .and_then(|delta| now.checked_add_signed(delta))
        .with_context(|| format!("{field} of {secs} seconds is out of range"))
}

/// The engine forwards the premium it did not withhold to the coordinator.
fn deliver(tokens: &InMemoryTokenLedger, loan: &LoanSpec, to: Address, amount: Amount) -> Result<()> {
    if amount > 0 {
        tokens.mint(&loan.settlement_token, &to, amount)?;
    }
    Ok(())
}

/// Execute the simulate subcommand.
pub fn run_simulate(args: &SimulateArgs) -> Result<u8> {
    let handle = if args.metrics {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("installing metrics recorder")?,
        )
    } else {
        None
    };

    let text = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading {}", args.scenario.display()))?;
    let scenario = Scenario::from_yaml(&text)?;
    let report = simulate(&scenario)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(handle) = handle {
        println!("{}", handle.render());
    }
    Ok(0)
}
