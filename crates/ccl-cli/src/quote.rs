//! # Quote Subcommand
//!
//! Computes what `request_loan` would put up for auction, without touching
//! any state.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use ccl_core::{
    compute_fee, contract_count, notional, notional_for_contracts, Amount, FeeBps, FeeSplit,
    MAX_FEE_BPS,
};

/// Arguments for the `ccl quote` subcommand.
#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Collateral amount in the collateral token's smallest unit.
    #[arg(long)]
    pub collateral_amount: Amount,

    /// Strike at the oracle scale (1e8).
    #[arg(long)]
    pub strike: Amount,

    /// Decimals of the collateral token.
    #[arg(long, default_value_t = 18)]
    pub collateral_decimals: u8,

    /// Decimals of the settlement token.
    #[arg(long, default_value_t = 6)]
    pub settlement_decimals: u8,

    /// Premium to split, in settlement units. Defaults to the notional.
    #[arg(long)]
    pub premium: Option<Amount>,

    /// Coordinator fee in basis points.
    #[arg(long, default_value_t = 0)]
    pub fee_bps: u16,
}

/// What `ccl quote` prints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Settlement-token notional of the collateral at the strike.
    pub notional: Amount,
    /// Contracts backing the notional.
    pub contract_count: Amount,
    /// Notional recomputed from `contract_count`.
    pub implied_notional: Amount,
    /// Premium that was split.
    pub premium: Amount,
    /// Fee rate applied.
    pub fee_bps: u16,
    /// Coordinator fee and requester net.
    pub split: FeeSplit,
}

/// Compute a quote.
pub fn quote(args: &QuoteArgs) -> Result<Quote> {
    let fee_bps = FeeBps::new(args.fee_bps)
        .with_context(|| format!("fee {} bps exceeds cap {MAX_FEE_BPS}", args.fee_bps))?;
    let notional = notional(
        args.collateral_amount,
        args.strike,
        args.collateral_decimals,
        args.settlement_decimals,
    )?;
    let contract_count = contract_count(notional, args.strike)?;
    let implied_notional = notional_for_contracts(contract_count, args.strike)?;
    let premium = args.premium.unwrap_or(notional);
    Ok(Quote {
        notional,
        contract_count,
        implied_notional,
        premium,
        fee_bps: fee_bps.get(),
        split: compute_fee(premium, fee_bps),
    })
}

/// Execute the quote subcommand.
pub fn run_quote(args: &QuoteArgs) -> Result<u8> {
    let quote = quote(args)?;
    if quote.implied_notional != quote.notional {
        tracing::warn!(
            notional = %quote.notional,
            implied = %quote.implied_notional,
            "contract count does not reproduce the notional"
        );
    }
    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(0)
}
