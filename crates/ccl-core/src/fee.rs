//! # Fee Engine
//!
//! Splits a premium into the coordinator's fee and the net amount paid to
//! the borrower:
//!
//! ```text
//! fee = floor(premium * bps / 10_000)
//! net = premium - fee
//! ```
//!
//! ## Invariants
//!
//! - `fee + net == premium` exactly, for every premium.
//! - `fee` is monotonic non-decreasing in `bps`.
//! - The floored remainder always goes to the borrower (`net`).
//!
//! The product `premium * bps` is never formed directly, so the split is
//! exact across the whole `Amount` range.

use serde::{Deserialize, Serialize};

use crate::Amount;

/// Basis points in one whole (100%).
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Upper bound on the configurable coordinator fee (10%).
pub const MAX_FEE_BPS: u16 = 1_000;

/// A fee rate in basis points, guaranteed `<= MAX_FEE_BPS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct FeeBps(u16);

impl FeeBps {
    /// Zero fee.
    pub const ZERO: FeeBps = FeeBps(0);

    /// Validate a raw basis-point value against [`MAX_FEE_BPS`].
    ///
    /// Returns `None` when the value is above the cap.
    pub fn new(bps: u16) -> Option<Self> {
        (bps <= MAX_FEE_BPS).then_some(Self(bps))
    }

    /// The raw basis-point value.
    pub fn get(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for FeeBps {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("fee {value} bps exceeds cap {MAX_FEE_BPS}"))
    }
}

impl From<FeeBps> for u16 {
    fn from(value: FeeBps) -> Self {
        value.0
    }
}

impl std::fmt::Display for FeeBps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

/// Result of splitting a premium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    /// Portion retained by the coordinator.
    pub fee: Amount,
    /// Portion paid to the borrower.
    pub net: Amount,
}

/// Split `premium` at rate `bps`.
///
/// Writing `premium = q * 10_000 + r`, the floored fee equals
/// `q * bps + floor(r * bps / 10_000)`; both terms stay below `premium`.
pub fn compute_fee(premium: Amount, bps: FeeBps) -> FeeSplit {
    let denom = Amount::from(BPS_DENOMINATOR);
    let rate = Amount::from(bps.get());
    let q = premium / denom;
    let r = premium % denom;
    let fee = q * rate + (r * rate) / denom;
    FeeSplit {
        fee,
        net: premium - fee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bps(n: u16) -> FeeBps {
        FeeBps::new(n).unwrap()
    }

    #[test]
    fn fee_is_floored() {
        // 999 * 30 / 10_000 = 2.997
        let split = compute_fee(999, bps(30));
        assert_eq!(split.fee, 2);
        assert_eq!(split.net, 997);
    }

    #[test]
    fn zero_bps_keeps_full_premium() {
        let split = compute_fee(1_000_000, FeeBps::ZERO);
        assert_eq!(split, FeeSplit { fee: 0, net: 1_000_000 });
    }

    #[test]
    fn zero_premium_has_zero_fee() {
        assert_eq!(compute_fee(0, bps(MAX_FEE_BPS)), FeeSplit { fee: 0, net: 0 });
    }

    #[test]
    fn cap_on_large_premium() {
        let split = compute_fee(2_000_000_000, bps(MAX_FEE_BPS));
        assert_eq!(split.fee, 200_000_000);
        assert_eq!(split.net, 1_800_000_000);
    }

    #[test]
    fn max_premium_does_not_overflow() {
        let split = compute_fee(Amount::MAX, bps(MAX_FEE_BPS));
        assert_eq!(split.fee + split.net, Amount::MAX);
        assert_eq!(split.fee, Amount::MAX / 10);
    }

    #[test]
    fn fee_above_cap_rejected() {
        assert!(FeeBps::new(MAX_FEE_BPS).is_some());
        assert!(FeeBps::new(MAX_FEE_BPS + 1).is_none());
    }

    #[test]
    fn fee_bps_deserialize_enforces_cap() {
        let ok: FeeBps = serde_json::from_str("25").unwrap();
        assert_eq!(ok.get(), 25);
        assert!(serde_json::from_str::<FeeBps>("1001").is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// The split never creates or destroys value.
            #[test]
            fn fee_plus_net_is_premium(premium in any::<u128>(), raw in 0u16..=MAX_FEE_BPS) {
                let split = compute_fee(premium, bps(raw));
                prop_assert_eq!(split.fee + split.net, premium);
            }

            /// Raising the rate never lowers the fee.
            #[test]
            fn fee_monotonic_in_bps(premium in any::<u128>(), a in 0u16..=MAX_FEE_BPS, b in 0u16..=MAX_FEE_BPS) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(compute_fee(premium, bps(lo)).fee <= compute_fee(premium, bps(hi)).fee);
            }

            /// Matches the naive formula wherever the naive product fits.
            #[test]
            fn fee_matches_naive_floor(premium in 0u128..(u128::MAX / 10_000), raw in 0u16..=MAX_FEE_BPS) {
                let naive = premium * u128::from(raw) / 10_000;
                prop_assert_eq!(compute_fee(premium, bps(raw)).fee, naive);
            }
        }
    }
}
