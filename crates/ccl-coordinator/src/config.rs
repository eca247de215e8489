//! # Coordinator Configuration

use serde::{Deserialize, Serialize};

use ccl_core::{Address, FeeBps};

/// Construction-time settings for a [`Coordinator`](crate::Coordinator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Address the coordinator holds custody under.
    pub address: Address,
    /// Configuration authority.
    pub authority: Address,
    /// Initial coordinator fee.
    #[serde(default)]
    pub fee_bps: FeeBps,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_json() {
        let json = r#"{
            "address": "0x00000000000000000000000000000000000000c0",
            "authority": "0x00000000000000000000000000000000000000a0",
            "fee_bps": 50
        }"#;
        let cfg: CoordinatorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.address, Address::from_low_u64(0xc0));
        assert_eq!(cfg.fee_bps.get(), 50);
    }

    #[test]
    fn fee_defaults_to_zero() {
        let json = r#"{
            "address": "0x00000000000000000000000000000000000000c0",
            "authority": "0x00000000000000000000000000000000000000a0"
        }"#;
        let cfg: CoordinatorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.fee_bps, FeeBps::ZERO);
    }

    #[test]
    fn fee_above_cap_rejected_at_parse() {
        let json = r#"{
            "address": "0x00000000000000000000000000000000000000c0",
            "authority": "0x00000000000000000000000000000000000000a0",
            "fee_bps": 5000
        }"#;
        assert!(serde_json::from_str::<CoordinatorConfig>(json).is_err());
    }
}
