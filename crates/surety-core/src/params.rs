/// PROTOCOL PARAMETERS
///
/// Every tunable constant of the platform. Defaults are the canonical values;
/// deployments may override them through configuration, within the bounds
/// enforced by `SuretyParams::validate`.

use crate::types::{ether, Money};
use crate::units::serde_amount;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registered airlines admitted without a vote, below this count
pub const CONSENSUS_THRESHOLD_SIZE: usize = 4;

/// Matching oracle responses needed to resolve a status request
pub const MIN_RESPONSES: usize = 3;

/// Indexes are drawn from `[0, INDEX_RANGE)`
pub const INDEX_RANGE: u8 = 10;

/// Distinct indexes assigned to each oracle
pub const INDEXES_PER_ORACLE: usize = 3;

/// Maximum premium per policy
pub const MAX_PREMIUM: Money = ether(1);

/// Payout multiplier in basis points (15000 = 1.5x)
pub const PAYOUT_MULTIPLIER_BPS: u32 = 15_000;

/// Minimum cumulative airline funding
pub const MIN_AIRLINE_FUND: Money = ether(10);

/// Maximum cumulative airline funding
pub const MAX_AIRLINE_FUND: Money = ether(50);

/// Oracle registration fee
pub const REGISTRATION_FEE: Money = ether(1);

const BPS_DENOMINATOR: u128 = 10_000;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamsError {
    #[error("Invalid parameter {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ParamsError {
    ParamsError::Invalid { field, reason: reason.into() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuretyParams {
    pub consensus_threshold_size: usize,
    pub min_responses: usize,
    pub index_range: u8,
    pub indexes_per_oracle: usize,
    #[serde(with = "serde_amount")]
    pub max_premium: Money,
    pub payout_multiplier_bps: u32,
    #[serde(with = "serde_amount")]
    pub min_airline_fund: Money,
    #[serde(with = "serde_amount")]
    pub max_airline_fund: Money,
    #[serde(with = "serde_amount")]
    pub registration_fee: Money,
}

impl Default for SuretyParams {
    fn default() -> Self {
        SuretyParams {
            consensus_threshold_size: CONSENSUS_THRESHOLD_SIZE,
            min_responses: MIN_RESPONSES,
            index_range: INDEX_RANGE,
            indexes_per_oracle: INDEXES_PER_ORACLE,
            max_premium: MAX_PREMIUM,
            payout_multiplier_bps: PAYOUT_MULTIPLIER_BPS,
            min_airline_fund: MIN_AIRLINE_FUND,
            max_airline_fund: MAX_AIRLINE_FUND,
            registration_fee: REGISTRATION_FEE,
        }
    }
}

impl SuretyParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.consensus_threshold_size == 0 {
            return Err(invalid("consensus_threshold_size", "must be at least 1"));
        }
        if self.min_responses == 0 {
            return Err(invalid("min_responses", "must be at least 1"));
        }
        if self.index_range == 0 {
            return Err(invalid("index_range", "must be at least 1"));
        }
        if self.indexes_per_oracle == 0 || self.indexes_per_oracle > self.index_range as usize {
            return Err(invalid(
                "indexes_per_oracle",
                format!("must be within 1..={}", self.index_range),
            ));
        }
        if self.max_premium == 0 {
            return Err(invalid("max_premium", "must be positive"));
        }
        if (self.payout_multiplier_bps as u128) < BPS_DENOMINATOR {
            return Err(invalid("payout_multiplier_bps", "payout must not be below the premium"));
        }
        if self.min_airline_fund == 0 || self.min_airline_fund > self.max_airline_fund {
            return Err(invalid(
                "min_airline_fund",
                "must be positive and not exceed max_airline_fund",
            ));
        }
        Ok(())
    }

    /// Payout owed for a premium; rounds down to whole wei.
    pub fn payout_for(&self, premium: Money) -> Money {
        premium.saturating_mul(self.payout_multiplier_bps as u128) / BPS_DENOMINATOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SuretyParams::default().validate().is_ok());
    }

    #[test]
    fn test_payout_is_one_and_a_half_times_premium() {
        let params = SuretyParams::default();
        assert_eq!(params.payout_for(ether(1)), 1_500_000_000_000_000_000);
        assert_eq!(params.payout_for(3), 4);
    }

    #[test]
    fn test_rejects_inconsistent_values() {
        let mut params = SuretyParams::default();
        params.indexes_per_oracle = 11;
        assert!(params.validate().is_err());

        let mut params = SuretyParams::default();
        params.min_airline_fund = ether(60);
        assert!(params.validate().is_err());

        let mut params = SuretyParams::default();
        params.payout_multiplier_bps = 9_999;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let params: SuretyParams =
            serde_json::from_str(r#"{"min_responses": 5, "max_premium": "2 ether"}"#).unwrap();
        assert_eq!(params.min_responses, 5);
        assert_eq!(params.max_premium, ether(2));
        assert_eq!(params.index_range, INDEX_RANGE);
    }
}
