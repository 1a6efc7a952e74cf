/// SOLVENCY POOL
///
/// Aggregate accounting of every amount that enters or leaves the platform.
/// Balances owed to passengers may only be created by crediting and only
/// destroyed by withdrawal; the pool checks that the books still balance.
///
/// INVARIANTS:
/// 1. outstanding = total_credited - total_withdrawn
/// 2. outstanding <= premiums * multiplier + airline_funding - total_withdrawn
/// 3. total_withdrawn <= total_credited

use crate::params::SuretyParams;
use crate::types::Money;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolvencyError {
    #[error("Outstanding balances {outstanding} exceed coverage {coverage}")]
    Uncovered { outstanding: Money, coverage: Money },
    #[error("Withdrawn {withdrawn} exceeds credited {credited}")]
    OverWithdrawn { withdrawn: Money, credited: Money },
    #[error("Accounting overflow")]
    Overflow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvencyPool {
    /// Cumulative airline funding
    pub airline_funding: Money,
    /// Cumulative premiums paid by passengers
    pub premiums_collected: Money,
    /// Cumulative oracle registration fees
    pub fees_collected: Money,
    /// Cumulative payouts credited to passengers
    pub total_credited: Money,
    /// Cumulative amounts paid out by withdrawal
    pub total_withdrawn: Money,
}

impl SolvencyPool {
    pub fn new() -> Self {
        SolvencyPool::default()
    }

    pub fn record_funding(&mut self, amount: Money) -> Result<(), SolvencyError> {
        self.airline_funding = self.airline_funding.checked_add(amount).ok_or(SolvencyError::Overflow)?;
        Ok(())
    }

    pub fn record_premium(&mut self, amount: Money) -> Result<(), SolvencyError> {
        self.premiums_collected = self.premiums_collected.checked_add(amount).ok_or(SolvencyError::Overflow)?;
        Ok(())
    }

    pub fn record_fee(&mut self, amount: Money) -> Result<(), SolvencyError> {
        self.fees_collected = self.fees_collected.checked_add(amount).ok_or(SolvencyError::Overflow)?;
        Ok(())
    }

    pub fn record_credit(&mut self, amount: Money) -> Result<(), SolvencyError> {
        self.total_credited = self.total_credited.checked_add(amount).ok_or(SolvencyError::Overflow)?;
        Ok(())
    }

    pub fn record_withdrawal(&mut self, amount: Money) -> Result<(), SolvencyError> {
        let withdrawn = self.total_withdrawn.checked_add(amount).ok_or(SolvencyError::Overflow)?;
        if withdrawn > self.total_credited {
            return Err(SolvencyError::OverWithdrawn { withdrawn, credited: self.total_credited });
        }
        self.total_withdrawn = withdrawn;
        Ok(())
    }

    /// Undo a withdrawal whose transfer was rejected
    pub fn revert_withdrawal(&mut self, amount: Money) {
        self.total_withdrawn = self.total_withdrawn.saturating_sub(amount);
    }

    /// Credited but not yet withdrawn
    pub fn outstanding(&self) -> Money {
        self.total_credited.saturating_sub(self.total_withdrawn)
    }

    /// Funds held by the platform
    pub fn balance(&self) -> Money {
        (self.airline_funding + self.premiums_collected + self.fees_collected)
            .saturating_sub(self.total_withdrawn)
    }

    /// Maximum that may be owed: `payout(premiums) + funding - withdrawn`
    pub fn coverage(&self, params: &SuretyParams) -> Money {
        params
            .payout_for(self.premiums_collected)
            .saturating_add(self.airline_funding)
            .saturating_sub(self.total_withdrawn)
    }

    pub fn verify(&self, params: &SuretyParams) -> Result<(), SolvencyError> {
        if self.total_withdrawn > self.total_credited {
            return Err(SolvencyError::OverWithdrawn {
                withdrawn: self.total_withdrawn,
                credited: self.total_credited,
            });
        }
        let outstanding = self.outstanding();
        let coverage = self.coverage(params);
        if outstanding > coverage {
            return Err(SolvencyError::Uncovered { outstanding, coverage });
        }
        Ok(())
    }

    /// Hash commitment over the books, for audit trails
    pub fn compute_hash(&self) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(self.airline_funding.to_le_bytes());
        hasher.update(self.premiums_collected.to_le_bytes());
        hasher.update(self.fees_collected.to_le_bytes());
        hasher.update(self.total_credited.to_le_bytes());
        hasher.update(self.total_withdrawn.to_le_bytes());
        hasher.finalize().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
        use crate::types::ether;

    #[test]
    fn test_fresh_pool_is_solvent() {
        assert!(SolvencyPool::new().verify(&SuretyParams::default()).is_ok());
    }

    #[test]
    fn test_credit_and_withdraw_flow() {
        let mut pool = SolvencyPool::new();
        pool.record_funding(ether(10)).unwrap();
        pool.record_premium(ether(1)).unwrap();
        pool.record_credit(1_500_000_000_000_000_000).unwrap();
        assert_eq!(pool.outstanding(), 1_500_000_000_000_000_000);
        assert!(pool.verify(&SuretyParams::default()).is_ok());

        pool.record_withdrawal(1_500_000_000_000_000_000).unwrap();
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.balance(), ether(11) - 1_500_000_000_000_000_000);
    }

    #[test]
    fn test_cannot_withdraw_more_than_credited() {
        let mut pool = SolvencyPool::new();
        pool.record_credit(10).unwrap();
        assert!(matches!(pool.record_withdrawal(11), Err(SolvencyError::OverWithdrawn { .. })));
        assert_eq!(pool.total_withdrawn, 0);
    }

    #[test]
    fn test_uncovered_credit_detected() {
        let mut pool = SolvencyPool::new();
        pool.record_premium(100).unwrap();
        pool.record_credit(151).unwrap();
        assert!(matches!(pool.verify(&SuretyParams::default()), Err(SolvencyError::Uncovered { .. })));
    }

    #[test]
    fn test_revert_withdrawal_restores_books() {
        let mut pool = SolvencyPool::new();
        pool.record_credit(40).unwrap();
        let before = pool.compute_hash();
        pool.record_withdrawal(40).unwrap();
        pool.revert_withdrawal(40);
        assert_eq!(before, pool.compute_hash());
    }
}
