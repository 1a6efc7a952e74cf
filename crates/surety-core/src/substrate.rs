/// LEDGER SUBSTRATE
///
/// The external executor that runs every Flight Surety operation as one atomic
/// state transition. The core consumes only the primitives below; block
/// production, fees and finality live outside it.

use crate::types::{Identity, Money};
use log::warn;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Recipient {0} rejected the transfer")]
    Rejected(Identity),
    #[error("Insufficient funds in {account}: has {available}, needs {required}")]
    InsufficientFunds {
        account: Identity,
        available: Money,
        required: Money,
    },
    #[error("Balance of {0} would overflow")]
    Overflow(Identity),
}

/// Primitives provided by the ledger that executes the platform.
pub trait LedgerSubstrate {
    /// Identity that signed the call currently executing
    fn current_signer(&self) -> Identity;

    /// Pay `amount` out of the platform to `to`
    fn transfer(&mut self, to: &Identity, amount: Money) -> Result<(), TransferError>;

    /// Take `amount` attached to the current call from `from` into the platform
    fn deposit(&mut self, from: &Identity, amount: Money) -> Result<(), TransferError>;

    /// Ledger-provided entropy for pseudo-random choices
    fn random_seed(&self) -> Vec<u8>;
}

/// Substrate backed by in-process account balances.
///
/// Entropy advances with every value-carrying call so that successive
/// draws differ while remaining reproducible for a given call sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemorySubstrate {
    signer: Identity,
    accounts: BTreeMap<Identity, Money>,
    rejecting: BTreeSet<Identity>,
    height: u64,
}

impl InMemorySubstrate {
    pub fn new(signer: impl Into<Identity>) -> Self {
        InMemorySubstrate {
            signer: signer.into(),
            accounts: BTreeMap::new(),
            rejecting: BTreeSet::new(),
            height: 0,
        }
    }

    pub fn sign_as(&mut self, signer: impl Into<Identity>) {
        self.signer = signer.into();
    }

    /// Credit an external account, as if funded from outside the platform
    pub fn mint(&mut self, account: impl Into<Identity>, amount: Money) {
        let balance = self.accounts.entry(account.into()).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, account: &Identity) -> Money {
        self.accounts.get(account).copied().unwrap_or(0)
    }

    /// Make every transfer to `account` fail until `accept_transfers` is called
    pub fn reject_transfers(&mut self, account: impl Into<Identity>) {
        self.rejecting.insert(account.into());
    }

    pub fn accept_transfers(&mut self, account: &Identity) {
        self.rejecting.remove(account);
    }

    /// Advance the simulated block height, changing the entropy
    pub fn advance(&mut self) {
        self.height += 1;
    }
}

impl LedgerSubstrate for InMemorySubstrate {
    fn current_signer(&self) -> Identity {
        self.signer.clone()
    }

    fn transfer(&mut self, to: &Identity, amount: Money) -> Result<(), TransferError> {
        if self.rejecting.contains(to) {
            warn!("Substrate rejected transfer of {} wei to {}", amount, to);
            return Err(TransferError::Rejected(to.clone()));
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(to.clone()))?;
        self.accounts.insert(to.clone(), credited);
        self.height += 1;
        Ok(())
    }

    fn deposit(&mut self, from: &Identity, amount: Money) -> Result<(), TransferError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                account: from.clone(),
                available,
                required: amount,
            });
        }
        self.accounts.insert(from.clone(), available - amount);
        self.height += 1;
        Ok(())
    }

    fn random_seed(&self) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(b"surety-substrate");
        hasher.update(self.height.to_be_bytes());
        hasher.finalize().to_vec()
    }
}
