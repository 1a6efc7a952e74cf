/// ORACLE REGISTRY
///
/// Registered oracle identities and the index set each one answers for.
/// Indexes are drawn once at registration from `[0, index_range)`, seeded
/// by the oracle identity, a monotonic registration counter and ledger
/// entropy, and never change afterwards.

use crate::OracleError;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use surety_core::{Identity, Money, RandomSource, SolvencyPool, SuretyParams};

/// Draws per missing index before falling back to the lowest unused ones
const MAX_DRAWS_PER_INDEX: usize = 32;

/// A registered oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Oracle {
    pub identity: Identity,
    /// Distinct indexes, in the order they were drawn
    pub indexes: Vec<u8>,
    /// Registration sequence number
    pub registration: u64,
}

impl Oracle {
    pub fn holds(&self, index: u8) -> bool {
        self.indexes.contains(&index)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRegistry {
    oracles: BTreeMap<Identity, Oracle>,
    registrations: u64,
    registration_fee: Money,
    index_range: u8,
    indexes_per_oracle: usize,
}

impl OracleRegistry {
    pub fn new(params: &SuretyParams) -> Self {
        OracleRegistry {
            oracles: BTreeMap::new(),
            registrations: 0,
            registration_fee: params.registration_fee,
            index_range: params.index_range,
            indexes_per_oracle: params.indexes_per_oracle,
        }
    }

    pub fn validate_registration(&self, identity: &Identity, fee: Money) -> Result<(), OracleError> {
        if fee < self.registration_fee {
            return Err(OracleError::InsufficientFee { offered: fee, required: self.registration_fee });
        }
        if self.oracles.contains_key(identity) {
            return Err(OracleError::AlreadyRegistered(identity.clone()));
        }
        Ok(())
    }

    /// Register an oracle paying `fee`; returns its assigned indexes.
    pub fn register(
        &mut self,
        identity: &Identity,
        fee: Money,
        entropy: &[u8],
        rng: &mut dyn RandomSource,
        pool: &mut SolvencyPool,
    ) -> Result<Vec<u8>, OracleError> {
        self.validate_registration(identity, fee)?;
        pool.record_fee(fee)?;

        let registration = self.registrations;
        self.registrations += 1;

        let mut seed = Vec::with_capacity(identity.as_bytes().len() + 8 + entropy.len());
        seed.extend_from_slice(identity.as_bytes());
        seed.extend_from_slice(&registration.to_be_bytes());
        seed.extend_from_slice(entropy);

        let indexes = self.draw_indexes(&seed, rng);
        self.oracles.insert(
            identity.clone(),
            Oracle { identity: identity.clone(), indexes: indexes.clone(), registration },
        );

        info!("Oracle {} registered with indexes {:?}", identity, indexes);
        Ok(indexes)
    }

    fn draw_indexes(&self, seed: &[u8], rng: &mut dyn RandomSource) -> Vec<u8> {
        let wanted = self.indexes_per_oracle;
        let mut indexes = Vec::with_capacity(wanted);
        let mut draws = 0;

        while indexes.len() < wanted && draws < wanted * MAX_DRAWS_PER_INDEX {
            let index = rng.draw(seed, self.index_range);
            draws += 1;
            if !indexes.contains(&index) {
                indexes.push(index);
            }
        }

        // A degenerate source cannot stall registration
        let mut candidate = 0u8;
        while indexes.len() < wanted {
            if !indexes.contains(&candidate) {
                indexes.push(candidate);
            }
            candidate += 1;
        }
        indexes
    }

    pub fn indexes_of(&self, identity: &Identity) -> Result<&[u8], OracleError> {
        self.oracles
            .get(identity)
            .map(|o| o.indexes.as_slice())
            .ok_or_else(|| OracleError::NotRegistered(identity.clone()))
    }

    pub fn oracle(&self, identity: &Identity) -> Option<&Oracle> {
        self.oracles.get(identity)
    }

    pub fn is_registered(&self, identity: &Identity) -> bool {
        self.oracles.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }

    /// Oracles answering for `index`
    pub fn holders_of(&self, index: u8) -> impl Iterator<Item = &Oracle> {
        self.oracles.values().filter(move |o| o.holds(index))
    }

    pub fn registration_fee(&self) -> Money {
        self.registration_fee
    }
}
