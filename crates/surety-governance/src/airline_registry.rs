// AIRLINE REGISTRY
// Airline participation, funding and multiparty admission voting
//
// SAFETY INVARIANTS:
// 1. Below the consensus threshold size, one funded proposal admits a candidate
// 2. At or above it, admission needs votes from a strict majority of funded airlines
// 3. A voter counts at most once per pending candidate
// 4. Funding is monotonic: `funded` never reverts to false
// 5. A registered airline cannot be voted on again

use serde::{Deserialize, Serialize};
use log::{debug, info};
use surety_core::{Identity, Money, SolvencyError, SolvencyPool, SuretyParams};
use thiserror::Error;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Airline {0} is not a registered, funded airline")]
    NotFunded(Identity),

    #[error("Airline {0} is not registered")]
    NotRegistered(Identity),

    #[error("Airline {0} is already registered")]
    AlreadyRegistered(Identity),

    #[error("Airline {voter} already voted for {candidate}")]
    DuplicateVote { voter: Identity, candidate: Identity },

    #[error("Funding of {offered} leaves total below minimum {minimum}")]
    InsufficientFund { offered: Money, minimum: Money },

    #[error("Funding of {offered} would exceed maximum {maximum} (already funded {funded})")]
    FundCapExceeded { offered: Money, funded: Money, maximum: Money },

    #[error("The first airline has already been registered")]
    AlreadyBootstrapped,

    #[error("Solvency error: {0}")]
    Solvency(#[from] SolvencyError),
}

/// An airline record, registered or pending admission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airline {
    pub identity: Identity,

    /// Admitted to the registry
    pub registered: bool,

    /// Cumulative funding reached the minimum
    pub funded: bool,

    /// Cumulative funding contributed
    pub funded_amount: Money,

    /// Airlines that voted to admit this one
    pub votes_received: BTreeSet<Identity>,
}

impl Airline {
    fn pending(identity: Identity) -> Self {
        Airline {
            identity,
            registered: false,
            funded: false,
            funded_amount: 0,
            votes_received: BTreeSet::new(),
        }
    }

    /// Registered and funded: may vote and open flights
    pub fn is_participant(&self) -> bool {
        self.registered && self.funded
    }
}

/// Result of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Admission {
    /// Candidate is now registered
    Registered { votes: usize },
    /// Vote recorded; candidate still needs `required` votes in total
    Pending { votes: usize, required: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirlineRegistry {
    airlines: BTreeMap<Identity, Airline>,
    first_airline: Option<Identity>,
    registered_count: usize,
    funded_count: usize,
    consensus_threshold_size: usize,
    min_airline_fund: Money,
    max_airline_fund: Money,
}

impl AirlineRegistry {
    pub fn new(params: &SuretyParams) -> Self {
        AirlineRegistry {
            airlines: BTreeMap::new(),
            first_airline: None,
            registered_count: 0,
            funded_count: 0,
            consensus_threshold_size: params.consensus_threshold_size,
            min_airline_fund: params.min_airline_fund,
            max_airline_fund: params.max_airline_fund,
        }
    }

    /// Bootstrap: register the first airline (unfunded). Callable once.
    pub fn register_first(&mut self, identity: Identity) -> Result<(), GovernanceError> {
        if self.first_airline.is_some() {
            return Err(GovernanceError::AlreadyBootstrapped);
        }

        let mut airline = Airline::pending(identity.clone());
        airline.registered = true;
        self.airlines.insert(identity.clone(), airline);
        self.registered_count += 1;
        self.first_airline = Some(identity.clone());

        info!("First airline registered: {}", identity);
        Ok(())
    }

    /// Check a funding contribution without applying it
    pub fn validate_funding(&self, identity: &Identity, amount: Money) -> Result<Money, GovernanceError> {
        let airline = self
            .airlines
            .get(identity)
            .filter(|a| a.registered)
            .ok_or_else(|| GovernanceError::NotRegistered(identity.clone()))?;

        let total = airline.funded_amount.saturating_add(amount);
        if total < self.min_airline_fund {
            return Err(GovernanceError::InsufficientFund {
                offered: amount,
                minimum: self.min_airline_fund,
            });
        }
        if total > self.max_airline_fund {
            return Err(GovernanceError::FundCapExceeded {
                offered: amount,
                funded: airline.funded_amount,
                maximum: self.max_airline_fund,
            });
        }
        Ok(total)
    }

    /// Contribute funding; the amount is credited to the solvency pool.
    /// Returns the airline's cumulative funding.
    pub fn fund(
        &mut self,
        identity: &Identity,
        amount: Money,
        pool: &mut SolvencyPool,
    ) -> Result<Money, GovernanceError> {
        let total = self.validate_funding(identity, amount)?;
        pool.record_funding(amount)?;

        let airline = self
            .airlines
            .get_mut(identity)
            .ok_or_else(|| GovernanceError::NotRegistered(identity.clone()))?;
        airline.funded_amount = total;
        if !airline.funded {
            airline.funded = true;
            self.funded_count += 1;
        }

        info!("Airline {} funded {} (total {})", identity, amount, total);
        Ok(total)
    }

    /// Propose (or vote for) the admission of `candidate`.
    pub fn propose(&mut self, candidate: &Identity, proposer: &Identity) -> Result<Admission, GovernanceError> {
        if !self.is_participant(proposer) {
            return Err(GovernanceError::NotFunded(proposer.clone()));
        }
        if self.is_registered(candidate) {
            return Err(GovernanceError::AlreadyRegistered(candidate.clone()));
        }

        let bootstrapping = self.registered_count < self.consensus_threshold_size;
        let required = self.required_votes();

        let record = self
            .airlines
            .entry(candidate.clone())
            .or_insert_with(|| Airline::pending(candidate.clone()));

        if !record.votes_received.insert(proposer.clone()) {
            return Err(GovernanceError::DuplicateVote {
                voter: proposer.clone(),
                candidate: candidate.clone(),
            });
        }
        let votes = record.votes_received.len();

        if bootstrapping || votes >= required {
            record.registered = true;
            if record.funded {
                self.funded_count += 1;
            }
            self.registered_count += 1;
            info!(
                "Airline {} registered by {} ({} vote(s), {} airlines registered)",
                candidate, proposer, votes, self.registered_count
            );
            return Ok(Admission::Registered { votes });
        }

        debug!("Vote from {} for {}: {}/{} required", proposer, candidate, votes, required);
        Ok(Admission::Pending { votes, required })
    }

    /// Votes needed for a strict majority of the current funded airlines
    pub fn required_votes(&self) -> usize {
        self.funded_count / 2 + 1
    }

    pub fn airline(&self, identity: &Identity) -> Option<&Airline> {
        self.airlines.get(identity)
    }

    pub fn is_registered(&self, identity: &Identity) -> bool {
        self.airlines.get(identity).map_or(false, |a| a.registered)
    }

    pub fn is_funded(&self, identity: &Identity) -> bool {
        self.airlines.get(identity).map_or(false, |a| a.funded)
    }

    pub fn is_participant(&self, identity: &Identity) -> bool {
        self.airlines.get(identity).map_or(false, Airline::is_participant)
    }

    pub fn is_first_airline(&self, identity: &Identity) -> bool {
        self.first_airline.as_ref() == Some(identity)
    }

    pub fn registered_count(&self) -> usize {
        self.registered_count
    }

    pub fn funded_count(&self) -> usize {
        self.funded_count
    }

    pub fn votes_for(&self, candidate: &Identity) -> usize {
        self.airlines.get(candidate).map_or(0, |a| a.votes_received.len())
    }
}
