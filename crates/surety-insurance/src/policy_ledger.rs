/// POLICY LEDGER
///
/// Passenger policies per flight, payouts owed, and withdrawals.
///
/// Balances change in exactly two places: `credit_for_delay` adds the payout
/// of each uncredited policy, and `withdraw` zeroes a balance before paying it
/// out through the substrate, restoring it only if that transfer fails.

use crate::flight_registry::FlightRegistry;
use crate::InsuranceError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use surety_core::{FlightKey, Identity, LedgerSubstrate, Money, SolvencyPool, SuretyParams};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub passenger: Identity,
    pub flight: FlightKey,
    pub premium: Money,
    /// Zero until the flight resolves to an airline-caused delay
    pub payout_credited: Money,
    /// The credited payout has been paid out
    pub withdrawn: bool,
}

/// One passenger credit produced by `credit_for_delay`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub passenger: Identity,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyLedger {
    policies: BTreeMap<FlightKey, BTreeMap<Identity, Policy>>,
    balances: BTreeMap<Identity, Money>,
    params: SuretyParams,
}

impl PolicyLedger {
    pub fn new(params: &SuretyParams) -> Self {
        PolicyLedger {
            policies: BTreeMap::new(),
            balances: BTreeMap::new(),
            params: params.clone(),
        }
    }

    pub fn validate_purchase(
        &self,
        flights: &FlightRegistry,
        passenger: &Identity,
        flight: &FlightKey,
        premium: Money,
    ) -> Result<(), InsuranceError> {
        if !flights.is_open(flight) {
            return Err(InsuranceError::FlightNotOpen(flight.clone()));
        }
        if premium == 0 {
            return Err(InsuranceError::ZeroPremium);
        }
        if premium > self.params.max_premium {
            return Err(InsuranceError::PremiumTooHigh { premium, maximum: self.params.max_premium });
        }
        if self.policy(passenger, flight).is_some() {
            return Err(InsuranceError::DuplicatePolicy {
                passenger: passenger.clone(),
                flight: flight.clone(),
            });
        }
        Ok(())
    }

    /// Record a new policy; the premium is added to the solvency pool.
    pub fn buy_policy(
        &mut self,
        flights: &FlightRegistry,
        passenger: &Identity,
        flight: &FlightKey,
        premium: Money,
        pool: &mut SolvencyPool,
    ) -> Result<(), InsuranceError> {
        self.validate_purchase(flights, passenger, flight, premium)?;
        pool.record_premium(premium)?;

        self.policies.entry(flight.clone()).or_default().insert(
            passenger.clone(),
            Policy {
                passenger: passenger.clone(),
                flight: flight.clone(),
                premium,
                payout_credited: 0,
                withdrawn: false,
            },
        );

        info!("Policy bought by {} for {} (premium {})", passenger, flight, premium);
        Ok(())
    }

    /// Credit every uncredited policy on `flight` with its payout.
    /// Internal: driven by an airline-delay resolution. Re-invocation is a no-op.
    /// The pool is checked before anything is written, so a failure changes nothing.
    pub fn credit_for_delay(&mut self, flight: &FlightKey, pool: &mut SolvencyPool) -> Result<Vec<Credit>, InsuranceError> {
        let Some(policies) = self.policies.get_mut(flight) else {
            info!("No policies to credit for {}", flight);
            return Ok(Vec::new());
        };

        let credits: Vec<Credit> = policies
            .values()
            .filter(|policy| policy.payout_credited == 0)
            .map(|policy| Credit {
                passenger: policy.passenger.clone(),
                amount: self.params.payout_for(policy.premium),
            })
            .collect();

        let mut books = pool.clone();
        for credit in &credits {
            books.record_credit(credit.amount)?;
        }
        books.verify(&self.params)?;

        *pool = books;
        for credit in &credits {
            if let Some(policy) = policies.get_mut(&credit.passenger) {
                policy.payout_credited = credit.amount;
            }
            let balance = self.balances.entry(credit.passenger.clone()).or_insert(0);
            *balance = balance.saturating_add(credit.amount);
        }

        info!("Credited {} passenger(s) for delayed flight {}", credits.len(), flight);
        Ok(credits)
    }

    pub fn balance_of(&self, identity: &Identity) -> Money {
        self.balances.get(identity).copied().unwrap_or(0)
    }

    /// Pay out the caller's whole balance.
    pub fn withdraw(
        &mut self,
        identity: &Identity,
        substrate: &mut dyn LedgerSubstrate,
        pool: &mut SolvencyPool,
    ) -> Result<Money, InsuranceError> {
        let amount = self.balance_of(identity);
        if amount == 0 {
            return Err(InsuranceError::NoBalance(identity.clone()));
        }

        // Zero first: the balance is never observable mid-transfer
        self.balances.remove(identity);
        if let Err(e) = pool.record_withdrawal(amount) {
            self.balances.insert(identity.clone(), amount);
            return Err(e.into());
        }

        if let Err(e) = substrate.transfer(identity, amount) {
            self.balances.insert(identity.clone(), amount);
            pool.revert_withdrawal(amount);
            warn!("Withdrawal of {} to {} failed, balance restored: {}", amount, identity, e);
            return Err(InsuranceError::TransferFailed(e));
        }

        for policy in self.policies.values_mut().flat_map(BTreeMap::values_mut) {
            if &policy.passenger == identity && policy.payout_credited > 0 {
                policy.withdrawn = true;
            }
        }

        info!("Withdrawal of {} to {}", amount, identity);
        Ok(amount)
    }

    pub fn policy(&self, passenger: &Identity, flight: &FlightKey) -> Option<&Policy> {
        self.policies.get(flight).and_then(|p| p.get(passenger))
    }

    /// Sum of every balance currently owed
    pub fn total_owed(&self) -> Money {
        self.balances.values().sum()
    }
}
