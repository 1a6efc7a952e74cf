// FLIGHT SURETY PLATFORM
//
// Wires the airline, oracle, flight and policy components into the public
// operations. Each public method is one atomic transition: it validates
// everything first, then collects any attached value from the substrate,
// then mutates. A failing call leaves no partial state behind.
//
// SAFETY INVARIANTS:
// 1. Every mutating command fails with NotOperational while paused
// 2. Value is collected only after validation; a failed apply refunds it
// 3. A quorum resolution is applied to its flight in the same call
// 4. Only an airline-delay resolution credits passengers, even on a flight
//    its airline closed while the request was pending
// 5. The solvency pool is verified after every crediting and withdrawal

use crate::error::SuretyError;
use log::{error, info, warn};
use surety_core::{
    EventQueue, EventRecord, FlightKey, HashRandomSource, Identity, InMemorySubstrate, LedgerSubstrate, Money,
    RandomSource, SolvencyPool, StatusCode, SuretyEvent, SuretyParams,
};
use surety_governance::{Admission, Airline, AirlineRegistry};
use surety_insurance::{Flight, FlightRegistry, FlightUpdate, Policy, PolicyLedger};
use surety_oracle::{OracleRegistry, RequestTicket, ResponseOutcome, StatusConsensus, StatusRequest};

pub struct FlightSurety<S: LedgerSubstrate> {
    owner: Identity,
    operational: bool,
    params: SuretyParams,
    airlines: AirlineRegistry,
    oracles: OracleRegistry,
    consensus: StatusConsensus,
    flights: FlightRegistry,
    ledger: PolicyLedger,
    pool: SolvencyPool,
    events: EventQueue,
    rng: Box<dyn RandomSource>,
    substrate: S,
}

impl<S: LedgerSubstrate> FlightSurety<S> {
    /// Deploy the platform. The current signer becomes the contract owner and
    /// `first_airline` is registered (unfunded) without a vote.
    pub fn deploy(substrate: S, params: SuretyParams, first_airline: Identity) -> Result<Self, SuretyError> {
        params.validate()?;

        let mut airlines = AirlineRegistry::new(&params);
        airlines.register_first(first_airline.clone())?;

        let mut events = EventQueue::new();
        events.publish(SuretyEvent::AirlineRegistered { airline: first_airline.clone(), votes: 0 });

        let owner = substrate.current_signer();
        info!("Flight Surety deployed by {} with first airline {}", owner, first_airline);

        Ok(FlightSurety {
            owner,
            operational: true,
            oracles: OracleRegistry::new(&params),
            consensus: StatusConsensus::new(&params),
            flights: FlightRegistry::new(),
            ledger: PolicyLedger::new(&params),
            pool: SolvencyPool::new(),
            events,
            rng: Box::new(HashRandomSource::new()),
            airlines,
            params,
            substrate,
        })
    }

    /// Replace the index source (deterministic sources in tests).
    pub fn with_random_source(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    fn require_operational(&self) -> Result<(), SuretyError> {
        if self.operational {
            Ok(())
        } else {
            Err(SuretyError::NotOperational)
        }
    }

    /// Collect `amount` from `payer`, then run `apply`. If `apply` fails the
    /// payment is handed back so the call has no effect.
    fn with_payment<T>(
        &mut self,
        payer: &Identity,
        amount: Money,
        apply: impl FnOnce(&mut Self) -> Result<T, SuretyError>,
    ) -> Result<T, SuretyError> {
        self.substrate.deposit(payer, amount).map_err(SuretyError::PaymentFailed)?;
        match apply(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                if let Err(refund) = self.substrate.transfer(payer, amount) {
                    error!("Refund of {} to {} failed: {}", amount, payer, refund);
                }
                Err(e)
            }
        }
    }

    // ============================================================
    // COMMANDS
    // ============================================================

    pub fn set_operating_status(&mut self, operational: bool) -> Result<(), SuretyError> {
        let caller = self.substrate.current_signer();
        if caller != self.owner {
            return Err(SuretyError::NotContractOwner(caller));
        }
        if self.operational != operational {
            self.operational = operational;
            self.events.publish(SuretyEvent::OperatingStatusChanged { operational });
            warn!("Operating status set to {} by {}", operational, caller);
        }
        Ok(())
    }

    /// Contribute `amount` of funding as the signing airline.
    pub fn fund(&mut self, amount: Money) -> Result<Money, SuretyError> {
        self.require_operational()?;
        let caller = self.substrate.current_signer();
        self.airlines.validate_funding(&caller, amount)?;

        let total = self.with_payment(&caller, amount, |s| {
            Ok(s.airlines.fund(&caller, amount, &mut s.pool)?)
        })?;
        self.events.publish(SuretyEvent::AirlineFunded { airline: caller, amount, total });
        Ok(total)
    }

    /// Propose `candidate` for admission, or vote for it if already pending.
    pub fn propose(&mut self, candidate: &Identity) -> Result<Admission, SuretyError> {
        self.require_operational()?;
        let caller = self.substrate.current_signer();
        let admission = self.airlines.propose(candidate, &caller)?;

        let event = match admission {
            Admission::Registered { votes } => SuretyEvent::AirlineRegistered { airline: candidate.clone(), votes },
            Admission::Pending { votes, required } => SuretyEvent::AirlineVoted {
                candidate: candidate.clone(),
                voter: caller,
                votes,
                required,
            },
        };
        self.events.publish(event);
        Ok(admission)
    }

    /// Register the signer as an oracle, paying `fee`. Returns its indexes.
    pub fn register_oracle(&mut self, fee: Money) -> Result<Vec<u8>, SuretyError> {
        self.require_operational()?;
        let caller = self.substrate.current_signer();
        self.oracles.validate_registration(&caller, fee)?;

        let entropy = self.substrate.random_seed();
        let indexes = self.with_payment(&caller, fee, |s| {
            Ok(s.oracles.register(&caller, fee, &entropy, s.rng.as_mut(), &mut s.pool)?)
        })?;
        self.events.publish(SuretyEvent::OracleRegistered { oracle: caller, indexes: indexes.clone() });
        Ok(indexes)
    }

    /// Open a flight of the signing airline for insurance.
    pub fn open_flight(&mut self, flight_code: &str, timestamp: u64) -> Result<FlightKey, SuretyError> {
        self.require_operational()?;
        let key = FlightKey::new(self.substrate.current_signer(), flight_code, timestamp);
        self.flights.open(&self.airlines, key.clone())?;
        self.events.publish(SuretyEvent::FlightOpened { flight: key.clone() });
        Ok(key)
    }

    /// Close a flight of the signing airline without a status resolution.
    pub fn close_flight(&mut self, key: &FlightKey) -> Result<(), SuretyError> {
        self.require_operational()?;
        let caller = self.substrate.current_signer();
        self.flights.close(key, &caller)?;
        let status = self.flights.flight(key).map_or(StatusCode::Unknown, |f| f.latest_status);
        self.events.publish(SuretyEvent::FlightClosed { flight: key.clone(), status });
        Ok(())
    }

    /// Insure the signer on `key`, paying `premium`.
    pub fn buy_policy(&mut self, key: &FlightKey, premium: Money) -> Result<(), SuretyError> {
        self.require_operational()?;
        let caller = self.substrate.current_signer();
        self.ledger.validate_purchase(&self.flights, &caller, key, premium)?;

        self.with_payment(&caller, premium, |s| {
            Ok(s.ledger.buy_policy(&s.flights, &caller, key, premium, &mut s.pool)?)
        })?;
        self.events.publish(SuretyEvent::PolicyPurchased { passenger: caller, flight: key.clone(), premium });
        Ok(())
    }

    /// Ask the oracles for the status of an open flight.
    pub fn request_status(&mut self, key: &FlightKey) -> Result<RequestTicket, SuretyError> {
        self.require_operational()?;
        let caller = self.substrate.current_signer();
        let entropy = self.substrate.random_seed();
        let ticket = self
            .consensus
            .request_status(key, &caller, &self.flights, &entropy, self.rng.as_mut())?;
        self.events.publish(SuretyEvent::OracleRequest { index: ticket.index, flight: key.clone() });
        Ok(ticket)
    }

    /// Submit the signing oracle's report for the request `(index, key)`.
    pub fn submit_response(
        &mut self,
        index: u8,
        key: &FlightKey,
        status: StatusCode,
    ) -> Result<ResponseOutcome, SuretyError> {
        self.require_operational()?;
        let caller = self.substrate.current_signer();
        let outcome = self.consensus.submit_response(&self.oracles, &caller, index, key, status)?;

        match outcome {
            ResponseOutcome::Recorded { .. } => {
                self.events.publish(SuretyEvent::OracleReport { oracle: caller, flight: key.clone(), status });
            }
            ResponseOutcome::Resolved { status: resolved } => {
                self.events.publish(SuretyEvent::OracleReport { oracle: caller, flight: key.clone(), status });
                self.events.publish(SuretyEvent::StatusResolved { index, flight: key.clone(), status: resolved });
                self.settle(key, resolved)?;
            }
            ResponseOutcome::Ignored { .. } => {}
        }
        Ok(outcome)
    }

    fn settle(&mut self, key: &FlightKey, status: StatusCode) -> Result<(), SuretyError> {
        match self.flights.apply_resolution(key, status)? {
            FlightUpdate::Applied { closed } => {
                if closed {
                    self.events.publish(SuretyEvent::FlightClosed { flight: key.clone(), status });
                }
                if status.triggers_payout() {
                    let credits = self.ledger.credit_for_delay(key, &mut self.pool)?;
                    for credit in credits {
                        self.events.publish(SuretyEvent::PassengerCredited {
                            passenger: credit.passenger,
                            flight: key.clone(),
                            amount: credit.amount,
                        });
                    }
                }
            }
            FlightUpdate::AlreadyResolved { status: standing } => {
                info!("Flight {} already resolved to {}; resolution {} not applied", key, standing, status);
            }
        }
        Ok(())
    }

    /// Pay the signer's whole credited balance out through the substrate.
    pub fn withdraw(&mut self) -> Result<Money, SuretyError> {
        self.require_operational()?;
        let caller = self.substrate.current_signer();
        let amount = self.ledger.withdraw(&caller, &mut self.substrate, &mut self.pool)?;
        self.pool.verify(&self.params)?;
        self.events.publish(SuretyEvent::Withdrawn { account: caller, amount });
        Ok(amount)
    }

    /// Drop resolved status requests. Pending ones are never touched.
    pub fn prune_resolved_requests(&mut self) -> Result<usize, SuretyError> {
        self.require_operational()?;
        let pruned = self.consensus.prune_resolved();
        info!("Pruned {} resolved status request(s)", pruned);
        Ok(pruned)
    }

    /// Drop events older than `cursor`; later cursors stay valid.
    pub fn prune_events_before(&mut self, cursor: u64) -> Result<(), SuretyError> {
        self.require_operational()?;
        self.events.prune_before(cursor);
        Ok(())
    }

    // ============================================================
    // QUERIES
    // ============================================================

    pub fn is_operational(&self) -> bool {
        self.operational
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn params(&self) -> &SuretyParams {
        &self.params
    }

    /// Credited, not yet withdrawn balance
    pub fn balance_of(&self, identity: &Identity) -> Money {
        self.ledger.balance_of(identity)
    }

    pub fn is_open(&self, key: &FlightKey) -> bool {
        self.flights.is_open(key)
    }

    pub fn indexes_of(&self, oracle: &Identity) -> Result<Vec<u8>, SuretyError> {
        Ok(self.oracles.indexes_of(oracle)?.to_vec())
    }

    pub fn airlines_registered_count(&self) -> usize {
        self.airlines.registered_count()
    }

    pub fn funded_airlines_count(&self) -> usize {
        self.airlines.funded_count()
    }

    pub fn is_airline(&self, identity: &Identity) -> bool {
        self.airlines.is_registered(identity)
    }

    pub fn is_funded_airline(&self, identity: &Identity) -> bool {
        self.airlines.is_participant(identity)
    }

    pub fn is_first_airline_registered(&self, identity: &Identity) -> bool {
        self.airlines.is_first_airline(identity)
    }

    pub fn votes_for(&self, candidate: &Identity) -> usize {
        self.airlines.votes_for(candidate)
    }

    pub fn airline(&self, identity: &Identity) -> Option<&Airline> {
        self.airlines.airline(identity)
    }

    pub fn pool_balance(&self) -> Money {
        self.pool.balance()
    }

    pub fn pool(&self) -> &SolvencyPool {
        &self.pool
    }

    pub fn pending_requests(&self) -> Vec<&StatusRequest> {
        self.consensus.pending_requests().collect()
    }

    pub fn request(&self, key: &FlightKey, index: u8) -> Option<&StatusRequest> {
        self.consensus.request(key, index)
    }

    pub fn flight(&self, key: &FlightKey) -> Option<&Flight> {
        self.flights.flight(key)
    }

    pub fn policy(&self, passenger: &Identity, key: &FlightKey) -> Option<&Policy> {
        self.ledger.policy(passenger, key)
    }

    pub fn oracle_count(&self) -> usize {
        self.oracles.len()
    }

    pub fn events_since(&self, cursor: u64) -> &[EventRecord] {
        self.events.since(cursor)
    }

    pub fn next_event_cursor(&self) -> u64 {
        self.events.next_cursor()
    }

    pub fn verify_solvency(&self) -> Result<(), SuretyError> {
        Ok(self.pool.verify(&self.params)?)
    }

    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    pub fn substrate_mut(&mut self) -> &mut S {
        &mut self.substrate
    }
}

impl FlightSurety<InMemorySubstrate> {
    /// Switch the signer for the following calls.
    pub fn sign_as(&mut self, signer: impl Into<Identity>) -> &mut Self {
        self.substrate.sign_as(signer);
        self
    }
}
