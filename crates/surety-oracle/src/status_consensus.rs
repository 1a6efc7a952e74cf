// STATUS CONSENSUS
// Index-partitioned quorum over independent oracle reports
//
// SAFETY INVARIANTS:
// 1. A request only accepts oracles holding its index
// 2. Each oracle answers a request at most once, whatever code it reports
// 3. The quorum check runs after every single insert: the first status
//    bucket to reach `min_responses` wins and locks the request
// 4. A resolved request never changes; late reports are absorbed, not errors
// 5. Requests never expire here; unresolved ones stay pending until answered

use crate::oracle_registry::OracleRegistry;
use crate::OracleError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use surety_core::{FlightDirectory, FlightKey, Identity, RandomSource, StatusCode, SuretyParams};

/// A status check for one flight, answered by oracles holding `index`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequest {
    pub index: u8,
    pub flight: FlightKey,
    pub requester: Identity,
    /// Oracles grouped by the status they reported
    pub responses: BTreeMap<StatusCode, BTreeSet<Identity>>,
    pub resolved: Option<StatusCode>,
}

impl StatusRequest {
    fn new(index: u8, flight: FlightKey, requester: Identity) -> Self {
        StatusRequest {
            index,
            flight,
            requester,
            responses: BTreeMap::new(),
            resolved: None,
        }
    }

    pub fn has_responded(&self, oracle: &Identity) -> bool {
        self.responses.values().any(|voters| voters.contains(oracle))
    }

    pub fn votes_for(&self, status: StatusCode) -> usize {
        self.responses.get(&status).map_or(0, BTreeSet::len)
    }

    pub fn total_responses(&self) -> usize {
        self.responses.values().map(BTreeSet::len).sum()
    }

    /// Record one report and evaluate the quorum immediately.
    /// Returns the status if this report resolved the request.
    pub fn record(
        &mut self,
        oracle: &Identity,
        status: StatusCode,
        min_responses: usize,
    ) -> Result<Option<StatusCode>, OracleError> {
        if let Some(resolved) = self.resolved {
            return Err(OracleError::AlreadyResolved(resolved));
        }
        if self.has_responded(oracle) {
            return Err(OracleError::DuplicateResponse(oracle.clone()));
        }

        let voters = self.responses.entry(status).or_default();
        voters.insert(oracle.clone());

        if voters.len() >= min_responses {
            self.resolved = Some(status);
            return Ok(Some(status));
        }
        Ok(None)
    }
}

/// Result of `request_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTicket {
    pub index: u8,
    /// A pending request under this index already existed and was kept
    pub reissued: bool,
}

/// Result of `submit_response`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseOutcome {
    /// Report recorded; `votes` oracles now back `status`
    Recorded { status: StatusCode, votes: usize },
    /// This report brought `status` to quorum
    Resolved { status: StatusCode },
    /// The request had already resolved; the report was dropped
    Ignored { resolved: StatusCode },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConsensus {
    requests: BTreeMap<FlightKey, BTreeMap<u8, StatusRequest>>,
    index_range: u8,
    min_responses: usize,
}

impl StatusConsensus {
    pub fn new(params: &SuretyParams) -> Self {
        StatusConsensus {
            requests: BTreeMap::new(),
            index_range: params.index_range,
            min_responses: params.min_responses,
        }
    }

    /// Open a status request for an open flight under a pseudo-random index.
    pub fn request_status(
        &mut self,
        flight: &FlightKey,
        requester: &Identity,
        flights: &dyn FlightDirectory,
        entropy: &[u8],
        rng: &mut dyn RandomSource,
    ) -> Result<RequestTicket, OracleError> {
        if !flights.is_open(flight) {
            return Err(OracleError::FlightNotOpen(flight.clone()));
        }

        let mut seed = Vec::with_capacity(32 + requester.as_bytes().len() + entropy.len());
        seed.extend_from_slice(&flight.digest());
        seed.extend_from_slice(requester.as_bytes());
        seed.extend_from_slice(entropy);
        let index = rng.draw(&seed, self.index_range);

        let slots = self.requests.entry(flight.clone()).or_default();
        if let Some(existing) = slots.get(&index) {
            if existing.resolved.is_none() {
                debug!("Request for {} under index {} still pending; reissued", flight, index);
                return Ok(RequestTicket { index, reissued: true });
            }
        }

        slots.insert(index, StatusRequest::new(index, flight.clone(), requester.clone()));
        info!("Status requested for {} by {} under index {}", flight, requester, index);
        Ok(RequestTicket { index, reissued: false })
    }

    /// Accept one oracle report.
    pub fn submit_response(
        &mut self,
        oracles: &OracleRegistry,
        oracle: &Identity,
        index: u8,
        flight: &FlightKey,
        status: StatusCode,
    ) -> Result<ResponseOutcome, OracleError> {
        let held = oracles.indexes_of(oracle)?;
        if !held.contains(&index) {
            return Err(OracleError::IndexMismatch { oracle: oracle.clone(), index });
        }

        let slots = self
            .requests
            .get_mut(flight)
            .filter(|slots| !slots.is_empty())
            .ok_or_else(|| OracleError::RequestNotFound(flight.clone()))?;
        let request = slots
            .get_mut(&index)
            .ok_or_else(|| OracleError::IndexMismatch { oracle: oracle.clone(), index })?;

        match request.record(oracle, status, self.min_responses) {
            Ok(Some(resolved)) => {
                info!(
                    "Status for {} resolved to {} under index {} ({} responses)",
                    flight,
                    resolved,
                    index,
                    request.total_responses()
                );
                Ok(ResponseOutcome::Resolved { status: resolved })
            }
            Ok(None) => {
                let votes = request.votes_for(status);
                debug!("Oracle {} reported {} for {} ({} votes)", oracle, status, flight, votes);
                Ok(ResponseOutcome::Recorded { status, votes })
            }
            Err(OracleError::AlreadyResolved(resolved)) => {
                debug!("Late report from {} for resolved {} ignored", oracle, flight);
                Ok(ResponseOutcome::Ignored { resolved })
            }
            Err(e) => Err(e),
        }
    }

    pub fn request(&self, flight: &FlightKey, index: u8) -> Option<&StatusRequest> {
        self.requests.get(flight).and_then(|slots| slots.get(&index))
    }

    /// Requests still waiting for a quorum
    pub fn pending_requests(&self) -> impl Iterator<Item = &StatusRequest> {
        self.requests
            .values()
            .flat_map(BTreeMap::values)
            .filter(|r| r.resolved.is_none())
    }

    /// Drop resolved requests; later reports for them become `RequestNotFound`
    pub fn prune_resolved(&mut self) -> usize {
        let mut pruned = 0;
        for slots in self.requests.values_mut() {
            let before = slots.len();
            slots.retain(|_, r| r.resolved.is_none());
            pruned += before - slots.len();
        }
        self.requests.retain(|_, slots| !slots.is_empty());
        pruned
    }

    pub fn min_responses(&self) -> usize {
        self.min_responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use surety_core::{ether, ScriptedRandomSource, SolvencyPool};

    struct OpenFlights(HashSet<FlightKey>);

    impl FlightDirectory for OpenFlights {
        fn is_open(&self, key: &FlightKey) -> bool {
            self.0.contains(key)
        }
    }

    fn flight() -> FlightKey {
        FlightKey::new("airline-2", "IN707", 0)
    }

    fn open_flights() -> OpenFlights {
        OpenFlights([flight()].into_iter().collect())
    }

    /// `count` oracles that all hold index 2 (plus 0 and 1)
    fn oracles_on_index_two(count: usize) -> (OracleRegistry, Vec<Identity>) {
        let mut registry = OracleRegistry::new(&SuretyParams::default());
        let mut pool = SolvencyPool::new();
        let mut ids = Vec::new();
        for n in 0..count {
            let oracle = Identity::new(format!("oracle-{}", n));
            let mut rng = ScriptedRandomSource::new([0, 1, 2]);
            registry.register(&oracle, ether(1), b"", &mut rng, &mut pool).unwrap();
            ids.push(oracle);
        }
        (registry, ids)
    }

    fn consensus_with_request(index: u8) -> StatusConsensus {
        let mut consensus = StatusConsensus::new(&SuretyParams::default());
        let mut rng = ScriptedRandomSource::new([index]);
        consensus
            .request_status(&flight(), &Identity::from("passenger"), &open_flights(), b"", &mut rng)
            .unwrap();
        consensus
    }

    #[test]
    fn test_request_requires_open_flight() {
        let mut consensus = StatusConsensus::new(&SuretyParams::default());
        let closed = OpenFlights(HashSet::new());
        let mut rng = ScriptedRandomSource::new([2]);
        assert_eq!(
            consensus.request_status(&flight(), &Identity::from("p"), &closed, b"", &mut rng),
            Err(OracleError::FlightNotOpen(flight()))
        );
        assert_eq!(consensus.pending_requests().count(), 0);
    }

    #[test]
    fn test_quorum_resolves_on_third_matching_report() {
        let (oracles, ids) = oracles_on_index_two(4);
        let mut consensus = consensus_with_request(2);

        let r1 = consensus.submit_response(&oracles, &ids[0], 2, &flight(), StatusCode::LateAirline).unwrap();
        let r2 = consensus.submit_response(&oracles, &ids[1], 2, &flight(), StatusCode::OnTime).unwrap();
        let r3 = consensus.submit_response(&oracles, &ids[2], 2, &flight(), StatusCode::LateAirline).unwrap();
        assert_eq!(r1, ResponseOutcome::Recorded { status: StatusCode::LateAirline, votes: 1 });
        assert_eq!(r2, ResponseOutcome::Recorded { status: StatusCode::OnTime, votes: 1 });
        assert_eq!(r3, ResponseOutcome::Recorded { status: StatusCode::LateAirline, votes: 2 });

        let r4 = consensus.submit_response(&oracles, &ids[3], 2, &flight(), StatusCode::LateAirline).unwrap();
        assert_eq!(r4, ResponseOutcome::Resolved { status: StatusCode::LateAirline });
        assert_eq!(consensus.request(&flight(), 2).unwrap().resolved, Some(StatusCode::LateAirline));
        assert_eq!(consensus.pending_requests().count(), 0);
    }

    #[test]
    fn test_duplicate_response_rejected_regardless_of_code() {
        let (oracles, ids) = oracles_on_index_two(1);
        let mut consensus = consensus_with_request(2);
        consensus.submit_response(&oracles, &ids[0], 2, &flight(), StatusCode::OnTime).unwrap();
        assert_eq!(
            consensus.submit_response(&oracles, &ids[0], 2, &flight(), StatusCode::LateWeather),
            Err(OracleError::DuplicateResponse(ids[0].clone()))
        );
        assert_eq!(consensus.request(&flight(), 2).unwrap().total_responses(), 1);
    }

    #[test]
    fn test_late_reports_after_resolution_are_ignored() {
        let (oracles, ids) = oracles_on_index_two(5);
        let mut consensus = consensus_with_request(2);
        for oracle in &ids[..3] {
            consensus.submit_response(&oracles, oracle, 2, &flight(), StatusCode::OnTime).unwrap();
        }
        let late = consensus.submit_response(&oracles, &ids[3], 2, &flight(), StatusCode::LateAirline);
        assert_eq!(late, Ok(ResponseOutcome::Ignored { resolved: StatusCode::OnTime }));
        let repeat = consensus.submit_response(&oracles, &ids[0], 2, &flight(), StatusCode::OnTime);
        assert_eq!(repeat, Ok(ResponseOutcome::Ignored { resolved: StatusCode::OnTime }));
        assert_eq!(consensus.request(&flight(), 2).unwrap().total_responses(), 3);
    }

    #[test]
    fn test_index_not_held_by_oracle() {
        let (oracles, ids) = oracles_on_index_two(1);
        let mut consensus = consensus_with_request(2);
        assert_eq!(
            consensus.submit_response(&oracles, &ids[0], 7, &flight(), StatusCode::OnTime),
            Err(OracleError::IndexMismatch { oracle: ids[0].clone(), index: 7 })
        );
        assert_eq!(consensus.request(&flight(), 2).unwrap().total_responses(), 0);
    }

    #[test]
    fn test_index_held_but_request_under_other_index() {
        let (oracles, ids) = oracles_on_index_two(1);
        let mut consensus = consensus_with_request(5);
        assert_eq!(
            consensus.submit_response(&oracles, &ids[0], 2, &flight(), StatusCode::OnTime),
            Err(OracleError::IndexMismatch { oracle: ids[0].clone(), index: 2 })
        );
    }

    #[test]
    fn test_unknown_request_and_unknown_oracle() {
        let (oracles, ids) = oracles_on_index_two(1);
        let mut consensus = StatusConsensus::new(&SuretyParams::default());
        assert_eq!(
            consensus.submit_response(&oracles, &ids[0], 2, &flight(), StatusCode::OnTime),
            Err(OracleError::RequestNotFound(flight()))
        );
        let stranger = Identity::from("stranger");
        assert_eq!(
            consensus.submit_response(&oracles, &stranger, 2, &flight(), StatusCode::OnTime),
            Err(OracleError::NotRegistered(stranger))
        );
    }

    #[test]
    fn test_rerequest_keeps_pending_and_replaces_resolved() {
        let (oracles, ids) = oracles_on_index_two(3);
        let mut consensus = consensus_with_request(2);
        consensus.submit_response(&oracles, &ids[0], 2, &flight(), StatusCode::Unknown).unwrap();

        let mut rng = ScriptedRandomSource::new([2, 4]);
        let requester = Identity::from("passenger");
        let again = consensus.request_status(&flight(), &requester, &open_flights(), b"", &mut rng).unwrap();
        assert_eq!(again, RequestTicket { index: 2, reissued: true });
        assert_eq!(consensus.request(&flight(), 2).unwrap().total_responses(), 1);

        let other = consensus.request_status(&flight(), &requester, &open_flights(), b"", &mut rng).unwrap();
        assert_eq!(other, RequestTicket { index: 4, reissued: false });
        assert_eq!(consensus.pending_requests().count(), 2);

        for oracle in &ids[1..] {
            consensus.submit_response(&oracles, oracle, 2, &flight(), StatusCode::Unknown).unwrap();
        }
        assert_eq!(consensus.pending_requests().count(), 1);

        let mut rng = ScriptedRandomSource::new([2]);
        let fresh = consensus.request_status(&flight(), &requester, &open_flights(), b"", &mut rng).unwrap();
        assert_eq!(fresh, RequestTicket { index: 2, reissued: false });
        assert_eq!(consensus.request(&flight(), 2).unwrap().resolved, None);
    }

    #[test]
    fn test_prune_resolved() {
        let (oracles, ids) = oracles_on_index_two(3);
        let mut consensus = consensus_with_request(2);
        for oracle in &ids {
            consensus.submit_response(&oracles, oracle, 2, &flight(), StatusCode::OnTime).unwrap();
        }
        assert_eq!(consensus.prune_resolved(), 1);
        assert!(consensus.request(&flight(), 2).is_none());
    }

    proptest! {
        #[test]
        fn prop_resolution_fires_exactly_once_at_first_bucket_of_three(
            reports in proptest::collection::vec(0usize..StatusCode::ALL.len(), 1..12)
        ) {
            let (oracles, ids) = oracles_on_index_two(reports.len());
            let mut consensus = consensus_with_request(2);
            let mut tally: BTreeMap<StatusCode, usize> = BTreeMap::new();
            let mut winner: Option<StatusCode> = None;
            let mut resolutions = 0;

            for (oracle, code) in ids.iter().zip(reports) {
                let status = StatusCode::ALL[code];
                let outcome = consensus.submit_response(&oracles, oracle, 2, &flight(), status).unwrap();

                match winner {
                    Some(resolved) => {
                        prop_assert_eq!(outcome, ResponseOutcome::Ignored { resolved });
                    }
                    None => {
                        let count = tally.entry(status).or_insert(0);
                        *count += 1;
                        if *count == 3 {
                            prop_assert_eq!(outcome, ResponseOutcome::Resolved { status });
                            winner = Some(status);
                            resolutions += 1;
                        } else {
                            prop_assert_eq!(outcome, ResponseOutcome::Recorded { status, votes: *count });
                        }
                    }
                }
            }

            prop_assert!(resolutions <= 1);
            prop_assert_eq!(consensus.request(&flight(), 2).unwrap().resolved, winner);
        }
    }
}
