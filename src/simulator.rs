/// ORACLE RESPONDER SIMULATOR
///
/// Off-ledger oracle fleet for local runs: registers a set of oracles, then
/// polls the event queue and answers every `OracleRequest` with one report
/// per oracle holding the requested index. Reports are random unless a fixed
/// status is configured.

use crate::shared::SharedSurety;
use crate::SuretyError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::time::Duration;
use surety_core::{FlightKey, Identity, InMemorySubstrate, StatusCode, SuretyEvent};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_ORACLE_COUNT: usize = 30;

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub oracle_count: usize,
    /// Report this status instead of a random one
    pub fixed_status: Option<StatusCode>,
    pub poll_interval: Duration,
    /// Seed for the status picker; `None` seeds from OS entropy
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            oracle_count: DEFAULT_ORACLE_COUNT,
            fixed_status: None,
            poll_interval: Duration::from_millis(100),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedOracle {
    pub identity: Identity,
    pub indexes: Vec<u8>,
}

pub struct OracleSimulator {
    surety: SharedSurety<InMemorySubstrate>,
    oracles: Vec<SimulatedOracle>,
    fixed_status: Option<StatusCode>,
    poll_interval: Duration,
    rng: StdRng,
    cursor: u64,
}

impl OracleSimulator {
    /// Register `config.oracle_count` oracles, minting each its registration fee.
    /// Only requests published after this call are answered.
    pub fn register(surety: SharedSurety<InMemorySubstrate>, config: SimulatorConfig) -> Result<Self, SuretyError> {
        let fee = surety.query(|s| s.params().registration_fee);
        let mut oracles = Vec::with_capacity(config.oracle_count);

        for n in 0..config.oracle_count {
            let identity = Identity::new(format!("oracle-{:02}", n));
            let indexes = surety.execute(|s| {
                s.substrate_mut().mint(identity.clone(), fee);
                s.sign_as(identity.clone()).register_oracle(fee)
            })?;
            debug!(oracle = %identity, ?indexes, "oracle registered");
            oracles.push(SimulatedOracle { identity, indexes });
        }
        info!("Registered {} simulated oracles", oracles.len());

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let cursor = surety.query(|s| s.next_event_cursor());

        Ok(OracleSimulator {
            surety,
            oracles,
            fixed_status: config.fixed_status,
            poll_interval: config.poll_interval,
            rng,
            cursor,
        })
    }

    pub fn oracles(&self) -> &[SimulatedOracle] {
        &self.oracles
    }

    fn pick_status(&mut self) -> StatusCode {
        match self.fixed_status {
            Some(status) => status,
            None => StatusCode::ALL
                .choose(&mut self.rng)
                .copied()
                .unwrap_or(StatusCode::Unknown),
        }
    }

    /// Answer every request published since the last poll.
    /// Returns the number of reports the platform accepted.
    pub fn poll(&mut self) -> usize {
        let cursor = self.cursor;
        let (requests, next) = self.surety.query(|s| {
            let requests: Vec<(u8, FlightKey)> = s
                .events_since(cursor)
                .iter()
                .filter_map(|record| match &record.event {
                    SuretyEvent::OracleRequest { index, flight } => Some((*index, flight.clone())),
                    _ => None,
                })
                .collect();
            (requests, s.next_event_cursor())
        });
        self.cursor = next;

        let mut accepted = 0;
        for (index, flight) in requests {
            let holders: Vec<Identity> = self
                .oracles
                .iter()
                .filter(|o| o.indexes.contains(&index))
                .map(|o| o.identity.clone())
                .collect();
            debug!(%flight, index, holders = holders.len(), "answering status request");

            for oracle in holders {
                let status = self.pick_status();
                let result = self
                    .surety
                    .execute(|s| s.sign_as(oracle.clone()).submit_response(index, &flight, status));
                match result {
                    Ok(outcome) => {
                        debug!(%oracle, %status, ?outcome, "report submitted");
                        accepted += 1;
                    }
                    Err(e) => warn!("Report from {} for {} rejected: {}", oracle, flight, e),
                }
            }
        }
        accepted
    }

    /// Poll until `shutdown` flips to true or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> usize {
        let mut ticker = tokio::time::interval(self.poll_interval);
        let mut total = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    total += self.poll();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Oracle simulator stopped after {} accepted report(s)", total);
        total
    }

    /// Run on the tokio runtime; send `true` on the returned channel to stop.
    pub fn spawn(self) -> (JoinHandle<usize>, watch::Sender<bool>) {
        let (stop, shutdown) = watch::channel(false);
        (tokio::spawn(self.run(shutdown)), stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlightSurety;
    use surety_core::{ether, ScriptedRandomSource, SuretyParams};

    /// Six oracles on indexes [0, 1, 2]; the first request draws index 1.
    fn fixture() -> (SharedSurety<InMemorySubstrate>, FlightKey) {
        let mut script = Vec::new();
        for _ in 0..6 {
            script.extend([0, 1, 2]);
        }
        script.push(1);

        let mut substrate = InMemorySubstrate::new("owner");
        substrate.mint("airline-1", ether(50));
        substrate.mint("passenger-1", ether(2));
        let mut surety = FlightSurety::deploy(substrate, SuretyParams::default(), Identity::from("airline-1"))
            .unwrap()
            .with_random_source(Box::new(ScriptedRandomSource::new(script)));
        surety.sign_as("airline-1").fund(ether(10)).unwrap();
        let key = surety.open_flight("IN707", 1_700_000_000).unwrap();
        surety.sign_as("passenger-1").buy_policy(&key, ether(1)).unwrap();
        (SharedSurety::new(surety), key)
    }

    fn config(count: usize) -> SimulatorConfig {
        SimulatorConfig {
            oracle_count: count,
            fixed_status: Some(StatusCode::LateAirline),
            poll_interval: Duration::from_millis(5),
            seed: Some(7),
        }
    }

    #[test]
    fn test_register_assigns_indexes_and_collects_fees() {
        let (shared, _) = fixture();
        let simulator = OracleSimulator::register(shared.clone(), config(6)).unwrap();
        assert_eq!(simulator.oracles().len(), 6);
        assert!(simulator.oracles().iter().all(|o| o.indexes == vec![0, 1, 2]));
        assert_eq!(shared.query(|s| s.oracle_count()), 6);
        assert_eq!(shared.query(|s| s.pool().fees_collected), ether(6));
    }

    #[test]
    fn test_poll_resolves_and_credits() {
        let (shared, key) = fixture();
        let mut simulator = OracleSimulator::register(shared.clone(), config(6)).unwrap();
        assert_eq!(simulator.poll(), 0);

        let ticket = shared.execute(|s| s.sign_as("passenger-1").request_status(&key)).unwrap();
        assert_eq!(ticket.index, 1);

        // Three reports resolve; the three stragglers are accepted and ignored
        assert_eq!(simulator.poll(), 6);
        assert!(!shared.query(|s| s.is_open(&key)));
        assert_eq!(shared.query(|s| s.balance_of(&Identity::from("passenger-1"))), ether(3) / 2);
        assert_eq!(simulator.poll(), 0);
    }

    #[test]
    fn test_random_status_is_recognized() {
        let (shared, _) = fixture();
        let mut simulator = OracleSimulator::register(
            shared,
            SimulatorConfig { fixed_status: None, ..config(1) },
        )
        .unwrap();
        for _ in 0..20 {
            assert!(StatusCode::ALL.contains(&simulator.pick_status()));
        }
    }

    #[tokio::test]
    async fn test_spawned_simulator_answers_requests() {
        let (shared, key) = fixture();
        let simulator = OracleSimulator::register(shared.clone(), config(6)).unwrap();
        let (handle, stop) = simulator.spawn();

        shared.execute(|s| s.sign_as("passenger-1").request_status(&key)).unwrap();
        for _ in 0..200 {
            if !shared.query(|s| s.is_open(&key)) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        stop.send(true).unwrap();
        let accepted = handle.await.unwrap();
        assert_eq!(accepted, 6);
        assert_eq!(
            shared.query(|s| s.flight(&key).map(|f| f.latest_status)),
            Some(StatusCode::LateAirline)
        );
    }
}
