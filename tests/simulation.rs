use flight_surety::{
    ether, FlightKey, FlightSurety, Identity, InMemorySubstrate, OracleSimulator, ScriptedRandomSource,
    SharedSurety, SimulatorConfig, StatusCode, SuretyEvent, SuretyParams,
};
use std::time::Duration;

/// Insured flights on a funded airline. Index draws replay `script`, then
/// fall back to hashing.
fn platform(flights: usize, script: Vec<u8>) -> (SharedSurety<InMemorySubstrate>, Vec<FlightKey>) {
    let mut substrate = InMemorySubstrate::new("owner");
    substrate.mint("airline-1", ether(50));
    substrate.mint("passenger-1", ether(10));
    let mut surety = FlightSurety::deploy(substrate, SuretyParams::default(), Identity::from("airline-1"))
        .unwrap()
        .with_random_source(Box::new(ScriptedRandomSource::new(script)));
    surety.sign_as("airline-1").fund(ether(50)).unwrap();

    let mut keys = Vec::new();
    for n in 0..flights {
        let key = surety.sign_as("airline-1").open_flight(&format!("SR{}", 100 + n), 1_700_000_000).unwrap();
        surety.sign_as("passenger-1").buy_policy(&key, ether(1)).unwrap();
        keys.push(key);
    }
    (SharedSurety::new(surety), keys)
}

#[tokio::test]
async fn test_random_reports_preserve_invariants() {
    let (shared, keys) = platform(4, Vec::new());
    let config = SimulatorConfig {
        poll_interval: Duration::from_millis(2),
        seed: Some(2024),
        ..SimulatorConfig::default()
    };
    let simulator = OracleSimulator::register(shared.clone(), config).unwrap();
    assert_eq!(simulator.oracles().len(), 30);
    let (handle, stop) = simulator.spawn();

    for _round in 0..5 {
        for key in &keys {
            if shared.query(|s| s.is_open(key)) {
                shared.execute(|s| s.sign_as("passenger-1").request_status(key)).unwrap();
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    stop.send(true).unwrap();
    handle.await.unwrap();

    shared.query(|s| {
        assert!(s.verify_solvency().is_ok());
        let mut credited: u128 = 0;
        for record in s.events_since(0) {
            match &record.event {
                SuretyEvent::StatusResolved { index, flight, .. } => {
                    // A later request under the same index may have replaced this one
                    let request = s.request(flight, *index).unwrap();
                    if let Some(resolved) = request.resolved {
                        assert_eq!(request.votes_for(resolved), 3);
                    }
                }
                SuretyEvent::PassengerCredited { amount, .. } => {
                    assert_eq!(*amount, ether(3) / 2);
                    credited += *amount;
                }
                _ => {}
            }
        }
        assert_eq!(s.balance_of(&Identity::from("passenger-1")), credited);

        for key in &keys {
            let flight = s.flight(key).unwrap();
            let paid = s.policy(&Identity::from("passenger-1"), key).unwrap().payout_credited > 0;
            assert_eq!(paid, !flight.open && flight.latest_status == StatusCode::LateAirline);
        }
    });
}

#[test]
fn test_fixed_status_closes_every_flight() {
    // Six oracles all holding [0, 1, 2]; the three requests draw 0, 1 and 2
    let mut script = [0u8, 1, 2].repeat(6);
    script.extend([0, 1, 2]);
    let (shared, keys) = platform(3, script);
    let config = SimulatorConfig {
        oracle_count: 6,
        fixed_status: Some(StatusCode::OnTime),
        seed: Some(1),
        ..SimulatorConfig::default()
    };
    let mut simulator = OracleSimulator::register(shared.clone(), config).unwrap();
    assert!(simulator.oracles().iter().all(|o| o.indexes == vec![0, 1, 2]));

    tokio_test::block_on(async {
        for (key, index) in keys.iter().zip(0u8..) {
            let ticket = shared.execute(|s| s.sign_as("passenger-1").request_status(key)).unwrap();
            assert_eq!(ticket.index, index);
        }
        tokio::task::yield_now().await;
        // Three reports resolve each request; the remaining holders are absorbed
        assert_eq!(simulator.poll(), 18);
    });

    shared.query(|s| {
        for key in &keys {
            let flight = s.flight(key).unwrap();
            assert!(!flight.open);
            assert_eq!(flight.latest_status, StatusCode::OnTime);
        }
        assert!(s.pending_requests().is_empty());
        assert_eq!(s.balance_of(&Identity::from("passenger-1")), 0);
    });
}
