/// FLIGHT REGISTRY
///
/// Flights opened for insurance by funded airlines, and the status each one
/// was last resolved to.

use crate::InsuranceError;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use surety_core::{FlightDirectory, FlightKey, Identity, StatusCode};
use surety_governance::AirlineRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub key: FlightKey,
    pub open: bool,
    pub latest_status: StatusCode,
}

/// Effect of a resolution on a flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightUpdate {
    /// Status recorded; `closed` if this resolution closed the flight
    Applied { closed: bool },
    /// The flight already holds a terminal status; the first one stands
    AlreadyResolved { status: StatusCode },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightRegistry {
    flights: BTreeMap<FlightKey, Flight>,
}

impl FlightRegistry {
    pub fn new() -> Self {
        FlightRegistry::default()
    }

    /// Open a flight for insurance; the key's airline must be registered and funded.
    pub fn open(&mut self, airlines: &AirlineRegistry, key: FlightKey) -> Result<(), InsuranceError> {
        if !airlines.is_participant(&key.airline) {
            return Err(InsuranceError::NotFunded(key.airline.clone()));
        }
        if self.flights.contains_key(&key) {
            return Err(InsuranceError::AlreadyOpen(key));
        }

        info!("Flight {} opened [{}]", key, key.short_id());
        self.flights.insert(
            key.clone(),
            Flight { key, open: true, latest_status: StatusCode::Unknown },
        );
        Ok(())
    }

    pub fn is_open(&self, key: &FlightKey) -> bool {
        self.flights.get(key).map_or(false, |f| f.open)
    }

    pub fn flight(&self, key: &FlightKey) -> Option<&Flight> {
        self.flights.get(key)
    }

    /// Record an agreed status. Internal: driven only by status consensus.
    ///
    /// A manual close does not settle the flight: a request still pending
    /// when the airline closed it records its status once it resolves.
    pub fn apply_resolution(&mut self, key: &FlightKey, status: StatusCode) -> Result<FlightUpdate, InsuranceError> {
        let flight = self
            .flights
            .get_mut(key)
            .ok_or_else(|| InsuranceError::UnknownFlight(key.clone()))?;

        if flight.latest_status.is_terminal() {
            return Ok(FlightUpdate::AlreadyResolved { status: flight.latest_status });
        }
        if !status.is_terminal() {
            return Ok(FlightUpdate::Applied { closed: false });
        }

        flight.latest_status = status;
        let closed = flight.open;
        if closed {
            flight.open = false;
            info!("Flight {} closed with status {}", key, status);
        } else {
            info!("Flight {} closed by its airline resolved to {}", key, status);
        }
        Ok(FlightUpdate::Applied { closed })
    }

    /// Manually close a flight; only its airline may do so.
    pub fn close(&mut self, key: &FlightKey, caller: &Identity) -> Result<(), InsuranceError> {
        let flight = self
            .flights
            .get_mut(key)
            .ok_or_else(|| InsuranceError::UnknownFlight(key.clone()))?;
        if &flight.key.airline != caller {
            return Err(InsuranceError::NotFlightOwner(caller.clone()));
        }
        if !flight.open {
            return Err(InsuranceError::FlightNotOpen(key.clone()));
        }
        flight.open = false;
        info!("Flight {} closed by {}", key, caller);
        Ok(())
    }

}

impl FlightDirectory for FlightRegistry {
    fn is_open(&self, key: &FlightKey) -> bool {
        FlightRegistry::is_open(self, key)
    }
}
