/// INSURANCE LEDGER
///
/// Flights opened by funded airlines, the policies passengers buy on them,
/// and the payouts those policies earn when a flight is delayed by its airline.

pub mod flight_registry;
pub mod policy_ledger;

use surety_core::{FlightKey, Identity, Money, SolvencyError, TransferError};
use thiserror::Error;

pub use flight_registry::{Flight, FlightRegistry, FlightUpdate};
pub use policy_ledger::{Credit, Policy, PolicyLedger};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InsuranceError {
    #[error("Airline {0} is not a registered, funded airline")]
    NotFunded(Identity),
    #[error("Flight {0} already exists")]
    AlreadyOpen(FlightKey),
    #[error("Flight {0} is not open")]
    FlightNotOpen(FlightKey),
    #[error("Flight {0} is unknown")]
    UnknownFlight(FlightKey),
    #[error("{0} does not operate this flight")]
    NotFlightOwner(Identity),
    #[error("Premium {premium} exceeds maximum {maximum}")]
    PremiumTooHigh { premium: Money, maximum: Money },
    #[error("Premium must be positive")]
    ZeroPremium,
    #[error("{passenger} already holds a policy for {flight}")]
    DuplicatePolicy { passenger: Identity, flight: FlightKey },
    #[error("{0} has no balance to withdraw")]
    NoBalance(Identity),
    #[error("Transfer failed: {0}")]
    TransferFailed(TransferError),
    #[error("Solvency error: {0}")]
    Solvency(#[from] SolvencyError),
}
