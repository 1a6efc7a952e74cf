// Airline governance: participation, funding and multiparty admission
pub mod airline_registry;

pub use airline_registry::{Admission, Airline, AirlineRegistry, GovernanceError};
