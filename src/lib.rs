/// FLIGHT SURETY
///
/// Flight-delay insurance engine:
/// - Airline admission by multi-party vote, gated by funding
/// - Oracle registration with pseudo-random index assignment
/// - First-quorum-wins flight status consensus
/// - Policy purchase, delay crediting and pull-based withdrawal
///
/// `FlightSurety` is the public surface. Each of its operations is one atomic
/// transition over the components in the `surety-*` crates.

pub mod config;
pub mod error;
pub mod shared;
pub mod simulator;
pub mod surety;

pub use error::{ErrorCategory, ErrorKind, SuretyError};
pub use shared::SharedSurety;
pub use simulator::{OracleSimulator, SimulatedOracle, SimulatorConfig};
pub use surety::FlightSurety;

pub use surety_core::{
    ether, format_ether, parse_amount, EventRecord, FlightKey, HashRandomSource, Identity, InMemorySubstrate,
    LedgerSubstrate, Money, RandomSource, ScriptedRandomSource, StatusCode, SuretyEvent, SuretyParams, TransferError,
};
pub use surety_governance::Admission;
pub use surety_insurance::{Flight, Policy};
pub use surety_oracle::{RequestTicket, ResponseOutcome, StatusRequest};
