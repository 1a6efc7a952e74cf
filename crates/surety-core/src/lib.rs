/// FLIGHT SURETY CORE
///
/// Shared vocabulary for the Flight Surety engine:
/// - Identities, money, flight keys and the fixed status-code set
/// - Protocol parameters with their canonical defaults
/// - The `LedgerSubstrate` seam (signer, transfers, entropy)
/// - The injected `RandomSource` used for index selection
/// - The outbound event queue polled by oracle responders
/// - Solvency accounting shared by airline funding and the policy ledger

pub mod types;
pub mod units;
pub mod params;
pub mod substrate;
pub mod random;
pub mod events;
pub mod solvency;

// Re-export key types for easy access
pub use types::{ether, FlightDirectory, FlightKey, Identity, Money, StatusCode, ETHER, GWEI};

pub use units::{format_ether, parse_amount, UnitError};

pub use params::{ParamsError, SuretyParams};

pub use substrate::{InMemorySubstrate, LedgerSubstrate, TransferError};

pub use random::{HashRandomSource, RandomSource, ScriptedRandomSource};

pub use events::{EventQueue, EventRecord, SuretyEvent};

pub use solvency::{SolvencyError, SolvencyPool};
