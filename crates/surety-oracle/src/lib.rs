/// ORACLE REQUEST/RESPONSE PROTOCOL
///
/// Independent oracles register for a small set of indexes. A status check
/// targets one index; only oracles holding it may answer, and the first
/// status reported by a quorum of them becomes the agreed status.

pub mod oracle_registry;
pub mod status_consensus;

use surety_core::{FlightKey, Identity, Money, SolvencyError, StatusCode};
use thiserror::Error;

pub use oracle_registry::{Oracle, OracleRegistry};
pub use status_consensus::{RequestTicket, ResponseOutcome, StatusConsensus, StatusRequest};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    #[error("Registration fee {offered} below required {required}")]
    InsufficientFee { offered: Money, required: Money },
    #[error("Oracle {0} already registered")]
    AlreadyRegistered(Identity),
    #[error("Oracle {0} not registered")]
    NotRegistered(Identity),
    #[error("Index {index} does not match a request answerable by oracle {oracle}")]
    IndexMismatch { oracle: Identity, index: u8 },
    #[error("No status request for flight {0}")]
    RequestNotFound(FlightKey),
    #[error("Request already resolved to {0}")]
    AlreadyResolved(StatusCode),
    #[error("Oracle {0} already responded to this request")]
    DuplicateResponse(Identity),
    #[error("Flight {0} is not open")]
    FlightNotOpen(FlightKey),
    #[error("Solvency error: {0}")]
    Solvency(#[from] SolvencyError),
}
