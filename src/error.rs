/// PLATFORM ERRORS
///
/// `SuretyError` wraps the component errors; `ErrorKind` flattens them into
/// the caller-facing taxonomy so interfaces can branch on the exact failure.

use serde::{Deserialize, Serialize};
use surety_core::{Identity, ParamsError, SolvencyError, TransferError};
use surety_governance::GovernanceError;
use surety_insurance::InsuranceError;
use surety_oracle::OracleError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SuretyError {
    #[error("Contract is not operational")]
    NotOperational,
    #[error("{0} is not the contract owner")]
    NotContractOwner(Identity),
    #[error("Payment attached to the call failed: {0}")]
    PaymentFailed(TransferError),
    #[error("Governance error: {0}")]
    Governance(#[from] GovernanceError),
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
    #[error("Insurance error: {0}")]
    Insurance(#[from] InsuranceError),
    #[error("Parameter error: {0}")]
    Params(#[from] ParamsError),
    #[error("Solvency error: {0}")]
    Solvency(#[from] SolvencyError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    Authorization,
    State,
    Validation,
    Resource,
    Lookup,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    // Authorization
    NotFunded,
    NotRegistered,
    NotContractOwner,
    NotFlightOwner,
    // State
    NotOperational,
    AlreadyRegistered,
    AlreadyBootstrapped,
    AlreadyOpen,
    FlightNotOpen,
    AlreadyResolved,
    DuplicatePolicy,
    DuplicateVote,
    DuplicateResponse,
    // Validation
    PremiumTooHigh,
    ZeroPremium,
    InsufficientFund,
    FundCapExceeded,
    InsufficientFee,
    IndexMismatch,
    InvalidParams,
    // Resource
    NoBalance,
    TransferFailed,
    PaymentFailed,
    // Lookup
    RequestNotFound,
    UnknownFlight,
    // Internal
    SolvencyViolation,
}

impl ErrorKind {
    pub fn category(self) -> ErrorCategory {
        use ErrorKind::*;
        match self {
            NotFunded | NotRegistered | NotContractOwner | NotFlightOwner => ErrorCategory::Authorization,
            NotOperational | AlreadyRegistered | AlreadyBootstrapped | AlreadyOpen | FlightNotOpen
            | AlreadyResolved | DuplicatePolicy | DuplicateVote | DuplicateResponse => ErrorCategory::State,
            PremiumTooHigh | ZeroPremium | InsufficientFund | FundCapExceeded | InsufficientFee
            | IndexMismatch | InvalidParams => ErrorCategory::Validation,
            NoBalance | TransferFailed | PaymentFailed => ErrorCategory::Resource,
            RequestNotFound | UnknownFlight => ErrorCategory::Lookup,
            SolvencyViolation => ErrorCategory::Internal,
        }
    }
}

impl SuretyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SuretyError::NotOperational => ErrorKind::NotOperational,
            SuretyError::NotContractOwner(_) => ErrorKind::NotContractOwner,
            SuretyError::PaymentFailed(_) => ErrorKind::PaymentFailed,
            SuretyError::Params(_) => ErrorKind::InvalidParams,
            SuretyError::Solvency(_) => ErrorKind::SolvencyViolation,
            SuretyError::Governance(e) => match e {
                GovernanceError::NotFunded(_) => ErrorKind::NotFunded,
                GovernanceError::NotRegistered(_) => ErrorKind::NotRegistered,
                GovernanceError::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
                GovernanceError::DuplicateVote { .. } => ErrorKind::DuplicateVote,
                GovernanceError::InsufficientFund { .. } => ErrorKind::InsufficientFund,
                GovernanceError::FundCapExceeded { .. } => ErrorKind::FundCapExceeded,
                GovernanceError::AlreadyBootstrapped => ErrorKind::AlreadyBootstrapped,
                GovernanceError::Solvency(_) => ErrorKind::SolvencyViolation,
            },
            SuretyError::Oracle(e) => match e {
                OracleError::InsufficientFee { .. } => ErrorKind::InsufficientFee,
                OracleError::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
                OracleError::NotRegistered(_) => ErrorKind::NotRegistered,
                OracleError::IndexMismatch { .. } => ErrorKind::IndexMismatch,
                OracleError::RequestNotFound(_) => ErrorKind::RequestNotFound,
                OracleError::AlreadyResolved(_) => ErrorKind::AlreadyResolved,
                OracleError::DuplicateResponse(_) => ErrorKind::DuplicateResponse,
                OracleError::FlightNotOpen(_) => ErrorKind::FlightNotOpen,
                OracleError::Solvency(_) => ErrorKind::SolvencyViolation,
            },
            SuretyError::Insurance(e) => match e {
                InsuranceError::NotFunded(_) => ErrorKind::NotFunded,
                InsuranceError::AlreadyOpen(_) => ErrorKind::AlreadyOpen,
                InsuranceError::FlightNotOpen(_) => ErrorKind::FlightNotOpen,
                InsuranceError::UnknownFlight(_) => ErrorKind::UnknownFlight,
                InsuranceError::NotFlightOwner(_) => ErrorKind::NotFlightOwner,
                InsuranceError::PremiumTooHigh { .. } => ErrorKind::PremiumTooHigh,
                InsuranceError::ZeroPremium => ErrorKind::ZeroPremium,
                InsuranceError::DuplicatePolicy { .. } => ErrorKind::DuplicatePolicy,
                InsuranceError::NoBalance(_) => ErrorKind::NoBalance,
                InsuranceError::TransferFailed(_) => ErrorKind::TransferFailed,
                InsuranceError::Solvency(_) => ErrorKind::SolvencyViolation,
            },
        }
    }
}
