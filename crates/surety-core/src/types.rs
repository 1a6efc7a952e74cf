/// SHARED LEDGER TYPES
///
/// Identities, monetary amounts, flight keys and the fixed status-code
/// enumeration used by every Flight Surety component.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Amount of native currency, in its smallest unit (wei).
pub type Money = u128;

/// One unit of native currency (1 ether = 10^18 wei).
pub const ETHER: Money = 1_000_000_000_000_000_000;

/// 10^9 wei.
pub const GWEI: Money = 1_000_000_000;

/// Whole units of native currency.
pub const fn ether(units: u64) -> Money {
    units as Money * ETHER
}

/// Account identity as seen by the ledger substrate (an address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Identity(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Identity(id.to_string())
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Identity(id)
    }
}

/// Composite flight key `(airline, flight code, scheduled timestamp)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlightKey {
    pub airline: Identity,
    pub flight_code: String,
    pub timestamp: u64,
}

impl FlightKey {
    pub fn new(airline: impl Into<Identity>, flight_code: impl Into<String>, timestamp: u64) -> Self {
        FlightKey {
            airline: airline.into(),
            flight_code: flight_code.into(),
            timestamp,
        }
    }

    /// Stable digest of the key, used when logging and when seeding request indexes
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.airline.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.flight_code.as_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        hasher.finalize().into()
    }

    /// Short hex form of the digest
    pub fn short_id(&self) -> String {
        hex::encode(&self.digest()[..6])
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.airline, self.flight_code, self.timestamp)
    }
}

/// Flight status as reported by oracles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum StatusCode {
    Unknown = 0,
    OnTime = 10,
    LateAirline = 20,
    LateWeather = 30,
    LateTechnical = 40,
    LateOther = 50,
}

impl StatusCode {
    /// Every recognized code, in ascending numeric order
    pub const ALL: [StatusCode; 6] = [
        StatusCode::Unknown,
        StatusCode::OnTime,
        StatusCode::LateAirline,
        StatusCode::LateWeather,
        StatusCode::LateTechnical,
        StatusCode::LateOther,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        StatusCode::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Resolution to this code closes the flight.
    pub fn is_terminal(self) -> bool {
        !matches!(self, StatusCode::Unknown)
    }

    /// Delay attributable to the airline; the only code that pays passengers.
    pub fn triggers_payout(self) -> bool {
        matches!(self, StatusCode::LateAirline)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Unknown => "UNKNOWN",
            StatusCode::OnTime => "ON_TIME",
            StatusCode::LateAirline => "LATE_AIRLINE",
            StatusCode::LateWeather => "LATE_WEATHER",
            StatusCode::LateTechnical => "LATE_TECHNICAL",
            StatusCode::LateOther => "LATE_OTHER",
        };
        write!(f, "{}({})", name, self.code())
    }
}

impl From<StatusCode> for u8 {
    fn from(status: StatusCode) -> u8 {
        status.code()
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        StatusCode::from_code(code).ok_or_else(|| format!("unrecognized status code {}", code))
    }
}

/// Read-only view of flight state, implemented by the flight registry.
pub trait FlightDirectory {
    fn is_open(&self, key: &FlightKey) -> bool;
}
