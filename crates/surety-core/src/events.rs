/// OUTBOUND EVENT QUEUE
///
/// Events are appended by the platform and polled by external subscribers
/// (oracle responders, user interfaces) using a sequence cursor. Nothing is
/// pushed across the boundary; subscribers pull.

use crate::types::{FlightKey, Identity, Money, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum SuretyEvent {
    /// Oracles holding `index` should report the status of `flight`
    OracleRequest { index: u8, flight: FlightKey },
    /// One oracle's accepted report
    OracleReport { oracle: Identity, flight: FlightKey, status: StatusCode },
    /// Quorum reached on a request
    StatusResolved { index: u8, flight: FlightKey, status: StatusCode },
    AirlineRegistered { airline: Identity, votes: usize },
    AirlineVoted { candidate: Identity, voter: Identity, votes: usize, required: usize },
    AirlineFunded { airline: Identity, amount: Money, total: Money },
    OracleRegistered { oracle: Identity, indexes: Vec<u8> },
    FlightOpened { flight: FlightKey },
    FlightClosed { flight: FlightKey, status: StatusCode },
    PolicyPurchased { passenger: Identity, flight: FlightKey, premium: Money },
    PassengerCredited { passenger: Identity, flight: FlightKey, amount: Money },
    Withdrawn { account: Identity, amount: Money },
    OperatingStatusChanged { operational: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub event: SuretyEvent,
}

/// Append-only log with a monotonically increasing sequence number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventQueue {
    records: Vec<EventRecord>,
    next_sequence: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue::default()
    }

    pub fn publish(&mut self, event: SuretyEvent) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.records.push(EventRecord { sequence, event });
        sequence
    }

    /// Records with `sequence >= cursor`, oldest first.
    pub fn since(&self, cursor: u64) -> &[EventRecord] {
        let start = self.records.partition_point(|r| r.sequence < cursor);
        &self.records[start..]
    }

    /// Cursor a subscriber should poll from next to see only new events
    pub fn next_cursor(&self) -> u64 {
        self.next_sequence
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Discard records below `cursor`; sequence numbers are preserved.
    pub fn prune_before(&mut self, cursor: u64) {
        self.records.retain(|r| r.sequence >= cursor);
    }
}
