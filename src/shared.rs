/// SERIALIZED SHARED HANDLE
///
/// Stands in for the ledger's atomic execution guarantee when several tasks
/// drive one platform: every call runs under the same lock, so no call ever
/// observes another call half-applied.

use crate::surety::FlightSurety;
use parking_lot::Mutex;
use std::sync::Arc;
use surety_core::LedgerSubstrate;

pub struct SharedSurety<S: LedgerSubstrate> {
    inner: Arc<Mutex<FlightSurety<S>>>,
}

impl<S: LedgerSubstrate> Clone for SharedSurety<S> {
    fn clone(&self) -> Self {
        SharedSurety { inner: Arc::clone(&self.inner) }
    }
}

impl<S: LedgerSubstrate> SharedSurety<S> {
    pub fn new(surety: FlightSurety<S>) -> Self {
        SharedSurety { inner: Arc::new(Mutex::new(surety)) }
    }

    /// Run one transition. Signer switch and command belong in the same closure.
    pub fn execute<R>(&self, call: impl FnOnce(&mut FlightSurety<S>) -> R) -> R {
        let mut surety = self.inner.lock();
        call(&mut surety)
    }

    /// Read the state as of the last completed transition.
    pub fn query<R>(&self, read: impl FnOnce(&FlightSurety<S>) -> R) -> R {
        let surety = self.inner.lock();
        read(&surety)
    }
}
