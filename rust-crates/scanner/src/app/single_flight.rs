use crate::{
    Error,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    sync::atomic::{
        AtomicBool,
        Ordering,
    },
};

#[derive(PartialEq, Eq, Debug, Copy, Clone, Serialize, Deserialize)]
pub enum ScanKind {
    Owned,
    Market,
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanKind::Owned => "owned tokens",
            ScanKind::Market => "market",
        };
        write!(f, "{name}")
    }
}

/// At most one scan of a kind runs at a time; a second one is rejected.
#[derive(Debug)]
pub struct SingleFlight {
    kind: ScanKind,
    in_flight: AtomicBool,
}

impl SingleFlight {
    pub fn new(kind: ScanKind) -> Self {
        Self {
            kind,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn try_begin(&self) -> Result<FlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::ScanInProgress(self.kind))?;
        Ok(FlightGuard { flight: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the flight when dropped, including when the scan future is dropped early.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    flight: &'a SingleFlight,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flight.in_flight.store(false, Ordering::Release);
    }
}
