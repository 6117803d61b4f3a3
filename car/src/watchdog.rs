/// ----- SENSOR WATCHDOG -----
/// Every command that expects feedback from the hardware arms this
/// watchdog. A confirmation that does not arrive in time is retried, and
/// after too many consecutive misses the car is taken out of service.

use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    FloorArrival,
    DoorOpened,
    DoorClosed,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Expectation::FloorArrival => "floor arrival",
            Expectation::DoorOpened => "door opened",
            Expectation::DoorClosed => "door closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Quiet,
    Retry(Expectation),
    Failed(Expectation),
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    expectation: Expectation,
    window: Duration,
    deadline: Instant,
}

#[derive(Debug, Clone)]
pub struct SensorWatchdog {
    slack: Duration,
    max_missed: u8,
    missed: u8,
    pending: Option<Pending>,
}

impl SensorWatchdog {
    pub fn new(slack: Duration, max_missed: u8) -> Self {
        SensorWatchdog {
            slack,
            max_missed: max_missed.max(1),
            missed: 0,
            pending: None,
        }
    }

    /// Expect `expectation` within `window` (plus slack) from `now`.
    pub fn arm(&mut self, expectation: Expectation, window: Duration, now: Instant) {
        self.pending = Some(Pending {
            expectation,
            window,
            deadline: now + window + self.slack,
        });
    }

    /// Returns true when the sensor event was the one being waited for.
    pub fn confirm(&mut self, expectation: Expectation) -> bool {
        match self.pending {
            Some(pending) if pending.expectation == expectation => {
                self.pending = None;
                self.missed = 0;
                true
            }
            _ => false,
        }
    }

    pub fn disarm(&mut self) {
        self.pending = None;
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.missed = 0;
    }

    pub fn missed(&self) -> u8 {
        self.missed
    }

    pub fn poll(&mut self, now: Instant) -> Verdict {
        let Some(pending) = self.pending else {
            return Verdict::Quiet;
        };
        if now < pending.deadline {
            return Verdict::Quiet;
        }
        self.missed = self.missed.saturating_add(1);
        if self.missed >= self.max_missed {
            self.pending = None;
            Verdict::Failed(pending.expectation)
        } else {
            self.arm(pending.expectation, pending.window, now);
            Verdict::Retry(pending.expectation)
        }
    }
}
