/// ----- DOORS MODULE -----
/// Keeps track of how long the doors have been open, to generate the
/// door closing event for the state machine.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct DoorTimer {
    dwell: Duration,
    closes_at: Option<Instant>,
}

impl DoorTimer {
    pub fn new(dwell: Duration) -> Self {
        DoorTimer {
            dwell,
            closes_at: None,
        }
    }

    /// Doors are fully open: start the dwell period.
    pub fn start(&mut self, now: Instant) {
        self.closes_at = Some(now + self.dwell);
    }

    /// Close button: close on the next tick.
    pub fn request_close(&mut self, now: Instant) {
        self.closes_at = Some(now);
    }

    /// Keep the doors open for another full dwell period.
    pub fn hold(&mut self, now: Instant) {
        self.start(now);
    }

    pub fn expired(&self, now: Instant) -> bool {
        self.closes_at.map_or(false, |closes_at| now >= closes_at)
    }

    pub fn clear(&mut self) {
        self.closes_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_after_dwell() {
        let now = Instant::now();
        let mut timer = DoorTimer::new(Duration::from_secs(3));
        assert!(!timer.expired(now));
        timer.start(now);
        assert!(!timer.expired(now + Duration::from_secs(2)));
        assert!(timer.expired(now + Duration::from_secs(3)));
    }

    #[test]
    fn close_request_cuts_the_dwell_short() {
        let now = Instant::now();
        let mut timer = DoorTimer::new(Duration::from_secs(3));
        timer.start(now);
        timer.request_close(now);
        assert!(timer.expired(now));
        timer.clear();
        assert!(!timer.expired(now + Duration::from_secs(10)));
    }
}
