/// ----- REBALANCE MODULE -----
/// Spreads idle cars over the shaft. A car that has rested away from its
/// home floor for long enough is asked to park there, unless another car
/// already covers that floor.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use shared_resources::car_status::{CarState, CarStatus, DoorState};
use shared_resources::ids::{CarId, Floor};

#[derive(Debug, Clone)]
pub struct Rebalancer {
    homes: BTreeMap<CarId, Floor>,
    after: Duration,
    resting_since: BTreeMap<CarId, Instant>,
}

fn is_resting(status: &CarStatus) -> bool {
    status.state == CarState::Idle
        && status.door_state == DoorState::Closed
        && status.parking.is_none()
        && !status.has_stops()
}

impl Rebalancer {
    pub fn new(homes: BTreeMap<CarId, Floor>, after: Duration) -> Self {
        Rebalancer {
            homes,
            after,
            resting_since: BTreeMap::new(),
        }
    }

    /// Starts or stops the rest timer of the car behind `status`.
    pub fn observe(&mut self, status: &CarStatus, has_assignments: bool, now: Instant) {
        if is_resting(status) && !has_assignments {
            self.resting_since.entry(status.car).or_insert(now);
        } else {
            self.resting_since.remove(&status.car);
        }
    }

    pub fn busy(&mut self, car: CarId) {
        self.resting_since.remove(&car);
    }

    /// Park commands due at `now`, in car id order.
    pub fn plan(&mut self, cars: &BTreeMap<CarId, CarStatus>, now: Instant) -> Vec<(CarId, Floor)> {
        let mut moves = Vec::new();
        for (car, since) in self.resting_since.iter_mut() {
            if now.saturating_duration_since(*since) < self.after {
                continue;
            }
            let (Some(home), Some(status)) = (self.homes.get(car).copied(), cars.get(car)) else {
                continue;
            };
            if status.floor == home {
                continue;
            }
            let covered = cars.values().any(|other| {
                other.car != *car
                    && (other.parking == Some(home)
                        || (other.floor == home && other.state == CarState::Idle))
            }) || moves.iter().any(|(_, floor)| *floor == home);
            if covered {
                continue;
            }
            *since = now;
            moves.push((*car, home));
        }
        moves
    }
}
