/// ----- COST MODULE -----
/// Estimates how long a car would take to reach a hall call. Cars are
/// ranked by tier first, so a car already heading for the call beats an
/// idle one, and by estimated time within a tier.

use std::collections::BTreeSet;
use std::time::Duration;

use shared_resources::car_status::CarStatus;
use shared_resources::config::{BuildingTopology, ControlSettings};
use shared_resources::direction::Direction;
use shared_resources::ids::Floor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    /// Heading toward the call in its direction and not yet past it.
    Approaching,
    /// Nothing to do.
    Idle,
    /// Has to finish its current sweep first.
    Detour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    pub tier: Tier,
    pub time: Duration,
}

/// What the dispatcher knows about a car when scoring it: its last status
/// and every floor it has been asked to stop at.
#[derive(Debug, Clone, Copy)]
pub struct CarView<'a> {
    pub status: &'a CarStatus,
    pub stops: &'a BTreeSet<Floor>,
}

impl CarView<'_> {
    /// Direction of travel, or of the nearest stop for a car that has work
    /// but has not left yet.
    pub fn heading(&self) -> Direction {
        if self.status.direction != Direction::Stop {
            return self.status.direction;
        }
        let floor = self.status.floor;
        self.stops
            .iter()
            .copied()
            .filter(|stop| *stop != floor)
            .min_by_key(|stop| (stop.abs_diff(floor), *stop))
            .map_or(Direction::Stop, |stop| Direction::between(floor, stop))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostModel {
    floor_travel: Duration,
    stop_time: Duration,
}

impl CostModel {
    pub fn new(topology: &BuildingTopology, control: &ControlSettings) -> Self {
        CostModel {
            floor_travel: topology.floor_travel_time,
            stop_time: control.door_dwell + topology.door_cycle_time * 2,
        }
    }

    fn travel(&self, floors: u8) -> Duration {
        self.floor_travel * u32::from(floors)
    }

    fn stops(&self, count: usize) -> Duration {
        self.stop_time * u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// `None` for a car that cannot take calls at all.
    pub fn estimate(&self, car: CarView<'_>, origin: Floor, direction: Direction) -> Option<Estimate> {
        let status = car.status;
        if status.state.is_halted() {
            return None;
        }
        let floor = status.floor;
        let heading = car.heading();

        if heading == Direction::Stop {
            return Some(Estimate {
                tier: Tier::Idle,
                time: self.travel(floor.abs_diff(origin)),
            });
        }

        let not_yet_past = heading.is_ahead(floor, origin) || (origin == floor && !status.state.is_moving());
        if heading == direction && not_yet_past {
            let on_the_way = car
                .stops
                .iter()
                .filter(|stop| heading.is_ahead(floor, **stop) && heading.is_ahead(**stop, origin))
                .count();
            return Some(Estimate {
                tier: Tier::Approaching,
                time: self.travel(floor.abs_diff(origin)) + self.stops(on_the_way),
            });
        }

        let farthest = car
            .stops
            .iter()
            .copied()
            .filter(|stop| heading.is_ahead(floor, *stop))
            .max_by_key(|stop| stop.abs_diff(floor))
            .unwrap_or(floor);
        let floors = farthest.abs_diff(floor).saturating_add(farthest.abs_diff(origin));
        Some(Estimate {
            tier: Tier::Detour,
            time: self.travel(floors) + self.stops(car.stops.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use shared_resources::car_status::{CarState, DoorState};
    use shared_resources::ids::CarId;

    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[fixture]
    fn model() -> CostModel {
        CostModel {
            floor_travel: SECOND,
            stop_time: SECOND * 5,
        }
    }

    fn status(floor: Floor, direction: Direction, state: CarState) -> CarStatus {
        CarStatus {
            car: CarId(1),
            floor,
            direction,
            state,
            door_state: DoorState::Closed,
            load: 0,
            capacity: 8,
            overloaded: false,
            up_stops: Vec::new(),
            down_stops: Vec::new(),
            parking: None,
        }
    }

    fn stops(floors: &[Floor]) -> BTreeSet<Floor> {
        floors.iter().copied().collect()
    }

    #[rstest]
    fn idle_car_costs_its_distance(model: CostModel) {
        let status = status(2, Direction::Stop, CarState::Idle);
        let stops = stops(&[]);
        let estimate = model.estimate(CarView { status: &status, stops: &stops }, 6, Direction::Down);
        assert_eq!(estimate, Some(Estimate { tier: Tier::Idle, time: SECOND * 4 }));
    }

    #[rstest]
    fn approaching_car_counts_stops_on_the_way(model: CostModel) {
        let status = status(1, Direction::Up, CarState::MovingUp);
        let stops = stops(&[3, 8]);
        let estimate = model.estimate(CarView { status: &status, stops: &stops }, 5, Direction::Up);
        assert_eq!(estimate, Some(Estimate { tier: Tier::Approaching, time: SECOND * 4 + SECOND * 5 }));
    }

    #[rstest]
    #[case::wrong_direction(5, Direction::Down)]
    #[case::already_past(0, Direction::Up)]
    fn other_calls_pay_the_detour(model: CostModel, #[case] origin: Floor, #[case] direction: Direction) {
        let status = status(2, Direction::Up, CarState::MovingUp);
        let stops = stops(&[7]);
        let estimate = model
            .estimate(CarView { status: &status, stops: &stops }, origin, direction)
            .unwrap();
        assert_eq!(estimate.tier, Tier::Detour);
        let floors = 5 + u32::from(origin.abs_diff(7));
        assert_eq!(estimate.time, SECOND * floors + SECOND * 5);
    }

    #[rstest]
    fn moving_car_at_the_origin_has_passed_it(model: CostModel) {
        let status = status(4, Direction::Up, CarState::MovingUp);
        let stops = stops(&[6]);
        let estimate = model
            .estimate(CarView { status: &status, stops: &stops }, 4, Direction::Up)
            .unwrap();
        assert_eq!(estimate.tier, Tier::Detour);
    }

    #[rstest]
    fn idle_car_with_work_heads_to_its_nearest_stop(model: CostModel) {
        let status = status(1, Direction::Stop, CarState::Idle);
        let stops = stops(&[3]);
        let view = CarView { status: &status, stops: &stops };
        assert_eq!(view.heading(), Direction::Up);
        let estimate = model.estimate(view, 1, Direction::Down).unwrap();
        assert_eq!(estimate.tier, Tier::Detour);
        assert_eq!(estimate.time, SECOND * 4 + SECOND * 5);
    }

    #[rstest]
    #[case(CarState::OutOfService)]
    #[case(CarState::EmergencyStop)]
    fn halted_cars_are_not_eligible(model: CostModel, #[case] state: CarState) {
        let status = status(1, Direction::Stop, state);
        let stops = stops(&[]);
        assert_eq!(model.estimate(CarView { status: &status, stops: &stops }, 2, Direction::Up), None);
    }
}
