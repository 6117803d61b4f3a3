use std::time::Instant;

use crate::call::Call;
use crate::config::BuildingTopology;
use crate::direction::Direction;
use crate::error::{RequestError, RequestResult};
use crate::ids::{Floor, RequestId};

/// A desire to travel. Hall calls know only their origin and direction,
/// car calls know their destination as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: RequestId,
    pub origin: Floor,
    pub destination: Option<Floor>,
    pub direction: Direction,
    pub created_at: Instant,
}

impl Request {
    pub fn hall_call(
        id: RequestId,
        floor: Floor,
        direction: Direction,
        topology: &BuildingTopology,
    ) -> RequestResult<Self> {
        if !topology.contains(floor) {
            return Err(RequestError::FloorOutOfRange(floor));
        }
        if direction == Direction::Stop {
            return Err(RequestError::MissingDirection);
        }
        Ok(Request {
            id,
            origin: floor,
            destination: None,
            direction,
            created_at: Instant::now(),
        })
    }

    pub fn car_call(
        id: RequestId,
        origin: Floor,
        destination: Floor,
        topology: &BuildingTopology,
    ) -> RequestResult<Self> {
        for floor in [origin, destination] {
            if !topology.contains(floor) {
                return Err(RequestError::FloorOutOfRange(floor));
            }
        }
        if origin == destination {
            return Err(RequestError::SameFloor(destination));
        }
        Ok(Request {
            id,
            origin,
            destination: Some(destination),
            direction: Direction::between(origin, destination),
            created_at: Instant::now(),
        })
    }

    pub fn is_hall_call(&self) -> bool {
        self.destination.is_none()
    }

    /// The floor the car has to stop at to serve this request.
    pub fn target_floor(&self) -> Floor {
        self.destination.unwrap_or(self.origin)
    }

    pub fn call(&self) -> Call {
        if self.is_hall_call() {
            self.direction.to_call().unwrap_or(Call::Cab)
        } else {
            Call::Cab
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn topology() -> BuildingTopology {
        BuildingTopology {
            lowest_floor: 1,
            floor_count: 3,
            floor_travel_time: Duration::from_millis(100),
            door_cycle_time: Duration::from_millis(50),
        }
    }

    #[rstest]
    fn car_call_derives_direction(topology: BuildingTopology) {
        let up = Request::car_call(RequestId(1), 1, 3, &topology).unwrap();
        let down = Request::car_call(RequestId(2), 3, 2, &topology).unwrap();
        assert_eq!(up.direction, Direction::Up);
        assert_eq!(down.direction, Direction::Down);
        assert_eq!(up.target_floor(), 3);
        assert_eq!(up.call(), Call::Cab);
    }

    #[rstest]
    fn car_call_to_same_floor_is_rejected(topology: BuildingTopology) {
        assert_eq!(
            Request::car_call(RequestId(1), 2, 2, &topology),
            Err(RequestError::SameFloor(2))
        );
    }

    #[rstest]
    #[case(0)]
    #[case(4)]
    fn hall_call_outside_building_is_rejected(topology: BuildingTopology, #[case] floor: Floor) {
        assert_eq!(
            Request::hall_call(RequestId(1), floor, Direction::Up, &topology),
            Err(RequestError::FloorOutOfRange(floor))
        );
    }

    #[rstest]
    fn hall_call_without_direction_is_rejected(topology: BuildingTopology) {
        assert_eq!(
            Request::hall_call(RequestId(1), 2, Direction::Stop, &topology),
            Err(RequestError::MissingDirection)
        );
    }

    #[rstest]
    fn hall_call_targets_its_origin(topology: BuildingTopology) {
        let request = Request::hall_call(RequestId(7), 2, Direction::Down, &topology).unwrap();
        assert!(request.is_hall_call());
        assert_eq!(request.target_floor(), 2);
        assert_eq!(request.call(), Call::HallDown);
    }
}
