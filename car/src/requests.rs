/// ----- REQUESTS -----
/// The stop queue of one car. Requests are kept in two ordered sub-queues,
/// up-stops and down-stops, and served in SCAN order: every stop in the
/// current direction before the car turns around.

use std::collections::BTreeMap;

use shared_resources::direction::Direction;
use shared_resources::ids::{Floor, RequestId};
use shared_resources::request::Request;

#[derive(Debug, Clone, Default)]
pub struct StopQueue {
    up: BTreeMap<Floor, Vec<Request>>,
    down: BTreeMap<Floor, Vec<Request>>,
}

impl StopQueue {
    pub fn new() -> Self {
        StopQueue::default()
    }

    pub fn is_empty(&self) -> bool {
        self.up.is_empty() && self.down.is_empty()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.up.values().chain(self.down.values()).flatten()
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.iter().any(|request| request.id == id)
    }

    /// Hall calls go to the side of their button, car calls to the side of
    /// their destination as seen from `car_floor`. Returns false for a
    /// request id already queued.
    pub fn insert(&mut self, request: Request, car_floor: Floor) -> bool {
        if self.contains(request.id) {
            return false;
        }
        let side = if request.is_hall_call() {
            request.direction
        } else {
            Direction::between(car_floor, request.target_floor())
        };
        let target = request.target_floor();
        match side {
            Direction::Down => self.down.entry(target).or_default().push(request),
            Direction::Up | Direction::Stop => self.up.entry(target).or_default().push(request),
        }
        true
    }

    pub fn remove(&mut self, id: RequestId) -> Option<Request> {
        for side in [&mut self.up, &mut self.down] {
            let mut emptied = None;
            let mut found = None;
            for (floor, requests) in side.iter_mut() {
                if let Some(index) = requests.iter().position(|request| request.id == id) {
                    found = Some(requests.remove(index));
                    if requests.is_empty() {
                        emptied = Some(*floor);
                    }
                    break;
                }
            }
            if let Some(floor) = emptied {
                side.remove(&floor);
            }
            if found.is_some() {
                return found;
            }
        }
        None
    }

    pub fn has_stop_at(&self, floor: Floor) -> bool {
        self.up.contains_key(&floor) || self.down.contains_key(&floor)
    }

    fn has_car_call_at(&self, floor: Floor) -> bool {
        self.up
            .get(&floor)
            .into_iter()
            .chain(self.down.get(&floor))
            .flatten()
            .any(|request| !request.is_hall_call())
    }

    fn side(&self, direction: Direction) -> Option<&BTreeMap<Floor, Vec<Request>>> {
        match direction {
            Direction::Up => Some(&self.up),
            Direction::Down => Some(&self.down),
            Direction::Stop => None,
        }
    }

    fn side_has(&self, direction: Direction, floor: Floor) -> bool {
        self.side(direction)
            .map_or(false, |side| side.contains_key(&floor))
    }

    /// Any stop, on either side, strictly beyond `floor` in `direction`.
    pub fn stops_ahead(&self, floor: Floor, direction: Direction) -> bool {
        let ahead = |side: &BTreeMap<Floor, Vec<Request>>| match direction {
            Direction::Up => side.range(floor.saturating_add(1)..).next().is_some() && floor < Floor::MAX,
            Direction::Down => side.range(..floor).next().is_some(),
            Direction::Stop => false,
        };
        ahead(&self.up) || ahead(&self.down)
    }

    /// Closest stop other than `floor` itself; the lower floor wins a tie.
    pub fn nearest_target(&self, floor: Floor) -> Option<Floor> {
        self.up
            .keys()
            .chain(self.down.keys())
            .copied()
            .filter(|target| *target != floor)
            .min_by_key(|target| (target.abs_diff(floor), *target))
    }

    /// Whether a car travelling `direction` should halt at `floor`.
    pub fn should_stop(&self, floor: Floor, direction: Direction) -> bool {
        match direction {
            Direction::Stop => self.has_stop_at(floor),
            _ => {
                self.side_has(direction, floor)
                    || self.has_car_call_at(floor)
                    || (self.side_has(direction.opposite(), floor) && !self.stops_ahead(floor, direction))
            }
        }
    }

    /// Keep going while there is anything ahead, turn around when only the
    /// other side has work left.
    pub fn next_direction(&self, floor: Floor, last_direction: Direction) -> Option<Direction> {
        match last_direction {
            Direction::Stop => self
                .nearest_target(floor)
                .map(|target| Direction::between(floor, target)),
            direction if self.stops_ahead(floor, direction) => Some(direction),
            direction if self.stops_ahead(floor, direction.opposite()) => Some(direction.opposite()),
            _ => None,
        }
    }

    /// Removes the requests served by opening the doors at `floor` after
    /// arriving in `arriving` direction. Returns them together with the
    /// direction the car will leave in.
    pub fn serve(&mut self, floor: Floor, arriving: Direction) -> (Vec<Request>, Direction) {
        let mut served = Vec::new();
        for side in [&mut self.up, &mut self.down] {
            if let Some(requests) = side.get_mut(&floor) {
                let (cab, hall): (Vec<Request>, Vec<Request>) =
                    requests.drain(..).partition(|request| !request.is_hall_call());
                served.extend(cab);
                *requests = hall;
                if requests.is_empty() {
                    side.remove(&floor);
                }
            }
        }

        let heading = self.departure_direction(floor, arriving);
        let taken = match heading {
            Direction::Up => self.up.remove(&floor),
            Direction::Down => self.down.remove(&floor),
            Direction::Stop => None,
        };
        served.extend(taken.into_iter().flatten());
        (served, heading)
    }

    fn departure_direction(&self, floor: Floor, arriving: Direction) -> Direction {
        let continues = |direction: Direction| {
            self.side_has(direction, floor) || self.stops_ahead(floor, direction)
        };
        match arriving {
            Direction::Stop => {
                if self.side_has(Direction::Up, floor) {
                    Direction::Up
                } else if self.side_has(Direction::Down, floor) {
                    Direction::Down
                } else {
                    self.next_direction(floor, Direction::Stop)
                        .unwrap_or(Direction::Stop)
                }
            }
            direction if continues(direction) => direction,
            direction if continues(direction.opposite()) => direction.opposite(),
            _ => Direction::Stop,
        }
    }

    /// Hands every queued request back, e.g. when the car leaves service.
    pub fn drain(&mut self) -> Vec<Request> {
        let mut requests: Vec<Request> = std::mem::take(&mut self.up)
            .into_values()
            .chain(std::mem::take(&mut self.down).into_values())
            .flatten()
            .collect();
        requests.sort_by_key(|request| request.id);
        requests
    }

    pub fn up_stops(&self) -> Vec<Floor> {
        self.up.keys().copied().collect()
    }

    pub fn down_stops(&self) -> Vec<Floor> {
        self.down.keys().rev().copied().collect()
    }
}
