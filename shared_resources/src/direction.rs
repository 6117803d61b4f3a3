use std::fmt;

use crate::call::Call;
use crate::ids::Floor;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Down,
    Stop,
    Up,
}

impl Direction {
    /// Direction of travel from `from` to `to`, `Stop` when they are equal.
    pub fn between(from: Floor, to: Floor) -> Self {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => Direction::Up,
            std::cmp::Ordering::Less => Direction::Down,
            std::cmp::Ordering::Equal => Direction::Stop,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::Stop => Direction::Stop,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Stop => "stop",
            Direction::Up => "up",
        }
    }

    pub fn to_call(self) -> Option<Call> {
        match self {
            Direction::Up => Some(Call::HallUp),
            Direction::Down => Some(Call::HallDown),
            Direction::Stop => None,
        }
    }

    /// The floor one step away in this direction, if there is one.
    pub fn step(self, floor: Floor) -> Option<Floor> {
        match self {
            Direction::Up => floor.checked_add(1),
            Direction::Down => floor.checked_sub(1),
            Direction::Stop => Some(floor),
        }
    }

    /// Whether `target` lies strictly ahead of `floor` when travelling this way.
    pub fn is_ahead(self, floor: Floor, target: Floor) -> bool {
        match self {
            Direction::Up => target > floor,
            Direction::Down => target < floor,
            Direction::Stop => false,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_follows_sign_of_travel() {
        assert_eq!(Direction::between(1, 3), Direction::Up);
        assert_eq!(Direction::between(3, 1), Direction::Down);
        assert_eq!(Direction::between(2, 2), Direction::Stop);
    }

    #[test]
    fn step_does_not_wrap_below_zero() {
        assert_eq!(Direction::Down.step(0), None);
        assert_eq!(Direction::Up.step(4), Some(5));
    }
}
