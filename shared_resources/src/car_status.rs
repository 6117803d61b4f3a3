use crate::direction::Direction;
use crate::ids::{CarId, Floor};

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub enum CarState {
    Idle,
    MovingUp,
    MovingDown,
    DoorOpening,
    DoorOpen,
    DoorClosing,
    OutOfService,
    EmergencyStop,
}

impl CarState {
    pub fn as_str(self) -> &'static str {
        match self {
            CarState::Idle => "idle",
            CarState::MovingUp => "movingUp",
            CarState::MovingDown => "movingDown",
            CarState::DoorOpening => "doorOpening",
            CarState::DoorOpen => "doorOpen",
            CarState::DoorClosing => "doorClosing",
            CarState::OutOfService => "outOfService",
            CarState::EmergencyStop => "emergencyStop",
        }
    }

    pub fn is_moving(self) -> bool {
        matches!(self, CarState::MovingUp | CarState::MovingDown)
    }

    /// States only left through a maintenance reset.
    pub fn is_halted(self) -> bool {
        matches!(self, CarState::OutOfService | CarState::EmergencyStop)
    }

    pub fn moving(direction: Direction) -> Option<Self> {
        match direction {
            Direction::Up => Some(CarState::MovingUp),
            Direction::Down => Some(CarState::MovingDown),
            Direction::Stop => None,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub enum DoorState {
    Closed,
    Opening,
    Open,
    Closing,
}

impl DoorState {
    pub fn as_str(self) -> &'static str {
        match self {
            DoorState::Closed => "closed",
            DoorState::Opening => "opening",
            DoorState::Open => "open",
            DoorState::Closing => "closing",
        }
    }
}

/// Snapshot published by a car whenever something about it changes.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CarStatus {
    pub car: CarId,
    pub floor: Floor,
    pub direction: Direction,
    pub state: CarState,
    pub door_state: DoorState,
    pub load: u16,
    pub capacity: u16,
    pub overloaded: bool,
    pub up_stops: Vec<Floor>,
    pub down_stops: Vec<Floor>,
    pub parking: Option<Floor>,
}

impl CarStatus {
    pub fn has_stops(&self) -> bool {
        !self.up_stops.is_empty() || !self.down_stops.is_empty()
    }
}
