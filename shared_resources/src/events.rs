/// ----- EVENTS -----
/// Everything that crosses the boundary between the control core and the
/// hardware layer: button presses and sensor readings coming in, motor and
/// door commands going out.

use std::fmt;

use crate::direction::Direction;
use crate::ids::{CarId, Floor};

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    HallCall { floor: Floor, direction: Direction },
    CarCall { car: CarId, floor: Floor },
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorEvent {
    FloorArrived(Floor),
    DoorOpened,
    DoorClosed,
    /// Hardware overload switch.
    Overload(bool),
    /// Load cell reading after boarding or alighting.
    Load(u16),
    Emergency,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    OpenDoor,
    CloseDoor,
    Stop,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Move(direction) => write!(f, "move {direction}"),
            Command::OpenDoor => f.write_str("open door"),
            Command::CloseDoor => f.write_str("close door"),
            Command::Stop => f.write_str("stop"),
        }
    }
}

/// A command addressed to one car's motor/door hardware.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarCommand {
    pub car: CarId,
    pub command: Command,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    Overload { car: CarId, load: u16, capacity: u16 },
    CarFault { car: CarId, reason: String },
    Emergency { car: CarId },
    Starvation { pending: usize, oldest_ms: u64 },
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::Overload { car, load, capacity } => {
                write!(f, "{car} overloaded ({load}/{capacity})")
            }
            Alert::CarFault { car, reason } => write!(f, "{car} out of service: {reason}"),
            Alert::Emergency { car } => write!(f, "{car} emergency stop"),
            Alert::Starvation { pending, oldest_ms } => write!(
                f,
                "{pending} request(s) waiting for a car, oldest for {oldest_ms}ms"
            ),
        }
    }
}
