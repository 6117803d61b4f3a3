/// ----- CONSOLE MODULE -----
/// Line based front end standing in for the buttons, sensors and the
/// maintenance panel. One command per line, e.g. `hall 3 up`, `car 1 5`,
/// `emergency 2`.

use std::io::BufRead;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

use shared_resources::direction::Direction;
use shared_resources::events::{ButtonEvent, SensorEvent};
use shared_resources::ids::{CarId, Floor, RequestId};

use crate::building::Building;
use crate::error::{BuildingError, BuildingResult};

pub const HELP: &str = "\
commands:
  hall <floor> <up|down>     press a hall call button
  car <car> <floor>          press a destination button inside a car
  close <car>                door close button
  load <car> <weight>        load cell reading
  overload <car> <on|off>    overload switch
  emergency <car>            emergency stop
  reset <car>                maintenance reset
  withdraw <request>         withdraw a request still waiting for a car
  help | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Press(ButtonEvent),
    Sensor(CarId, SensorEvent),
    CloseDoor(CarId),
    Reset(CarId),
    Withdraw(RequestId),
    Help,
    Quit,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("empty line")]
    Empty,

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("`{command}` expects: {usage}")]
    Usage {
        command: &'static str,
        usage: &'static str,
    },
}

fn usage(command: &'static str, usage: &'static str) -> ParseCommandError {
    ParseCommandError::Usage { command, usage }
}

fn number<T: FromStr>(word: Option<&str>, command: &'static str, expected: &'static str) -> Result<T, ParseCommandError> {
    word.and_then(|w| w.parse().ok())
        .ok_or_else(|| usage(command, expected))
}

impl FromStr for ConsoleCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Err(ParseCommandError::Empty);
        };
        let parsed = match command.to_ascii_lowercase().as_str() {
            "hall" => {
                let floor: Floor = number(words.next(), "hall", "<floor> <up|down>")?;
                let direction = match words.next() {
                    Some("up") => Direction::Up,
                    Some("down") => Direction::Down,
                    _ => return Err(usage("hall", "<floor> <up|down>")),
                };
                ConsoleCommand::Press(ButtonEvent::HallCall { floor, direction })
            }
            "car" => {
                let car = CarId(number(words.next(), "car", "<car> <floor>")?);
                let floor = number(words.next(), "car", "<car> <floor>")?;
                ConsoleCommand::Press(ButtonEvent::CarCall { car, floor })
            }
            "close" => ConsoleCommand::CloseDoor(CarId(number(words.next(), "close", "<car>")?)),
            "load" => {
                let car = CarId(number(words.next(), "load", "<car> <weight>")?);
                let load = number(words.next(), "load", "<car> <weight>")?;
                ConsoleCommand::Sensor(car, SensorEvent::Load(load))
            }
            "overload" => {
                let car = CarId(number(words.next(), "overload", "<car> <on|off>")?);
                let on = match words.next() {
                    Some("on") => true,
                    Some("off") => false,
                    _ => return Err(usage("overload", "<car> <on|off>")),
                };
                ConsoleCommand::Sensor(car, SensorEvent::Overload(on))
            }
            "emergency" => {
                let car = CarId(number(words.next(), "emergency", "<car>")?);
                ConsoleCommand::Sensor(car, SensorEvent::Emergency)
            }
            "reset" => ConsoleCommand::Reset(CarId(number(words.next(), "reset", "<car>")?)),
            "withdraw" => ConsoleCommand::Withdraw(RequestId(number(words.next(), "withdraw", "<request>")?)),
            "help" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(ParseCommandError::UnknownCommand(other.to_string())),
        };
        Ok(parsed)
    }
}

/// Reads commands until `quit` or end of input.
pub fn run(building: &Building, input: impl BufRead) -> BuildingResult<()> {
    for line in input.lines() {
        let line = line?;
        let command = match line.parse::<ConsoleCommand>() {
            Ok(command) => command,
            Err(ParseCommandError::Empty) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        let result = match command {
            ConsoleCommand::Press(button) => building.press(button),
            ConsoleCommand::Sensor(car, event) => building.sensor(car, event),
            ConsoleCommand::CloseDoor(car) => building.close_door(car),
            ConsoleCommand::Reset(car) => building.reset(car),
            ConsoleCommand::Withdraw(request) => building.withdraw(request),
            ConsoleCommand::Help => {
                eprintln!("{HELP}");
                Ok(())
            }
            ConsoleCommand::Quit => return Ok(()),
        };
        match result {
            Err(BuildingError::Dispatch(e)) => warn!(target: "building", error = %e, "command refused"),
            other => other?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("hall 3 up", ConsoleCommand::Press(ButtonEvent::HallCall { floor: 3, direction: Direction::Up }))]
    #[case("car 2 7", ConsoleCommand::Press(ButtonEvent::CarCall { car: CarId(2), floor: 7 }))]
    #[case("load 1 12", ConsoleCommand::Sensor(CarId(1), SensorEvent::Load(12)))]
    #[case("overload 1 off", ConsoleCommand::Sensor(CarId(1), SensorEvent::Overload(false)))]
    #[case("  EMERGENCY 3 ", ConsoleCommand::Sensor(CarId(3), SensorEvent::Emergency))]
    #[case("reset 3", ConsoleCommand::Reset(CarId(3)))]
    #[case("close 1", ConsoleCommand::CloseDoor(CarId(1)))]
    #[case("withdraw 14", ConsoleCommand::Withdraw(RequestId(14)))]
    #[case("quit", ConsoleCommand::Quit)]
    fn parses_commands(#[case] line: &str, #[case] expected: ConsoleCommand) {
        assert_eq!(line.parse::<ConsoleCommand>(), Ok(expected));
    }

    #[rstest]
    #[case("", ParseCommandError::Empty)]
    #[case("hall 3 sideways", usage("hall", "<floor> <up|down>"))]
    #[case("hall x up", usage("hall", "<floor> <up|down>"))]
    #[case("car 1", usage("car", "<car> <floor>"))]
    #[case("jump 2", ParseCommandError::UnknownCommand("jump".to_string()))]
    fn rejects_malformed_lines(#[case] line: &str, #[case] expected: ParseCommandError) {
        assert_eq!(line.parse::<ConsoleCommand>(), Err(expected));
    }
}
