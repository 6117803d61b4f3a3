/// ----- SIMULATOR MODULE -----
/// Stands in for the motors, doors and sensors of every car. It obeys the
/// commands the cars send and answers with the sensor events real hardware
/// would produce, after the travel and door times of the building.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, tick, Receiver};
use tracing::{debug, info};

use shared_resources::config::BuildingTopology;
use shared_resources::direction::Direction;
use shared_resources::events::{CarCommand, Command, SensorEvent};
use shared_resources::ids::{CarId, Floor};

use crate::building::CarLink;
use crate::error::{BuildingError, BuildingResult};

#[derive(Debug, Clone, Copy)]
struct Shaft {
    floor: Floor,
    motion: Option<(Direction, Instant)>,
    door: Option<(SensorEvent, Instant)>,
}

#[derive(Debug, Clone)]
pub struct Simulator {
    topology: Arc<BuildingTopology>,
    shafts: BTreeMap<CarId, Shaft>,
}

impl Simulator {
    pub fn new(topology: Arc<BuildingTopology>, start_floors: &BTreeMap<CarId, Floor>) -> Self {
        let shafts = start_floors
            .iter()
            .map(|(car, floor)| {
                let shaft = Shaft {
                    floor: *floor,
                    motion: None,
                    door: None,
                };
                (*car, shaft)
            })
            .collect();
        Simulator { topology, shafts }
    }

    pub fn floor_of(&self, car: CarId) -> Option<Floor> {
        self.shafts.get(&car).map(|shaft| shaft.floor)
    }

    pub fn apply(&mut self, command: CarCommand, now: Instant) {
        let travel = self.topology.floor_travel_time;
        let door_cycle = self.topology.door_cycle_time;
        let Some(shaft) = self.shafts.get_mut(&command.car) else {
            debug!(target: "building", car = %command.car, "command for unknown shaft");
            return;
        };
        match command.command {
            Command::Move(Direction::Stop) | Command::Stop => shaft.motion = None,
            Command::Move(direction) => shaft.motion = Some((direction, now + travel)),
            Command::OpenDoor => shaft.door = Some((SensorEvent::DoorOpened, now + door_cycle)),
            Command::CloseDoor => shaft.door = Some((SensorEvent::DoorClosed, now + door_cycle)),
        }
    }

    /// Sensor events that became due by `now`.
    pub fn advance(&mut self, now: Instant) -> Vec<(CarId, SensorEvent)> {
        let travel = self.topology.floor_travel_time;
        let mut events = Vec::new();
        for (car, shaft) in self.shafts.iter_mut() {
            if let Some((direction, arrives_at)) = shaft.motion {
                if now >= arrives_at {
                    match direction.step(shaft.floor).filter(|next| self.topology.contains(*next)) {
                        Some(next) => {
                            shaft.floor = next;
                            shaft.motion = Some((direction, arrives_at + travel));
                            events.push((*car, SensorEvent::FloorArrived(next)));
                        }
                        // end of the shaft, the car just sits on the buffer
                        None => shaft.motion = None,
                    }
                }
            }
            if let Some((event, due)) = shaft.door {
                if now >= due {
                    shaft.door = None;
                    events.push((*car, event));
                }
            }
        }
        events
    }
}

pub fn spawn(
    simulator: Simulator,
    command_rx: Receiver<CarCommand>,
    link: CarLink,
) -> BuildingResult<JoinHandle<()>> {
    thread::Builder::new()
        .name("simulator".to_string())
        .spawn(move || main(simulator, command_rx, link))
        .map_err(|source| BuildingError::Spawn {
            name: "simulator",
            source,
        })
}

pub fn main(mut simulator: Simulator, command_rx: Receiver<CarCommand>, link: CarLink) {
    let shortest = simulator
        .topology
        .floor_travel_time
        .min(simulator.topology.door_cycle_time);
    let timer = tick((shortest / 10).max(Duration::from_millis(1)));
    info!(target: "building", "hardware simulator started");

    loop {
        select! {
            recv(command_rx) -> msg => {
                match msg {
                    Ok(command) => {
                        debug!(target: "building", car = %command.car, command = %command.command, "hardware command");
                        simulator.apply(command, Instant::now());
                    }
                    Err(_) => break,
                }
            },
            recv(timer) -> _ => {
                for (car, event) in simulator.advance(Instant::now()) {
                    if link.sensor(car, event).is_err() {
                        debug!(target: "building", %car, "car no longer listening");
                    }
                }
            },
        }
    }
    info!(target: "building", "hardware simulator stopped");
}
