/// ----- BUILDING MODULE -----
/// One running building: a dispatcher thread and one control loop per car,
/// wired together over channels. Nothing here is global, so a process can
/// run several buildings side by side.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{info, warn};

use car::controller;
use car::fsm::Car;
use car::messages::CarMessage;
use shared_resources::config::{BuildingConfig, BuildingTopology};
use shared_resources::events::{ButtonEvent, CarCommand, SensorEvent};
use shared_resources::ids::{CarId, RequestId};

use crate::dispatcher::Dispatcher;
use crate::error::{BuildingError, BuildingResult, DispatchError};
use crate::service::{self, BuildingEvent, DispatcherMessage};

/// Direct line into every car's inbox, for sensors and maintenance.
#[derive(Debug, Clone)]
pub struct CarLink {
    inboxes: BTreeMap<CarId, Sender<CarMessage>>,
}

impl CarLink {
    pub fn send(&self, car: CarId, message: CarMessage) -> BuildingResult<()> {
        let inbox = self
            .inboxes
            .get(&car)
            .ok_or(DispatchError::UnknownCar(car))?;
        inbox
            .send(message)
            .map_err(|_| BuildingError::Disconnected("car inbox"))
    }

    pub fn sensor(&self, car: CarId, event: SensorEvent) -> BuildingResult<()> {
        self.send(car, CarMessage::Sensor(event))
    }
}

pub struct Building {
    topology: Arc<BuildingTopology>,
    dispatcher_tx: Sender<DispatcherMessage>,
    link: CarLink,
    event_rx: Receiver<BuildingEvent>,
    command_rx: Receiver<CarCommand>,
    threads: Vec<JoinHandle<()>>,
}

impl Building {
    pub fn start(config: &BuildingConfig) -> BuildingResult<Self> {
        let topology = Arc::new(config.topology.clone());
        let (command_tx, command_rx) = unbounded::<CarCommand>();
        let (report_tx, report_rx) = unbounded();
        let (event_tx, event_rx) = unbounded::<BuildingEvent>();
        let (dispatcher_tx, dispatcher_rx) = unbounded::<DispatcherMessage>();

        let mut threads = Vec::new();
        let mut inboxes = BTreeMap::new();
        for settings in &config.cars {
            let (inbox_tx, inbox_rx) = unbounded();
            let car = Car::new(settings, &config.control, topology.clone());
            threads.push(controller::spawn(
                car,
                config.control.tick_interval,
                inbox_rx,
                command_tx.clone(),
                report_tx.clone(),
            )?);
            inboxes.insert(settings.id, inbox_tx);
        }

        let dispatcher = Dispatcher::new(config, topology.clone(), Instant::now());
        threads.push(service::spawn(
            dispatcher,
            config.control.tick_interval,
            dispatcher_rx,
            report_rx,
            inboxes.clone(),
            event_tx,
        )?);

        info!(
            target: "building",
            floors = topology.floor_count,
            lowest_floor = topology.lowest_floor,
            cars = config.cars.len(),
            "building started"
        );
        Ok(Building {
            topology,
            dispatcher_tx,
            link: CarLink { inboxes },
            event_rx,
            command_rx,
            threads,
        })
    }

    pub fn topology(&self) -> &Arc<BuildingTopology> {
        &self.topology
    }

    pub fn link(&self) -> CarLink {
        self.link.clone()
    }

    /// Building events: car statuses, alerts, assignments and services.
    pub fn events(&self) -> &Receiver<BuildingEvent> {
        &self.event_rx
    }

    /// Motor and door commands for the hardware layer.
    pub fn commands(&self) -> &Receiver<CarCommand> {
        &self.command_rx
    }

    fn to_dispatcher(&self, message: DispatcherMessage) -> BuildingResult<()> {
        self.dispatcher_tx
            .send(message)
            .map_err(|_| BuildingError::Disconnected("dispatcher"))
    }

    pub fn press(&self, button: ButtonEvent) -> BuildingResult<()> {
        self.to_dispatcher(DispatcherMessage::Press(button))
    }

    pub fn withdraw(&self, request: RequestId) -> BuildingResult<()> {
        self.to_dispatcher(DispatcherMessage::Withdraw(request))
    }

    pub fn sensor(&self, car: CarId, event: SensorEvent) -> BuildingResult<()> {
        self.link.sensor(car, event)
    }

    pub fn reset(&self, car: CarId) -> BuildingResult<()> {
        self.link.send(car, CarMessage::Reset)
    }

    pub fn close_door(&self, car: CarId) -> BuildingResult<()> {
        self.link.send(car, CarMessage::CloseDoor)
    }

    /// Stops the dispatcher, which stops the cars, and waits for all of them.
    pub fn shutdown(self) {
        if self.to_dispatcher(DispatcherMessage::Shutdown).is_err() {
            warn!(target: "building", "dispatcher already stopped");
        }
        for handle in self.threads {
            let name = handle.thread().name().unwrap_or("unnamed").to_owned();
            if handle.join().is_err() {
                warn!(target: "building", thread = %name, "thread panicked");
            }
        }
        info!(target: "building", "building stopped");
    }
}
