/// ----- SERVICE MODULE -----
/// Runs the dispatcher on its own thread. Button presses and withdrawals
/// arrive on the inbox, car reports on their own channel, and a periodic
/// tick drives the backlog alarm and rebalancing. Everything the dispatcher
/// decides is delivered from here: messages to the car inboxes, and
/// building events to whoever is watching.

use std::collections::BTreeMap;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, tick, Receiver, Sender};
use tracing::{debug, info, warn};

use car::messages::{CarMessage, CarReport};
use shared_resources::car_status::CarStatus;
use shared_resources::events::{Alert, ButtonEvent};
use shared_resources::ids::{CarId, RequestId};

use crate::dispatcher::{Dispatcher, Outgoing, Placement};
use crate::error::{BuildingError, BuildingResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatcherMessage {
    Press(ButtonEvent),
    Withdraw(RequestId),
    Shutdown,
}

/// What the outside world can observe of a running building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildingEvent {
    Status(CarStatus),
    Alert(Alert),
    Assigned { request: RequestId, car: CarId },
    Backlogged { request: RequestId },
    Served { request: RequestId, car: CarId },
    Withdrawn { request: RequestId },
    Refused { button: ButtonEvent, reason: String },
}

pub fn spawn(
    dispatcher: Dispatcher,
    tick_interval: Duration,
    inbox_rx: Receiver<DispatcherMessage>,
    report_rx: Receiver<CarReport>,
    car_inboxes: BTreeMap<CarId, Sender<CarMessage>>,
    event_tx: Sender<BuildingEvent>,
) -> BuildingResult<JoinHandle<()>> {
    thread::Builder::new()
        .name("dispatcher".to_string())
        .spawn(move || main(dispatcher, tick_interval, inbox_rx, report_rx, car_inboxes, event_tx))
        .map_err(|source| BuildingError::Spawn {
            name: "dispatcher",
            source,
        })
}

pub fn main(
    mut dispatcher: Dispatcher,
    tick_interval: Duration,
    inbox_rx: Receiver<DispatcherMessage>,
    report_rx: Receiver<CarReport>,
    car_inboxes: BTreeMap<CarId, Sender<CarMessage>>,
    event_tx: Sender<BuildingEvent>,
) {
    let timer = tick(tick_interval);
    info!(target: "dispatcher", cars = car_inboxes.len(), "dispatcher started");

    loop {
        select! {
            recv(inbox_rx) -> msg => {
                match msg {
                    Ok(DispatcherMessage::Press(button)) => {
                        let result = dispatcher.press(button, Instant::now());
                        match result {
                            Ok(Placement::Duplicate { request, .. }) => {
                                debug!(target: "dispatcher", %request, "button already lit");
                            }
                            Ok(Placement::Assigned { .. } | Placement::Backlogged { .. }) => {}
                            Err(e) => {
                                info!(target: "dispatcher", ?button, error = %e, "button press refused");
                                publish(&event_tx, BuildingEvent::Refused { button, reason: e.to_string() });
                            }
                        }
                    }
                    Ok(DispatcherMessage::Withdraw(request)) => {
                        match dispatcher.withdraw(request) {
                            Ok(_) => publish(&event_tx, BuildingEvent::Withdrawn { request }),
                            Err(e) => warn!(target: "dispatcher", %request, error = %e, "withdrawal refused"),
                        }
                    }
                    Ok(DispatcherMessage::Shutdown) | Err(_) => break,
                }
            },
            recv(report_rx) -> msg => {
                match msg {
                    Ok(report) => dispatcher.on_report(report, Instant::now()),
                    Err(_) => break,
                }
            },
            recv(timer) -> _ => {
                dispatcher.on_tick(Instant::now());
            },
        }
        deliver(dispatcher.take_outgoing(), &car_inboxes, &event_tx);
    }

    for (car, inbox) in &car_inboxes {
        if inbox.send(CarMessage::Shutdown).is_err() {
            debug!(target: "dispatcher", %car, "car already stopped");
        }
    }
    info!(target: "dispatcher", "dispatcher stopped");
}

fn publish(event_tx: &Sender<BuildingEvent>, event: BuildingEvent) {
    if event_tx.send(event).is_err() {
        debug!(target: "dispatcher", "nobody is listening for building events");
    }
}

/// A car whose inbox is gone has stopped; the rest of the building goes on.
fn deliver(
    outgoing: Vec<Outgoing>,
    car_inboxes: &BTreeMap<CarId, Sender<CarMessage>>,
    event_tx: &Sender<BuildingEvent>,
) {
    for out in outgoing {
        match out {
            Outgoing::ToCar(car, message) => {
                let sent = car_inboxes
                    .get(&car)
                    .map_or(false, |inbox| inbox.send(message).is_ok());
                if !sent {
                    warn!(target: "dispatcher", %car, "car inbox unavailable, message dropped");
                }
            }
            Outgoing::Status(status) => publish(event_tx, BuildingEvent::Status(status)),
            Outgoing::Alert(alert) => publish(event_tx, BuildingEvent::Alert(alert)),
            Outgoing::Assigned { request, car } => {
                publish(event_tx, BuildingEvent::Assigned { request, car })
            }
            Outgoing::Backlogged { request } => publish(event_tx, BuildingEvent::Backlogged { request }),
            Outgoing::Served { request, car } => {
                publish(event_tx, BuildingEvent::Served { request, car })
            }
            Outgoing::Refused { button, reason } => {
                publish(event_tx, BuildingEvent::Refused { button, reason })
            }
        }
    }
}
