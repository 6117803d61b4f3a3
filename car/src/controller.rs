/// ----- CONTROLLER MODULE -----
/// Runs one car's state machine on its own thread. The thread owns the
/// car; everything else reaches it through the inbox. Commands go to the
/// hardware channel, reports and status changes to the dispatcher.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, tick, Receiver, Sender};
use tracing::{debug, info, warn};

use shared_resources::car_status::CarStatus;
use shared_resources::events::CarCommand;

use crate::error::{CarError, CarResult};
use crate::fsm::Car;
use crate::messages::{CarMessage, CarReport, Effect};

pub fn spawn(
    car: Car,
    tick_interval: Duration,
    inbox_rx: Receiver<CarMessage>,
    command_tx: Sender<CarCommand>,
    report_tx: Sender<CarReport>,
) -> CarResult<JoinHandle<()>> {
    let name = format!("car-{}", car.id().0);
    let handle = thread::Builder::new()
        .name(name)
        .spawn(move || main(car, tick_interval, inbox_rx, command_tx, report_tx))?;
    Ok(handle)
}

pub fn main(
    mut car: Car,
    tick_interval: Duration,
    inbox_rx: Receiver<CarMessage>,
    command_tx: Sender<CarCommand>,
    report_tx: Sender<CarReport>,
) {
    let timer = tick(tick_interval);
    let mut last_status: Option<CarStatus> = None;
    info!(target: "car", car = %car.id(), floor = car.floor(), "control loop started");

    loop {
        select! {
            recv(inbox_rx) -> msg => {
                match msg {
                    Ok(CarMessage::Shutdown) | Err(_) => break,
                    Ok(message) => car.handle(message, Instant::now()),
                }
            },
            recv(timer) -> _ => {
                car.on_tick(Instant::now());
            },
        }
        if let Err(e) = flush(&mut car, &command_tx, &report_tx, &mut last_status) {
            warn!(target: "car", car = %car.id(), error = %e, "stopping control loop");
            return;
        }
    }
    debug!(target: "car", car = %car.id(), "control loop stopped");
}

/// Forwards the effects of the last step, then the status if it changed.
fn flush(
    car: &mut Car,
    command_tx: &Sender<CarCommand>,
    report_tx: &Sender<CarReport>,
    last_status: &mut Option<CarStatus>,
) -> CarResult<()> {
    let id = car.id();
    for effect in car.take_effects() {
        match effect {
            Effect::Command(command) => command_tx
                .send(CarCommand { car: id, command })
                .map_err(|_| CarError::CommandChannelClosed(id))?,
            Effect::Report(report) => report_tx
                .send(report)
                .map_err(|_| CarError::ReportChannelClosed(id))?,
        }
    }
    let status = car.status();
    if last_status.as_ref() != Some(&status) {
        report_tx
            .send(CarReport::Status(status.clone()))
            .map_err(|_| CarError::ReportChannelClosed(id))?;
        *last_status = Some(status);
    }
    Ok(())
}
