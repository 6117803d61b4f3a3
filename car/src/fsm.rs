/// ----- FSM MODULE -----
/// This module is the finite state machine controlling one elevator car.
/// It receives assignments, button presses and sensor events, and turns them
/// into motor and door commands once the safety monitor has cleared them.
/// The machine never touches a channel itself: everything it wants to say is
/// collected as effects and handed to the control loop.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use shared_resources::car_status::{CarState, CarStatus, DoorState};
use shared_resources::config::{BuildingTopology, CarSettings, ControlSettings};
use shared_resources::direction::Direction;
use shared_resources::events::{Alert, Command, SensorEvent};
use shared_resources::ids::{CarId, Floor};
use shared_resources::request::Request;

use crate::doors::DoorTimer;
use crate::messages::{CarMessage, CarReport, Effect};
use crate::requests::StopQueue;
use crate::safety::{Gate, LoadVerdict, SafetyMonitor, Transition, VetoReason};
use crate::watchdog::{Expectation, SensorWatchdog, Verdict};

#[derive(Debug, Clone)]
pub struct Car {
    id: CarId,
    topology: Arc<BuildingTopology>,
    floor: Floor,
    state: CarState,
    direction: Direction,
    door_state: DoorState,
    queue: StopQueue,
    current_load: u16,
    parking: Option<Floor>,
    safety: SafetyMonitor,
    doors: DoorTimer,
    watchdog: SensorWatchdog,
    effects: Vec<Effect>,
}

impl Car {
    pub fn new(settings: &CarSettings, control: &ControlSettings, topology: Arc<BuildingTopology>) -> Self {
        Car {
            id: settings.id,
            topology,
            floor: settings.home_floor,
            state: CarState::Idle,
            direction: Direction::Stop,
            door_state: DoorState::Closed,
            queue: StopQueue::new(),
            current_load: 0,
            parking: None,
            safety: SafetyMonitor::new(settings.id, settings.capacity, control.audit_capacity),
            doors: DoorTimer::new(control.door_dwell),
            watchdog: SensorWatchdog::new(control.sensor_slack, control.max_missed_confirmations),
            effects: Vec::new(),
        }
    }

    pub fn id(&self) -> CarId {
        self.id
    }

    pub fn floor(&self) -> Floor {
        self.floor
    }

    pub fn state(&self) -> CarState {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn door_state(&self) -> DoorState {
        self.door_state
    }

    pub fn current_load(&self) -> u16 {
        self.current_load
    }

    pub fn capacity(&self) -> u16 {
        self.safety.capacity()
    }

    pub fn queue(&self) -> &StopQueue {
        &self.queue
    }

    pub fn safety(&self) -> &SafetyMonitor {
        &self.safety
    }

    pub fn status(&self) -> CarStatus {
        CarStatus {
            car: self.id,
            floor: self.floor,
            direction: self.direction,
            state: self.state,
            door_state: self.door_state,
            load: self.current_load,
            capacity: self.safety.capacity(),
            overloaded: self.safety.is_overloaded(),
            up_stops: self.queue.up_stops(),
            down_stops: self.queue.down_stops(),
            parking: self.parking,
        }
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn handle(&mut self, message: CarMessage, now: Instant) {
        match message {
            CarMessage::Assign(request) => self.assign(request, now),
            CarMessage::CarCall(request) => self.car_call(request),
            CarMessage::Sensor(event) => self.handle_sensor(event, now),
            CarMessage::Park(floor) => self.park(floor),
            CarMessage::CloseDoor => self.request_close(now),
            CarMessage::Reset => self.reset(now),
            CarMessage::Shutdown => {}
        }
    }

    fn command(&mut self, command: Command) {
        debug!(target: "car", car = %self.id, floor = self.floor, %command, "command");
        self.effects.push(Effect::Command(command));
    }

    fn report(&mut self, report: CarReport) {
        self.effects.push(Effect::Report(report));
    }

    fn gate(&self) -> Gate {
        Gate {
            state: self.state,
            door_state: self.door_state,
        }
    }

    // ----- inputs -----

    pub fn assign(&mut self, request: Request, now: Instant) {
        if self.state.is_halted() {
            warn!(target: "car", car = %self.id, request = %request.id, "assignment to halted car handed back");
            self.report(CarReport::Surrendered {
                car: self.id,
                requests: vec![request],
            });
            return;
        }
        self.parking = None;

        let boards_now = self.state == CarState::DoorOpen
            && request.is_hall_call()
            && request.origin == self.floor
            && (self.direction == request.direction || self.direction == Direction::Stop);
        if boards_now {
            info!(target: "car", car = %self.id, request = %request.id, floor = self.floor, "served with doors already open");
            self.direction = request.direction;
            self.doors.hold(now);
            self.report(CarReport::Served {
                car: self.id,
                request: request.id,
            });
            return;
        }

        // landing call while the doors are closing: open them again
        let reopens = self.state == CarState::DoorClosing
            && request.is_hall_call()
            && request.origin == self.floor
            && (self.direction == request.direction || self.direction == Direction::Stop);

        let id = request.id;
        if self.queue.insert(request, self.floor) {
            info!(target: "car", car = %self.id, request = %id, "request queued");
        } else {
            debug!(target: "car", car = %self.id, request = %id, "request already queued");
        }
        if reopens {
            info!(target: "car", car = %self.id, request = %id, floor = self.floor, "reopening doors for landing call");
            self.open_doors(now);
        }
    }

    /// Destinations are only taken while the doors are open.
    pub fn car_call(&mut self, request: Request) {
        let refusal = if self.state != CarState::DoorOpen || self.door_state != DoorState::Open {
            Some(format!("doors are {}", self.door_state.as_str()))
        } else if request.target_floor() == self.floor {
            Some(format!("car is already at floor {}", self.floor))
        } else {
            None
        };
        if let Some(reason) = refusal {
            info!(target: "car", car = %self.id, request = %request.id, %reason, "car call refused");
            self.report(CarReport::Rejected {
                car: self.id,
                request,
                reason,
            });
            return;
        }
        let id = request.id;
        if self.queue.insert(request, self.floor) {
            info!(target: "car", car = %self.id, request = %id, "car call queued");
        }
    }

    pub fn handle_sensor(&mut self, event: SensorEvent, now: Instant) {
        match event {
            SensorEvent::FloorArrived(floor) => self.on_floor_arrived(floor, now),
            SensorEvent::DoorOpened => self.on_door_opened(now),
            SensorEvent::DoorClosed => self.on_door_closed(now),
            SensorEvent::Overload(on) => {
                self.safety.set_overload_switch(on);
                self.on_load_changed(now);
            }
            SensorEvent::Load(load) => {
                if let LoadVerdict::Approved(load) = self.safety.record_load(load) {
                    self.current_load = load;
                }
                self.on_load_changed(now);
            }
            SensorEvent::Emergency => self.emergency(),
        }
    }

    pub fn park(&mut self, floor: Floor) {
        if !self.topology.contains(floor) {
            warn!(target: "car", car = %self.id, floor, "park floor outside the building ignored");
            return;
        }
        if self.state.is_halted() || !self.queue.is_empty() {
            debug!(target: "car", car = %self.id, floor, "busy, not parking");
            return;
        }
        self.parking = (floor != self.floor).then_some(floor);
    }

    pub fn request_close(&mut self, now: Instant) {
        if self.state == CarState::DoorOpen {
            self.doors.request_close(now);
        }
    }

    pub fn reset(&mut self, now: Instant) {
        if !self.state.is_halted() {
            info!(target: "car", car = %self.id, state = self.state.as_str(), "reset ignored, car is in service");
            return;
        }
        info!(target: "car", car = %self.id, floor = self.floor, "car reset by maintenance");
        self.watchdog.reset();
        self.safety.clear_alarm();
        self.direction = Direction::Stop;
        if self.door_state == DoorState::Closed {
            self.state = CarState::Idle;
        } else {
            self.state = CarState::DoorOpen;
            self.doors.request_close(now);
        }
    }

    pub fn emergency(&mut self) {
        if self.state == CarState::EmergencyStop {
            return;
        }
        error!(target: "car", car = %self.id, floor = self.floor, state = self.state.as_str(), "emergency stop");
        self.halt(CarState::EmergencyStop);
        self.report(CarReport::Alert(Alert::Emergency { car: self.id }));
        self.surrender();
    }

    /// Fixed-interval control step.
    pub fn on_tick(&mut self, now: Instant) {
        if self.state.is_halted() {
            return;
        }
        match self.watchdog.poll(now) {
            Verdict::Quiet => {}
            Verdict::Retry(expectation) => {
                warn!(target: "car", car = %self.id, %expectation, "sensor confirmation missed, retrying");
                self.reissue(expectation);
            }
            Verdict::Failed(expectation) => {
                let missed = self.watchdog.missed();
                self.fail(format!("no {expectation} confirmation after {missed} attempts"));
                return;
            }
        }
        match self.state {
            CarState::Idle => self.start_next_trip(now),
            CarState::DoorOpen if self.doors.expired(now) => self.try_close_doors(now),
            _ => {}
        }
    }

    // ----- transitions -----

    fn on_floor_arrived(&mut self, floor: Floor, now: Instant) {
        if !self.topology.contains(floor) {
            self.fail(format!("floor sensor reported {floor}, outside the building"));
            return;
        }
        if !self.state.is_moving() {
            if floor != self.floor {
                debug!(target: "car", car = %self.id, floor, "floor sensor changed while not moving");
            }
            self.floor = floor;
            return;
        }
        if !self.direction.is_ahead(self.floor, floor) {
            let reason = format!(
                "floor sensor reported {floor} while moving {} from {}",
                self.direction, self.floor
            );
            self.fail(reason);
            return;
        }
        self.watchdog.confirm(Expectation::FloorArrival);
        self.floor = floor;

        let parking_ahead = self
            .parking
            .map_or(false, |target| self.direction.is_ahead(floor, target));
        if self.queue.should_stop(floor, self.direction) {
            self.stop_motor();
            self.open_doors(now);
        } else if self.queue.stops_ahead(floor, self.direction) || parking_ahead {
            self.watchdog
                .arm(Expectation::FloorArrival, self.topology.floor_travel_time, now);
        } else {
            if self.parking.take() == Some(floor) {
                info!(target: "car", car = %self.id, floor, "parked");
            }
            self.stop_motor();
            self.direction = Direction::Stop;
        }
    }

    fn on_door_opened(&mut self, now: Instant) {
        if self.state.is_moving() {
            let veto = self
                .safety
                .veto(Transition::DoorsOpenedWhileMoving, VetoReason::InterlockBroken);
            self.fail(veto.to_string());
            self.door_state = DoorState::Open;
            return;
        }
        self.door_state = DoorState::Open;
        match self.state {
            CarState::DoorOpening => {
                self.watchdog.confirm(Expectation::DoorOpened);
                self.state = CarState::DoorOpen;
                self.serve_floor();
                self.doors.start(now);
            }
            CarState::DoorClosing | CarState::Idle => {
                debug!(target: "car", car = %self.id, "doors reopened");
                self.watchdog.disarm();
                self.state = CarState::DoorOpen;
                self.doors.start(now);
            }
            _ => {}
        }
    }

    fn on_door_closed(&mut self, now: Instant) {
        if self.state == CarState::DoorOpening {
            // stale confirmation of a close that was overridden
            debug!(target: "car", car = %self.id, "door closed while reopening");
            return;
        }
        self.door_state = DoorState::Closed;
        if self.state != CarState::DoorClosing {
            return;
        }
        self.watchdog.confirm(Expectation::DoorClosed);
        match self.next_direction() {
            Some(direction) => self.depart(direction, now),
            None => {
                self.state = CarState::Idle;
                self.direction = Direction::Stop;
            }
        }
    }

    fn on_load_changed(&mut self, now: Instant) {
        if let Some(alert) = self.safety.take_alarm() {
            warn!(target: "safety", car = %self.id, %alert, "overload alarm");
            self.report(CarReport::Alert(alert));
        }
        if self.safety.is_overloaded() && self.state == CarState::DoorOpen {
            self.doors.hold(now);
        }
    }

    fn start_next_trip(&mut self, now: Instant) {
        if self.door_state != DoorState::Closed {
            self.state = CarState::DoorOpen;
            self.doors.request_close(now);
            return;
        }
        if self.safety.is_overloaded() || self.queue.has_stop_at(self.floor) {
            self.open_doors(now);
            return;
        }
        if self.parking == Some(self.floor) {
            self.parking = None;
        }
        match self.next_direction() {
            Some(direction) => self.depart(direction, now),
            None => self.direction = Direction::Stop,
        }
    }

    fn next_direction(&self) -> Option<Direction> {
        if self.queue.is_empty() {
            return self
                .parking
                .map(|target| Direction::between(self.floor, target))
                .filter(|direction| *direction != Direction::Stop);
        }
        self.queue.next_direction(self.floor, self.direction)
    }

    fn depart(&mut self, direction: Direction, now: Instant) {
        let Some(moving) = CarState::moving(direction) else {
            return;
        };
        if self.safety.check(self.gate(), Transition::Depart(direction)).is_err() {
            self.state = CarState::Idle;
            return;
        }
        self.state = moving;
        self.direction = direction;
        self.command(Command::Move(direction));
        self.watchdog
            .arm(Expectation::FloorArrival, self.topology.floor_travel_time, now);
    }

    fn stop_motor(&mut self) {
        self.command(Command::Stop);
        self.state = CarState::Idle;
    }

    fn open_doors(&mut self, now: Instant) {
        if self.safety.check(self.gate(), Transition::OpenDoors).is_err() {
            return;
        }
        self.state = CarState::DoorOpening;
        self.door_state = DoorState::Opening;
        self.command(Command::OpenDoor);
        self.watchdog
            .arm(Expectation::DoorOpened, self.topology.door_cycle_time, now);
    }

    fn try_close_doors(&mut self, now: Instant) {
        if self.safety.check(self.gate(), Transition::CloseDoors).is_err() {
            if let Some(alert) = self.safety.take_alarm() {
                self.report(CarReport::Alert(alert));
            }
            self.doors.hold(now);
            return;
        }
        self.doors.clear();
        self.state = CarState::DoorClosing;
        self.door_state = DoorState::Closing;
        self.command(Command::CloseDoor);
        self.watchdog
            .arm(Expectation::DoorClosed, self.topology.door_cycle_time, now);
    }

    fn serve_floor(&mut self) {
        let (served, heading) = self.queue.serve(self.floor, self.direction);
        self.direction = heading;
        for request in served {
            info!(target: "car", car = %self.id, request = %request.id, floor = self.floor, "request served");
            self.report(CarReport::Served {
                car: self.id,
                request: request.id,
            });
        }
    }

    fn reissue(&mut self, expectation: Expectation) {
        let command = match expectation {
            Expectation::FloorArrival => Command::Move(self.direction),
            Expectation::DoorOpened => Command::OpenDoor,
            Expectation::DoorClosed => Command::CloseDoor,
        };
        self.command(command);
    }

    fn fail(&mut self, reason: String) {
        if self.state.is_halted() {
            return;
        }
        error!(target: "car", car = %self.id, floor = self.floor, %reason, "taking car out of service");
        self.halt(CarState::OutOfService);
        self.report(CarReport::Alert(Alert::CarFault {
            car: self.id,
            reason,
        }));
        self.surrender();
    }

    fn halt(&mut self, state: CarState) {
        self.state = state;
        self.direction = Direction::Stop;
        self.parking = None;
        self.watchdog.disarm();
        self.doors.clear();
        self.command(Command::Stop);
    }

    fn surrender(&mut self) {
        let requests = self.queue.drain();
        if requests.is_empty() {
            return;
        }
        warn!(target: "car", car = %self.id, count = requests.len(), "handing requests back to the dispatcher");
        self.report(CarReport::Surrendered {
            car: self.id,
            requests,
        });
    }
}
