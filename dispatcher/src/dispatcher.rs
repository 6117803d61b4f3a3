/// ----- DISPATCHER MODULE -----
/// The single authority deciding which car serves which request. It keeps
/// the latest status of every car, the dispatch table and the backlog, and
/// reacts to button presses and car reports. Like the car state machine it
/// never touches a channel: outgoing messages are collected and drained by
/// the dispatcher service.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use car::messages::{CarMessage, CarReport};
use shared_resources::car_status::{CarState, CarStatus, DoorState};
use shared_resources::config::{BuildingConfig, BuildingTopology};
use shared_resources::direction::Direction;
use shared_resources::events::{Alert, ButtonEvent};
use shared_resources::ids::{CarId, Floor, RequestId, RequestIdGenerator};
use shared_resources::request::Request;

use crate::backlog::Backlog;
use crate::cost::{CarView, CostModel, Estimate};
use crate::dispatch_table::DispatchTable;
use crate::error::{DispatchError, DispatchResult};
use crate::rebalance::Rebalancer;

/// How a hall call press was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Assigned { request: RequestId, car: CarId },
    /// The same button is already lit; nothing new was created.
    Duplicate { request: RequestId, car: Option<CarId> },
    Backlogged { request: RequestId },
}

/// Messages the dispatcher wants delivered, in the order they were produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    ToCar(CarId, CarMessage),
    Status(CarStatus),
    Alert(Alert),
    Assigned { request: RequestId, car: CarId },
    Backlogged { request: RequestId },
    Served { request: RequestId, car: CarId },
    /// A button press the car turned down after the dispatcher had routed it.
    Refused { button: ButtonEvent, reason: String },
}

fn initial_status(car: CarId, floor: Floor, capacity: u16) -> CarStatus {
    CarStatus {
        car,
        floor,
        direction: Direction::Stop,
        state: CarState::Idle,
        door_state: DoorState::Closed,
        load: 0,
        capacity,
        overloaded: false,
        up_stops: Vec::new(),
        down_stops: Vec::new(),
        parking: None,
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    topology: Arc<BuildingTopology>,
    cost: CostModel,
    ids: RequestIdGenerator,
    cars: BTreeMap<CarId, CarStatus>,
    table: DispatchTable,
    backlog: Backlog,
    rebalancer: Rebalancer,
    outgoing: Vec<Outgoing>,
}

impl Dispatcher {
    pub fn new(config: &BuildingConfig, topology: Arc<BuildingTopology>, now: Instant) -> Self {
        let cars: BTreeMap<CarId, CarStatus> = config
            .cars
            .iter()
            .map(|car| (car.id, initial_status(car.id, car.home_floor, car.capacity)))
            .collect();
        let homes = config.cars.iter().map(|car| (car.id, car.home_floor)).collect();
        let mut rebalancer = Rebalancer::new(homes, config.control.rebalance_after);
        for status in cars.values() {
            rebalancer.observe(status, false, now);
        }
        Dispatcher {
            cost: CostModel::new(&topology, &config.control),
            topology,
            ids: RequestIdGenerator::new(),
            cars,
            table: DispatchTable::new(),
            backlog: Backlog::new(config.control.backlog_alert_after),
            rebalancer,
            outgoing: Vec::new(),
        }
    }

    pub fn car_status(&self, car: CarId) -> Option<&CarStatus> {
        self.cars.get(&car)
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    pub fn backlog(&self) -> &Backlog {
        &self.backlog
    }

    pub fn take_outgoing(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outgoing)
    }

    fn send(&mut self, car: CarId, message: CarMessage) {
        self.outgoing.push(Outgoing::ToCar(car, message));
    }

    fn raise(&mut self, alert: Alert) {
        self.outgoing.push(Outgoing::Alert(alert));
    }

    // ----- requests -----

    pub fn press(&mut self, button: ButtonEvent, now: Instant) -> DispatchResult<Placement> {
        match button {
            ButtonEvent::HallCall { floor, direction } => self.hall_call(floor, direction, now),
            ButtonEvent::CarCall { car, floor } => {
                let request = self.car_call(car, floor, now)?;
                Ok(Placement::Assigned { request, car })
            }
        }
    }

    pub fn hall_call(&mut self, floor: Floor, direction: Direction, now: Instant) -> DispatchResult<Placement> {
        if let Some(existing) = self.table.find_hall_call(floor, direction) {
            debug!(target: "dispatcher", request = %existing.request.id, car = %existing.car, "duplicate hall call");
            return Ok(Placement::Duplicate {
                request: existing.request.id,
                car: Some(existing.car),
            });
        }
        if let Some(existing) = self.backlog.find_hall_call(floor, direction) {
            return Ok(Placement::Duplicate {
                request: existing.id,
                car: None,
            });
        }
        let request = Request::hall_call(self.ids.next_id(), floor, direction, &self.topology)?;
        let id = request.id;
        match self.assign(request, now) {
            Ok(car) => Ok(Placement::Assigned { request: id, car }),
            Err(DispatchError::NoEligibleCar(request)) => Ok(Placement::Backlogged { request }),
            Err(e) => Err(e),
        }
    }

    /// Scores every eligible car and hands the hall call to the cheapest one:
    /// lowest tier first, then shortest estimated time, then lowest car id. Without an eligible car the call is held in
    /// the backlog and `NoEligibleCar` is returned.
    pub fn assign(&mut self, request: Request, now: Instant) -> DispatchResult<CarId> {
        self.assign_avoiding(request, None, now)
    }

    fn assign_avoiding(&mut self, request: Request, avoid: Option<CarId>, now: Instant) -> DispatchResult<CarId> {
        if let Some(car) = self.table.car_of(request.id) {
            return Err(DispatchError::AlreadyAssigned {
                request: request.id,
                car,
            });
        }
        let Some((car, estimate)) = self.best_car(&request, avoid) else {
            warn!(target: "dispatcher", request = %request.id, floor = request.origin, "no eligible car, request held in backlog");
            let id = request.id;
            self.backlog.hold(request, now);
            self.outgoing.push(Outgoing::Backlogged { request: id });
            return Err(DispatchError::NoEligibleCar(id));
        };
        info!(
            target: "dispatcher",
            request = %request.id,
            floor = request.origin,
            call = %request.call(),
            %car,
            tier = ?estimate.tier,
            cost_ms = estimate.time.as_millis() as u64,
            "request assigned"
        );
        let id = request.id;
        self.table.insert(request.clone(), car, now)?;
        self.rebalancer.busy(car);
        self.send(car, CarMessage::Assign(request));
        self.outgoing.push(Outgoing::Assigned { request: id, car });
        Ok(car)
    }

    fn best_car(&self, request: &Request, avoid: Option<CarId>) -> Option<(CarId, Estimate)> {
        self.cars
            .values()
            .filter(|status| Some(status.car) != avoid)
            .filter_map(|status| {
                let stops: BTreeSet<Floor> = status
                    .up_stops
                    .iter()
                    .chain(&status.down_stops)
                    .copied()
                    .chain(self.table.targets_of(status.car))
                    .collect();
                let view = CarView { status, stops: &stops };
                self.cost
                    .estimate(view, request.origin, request.direction)
                    .map(|estimate| (status.car, estimate))
            })
            .min_by_key(|(car, estimate)| (estimate.tier, estimate.time, *car))
    }

    /// Destinations go straight to the car the passenger is in.
    pub fn car_call(&mut self, car: CarId, floor: Floor, now: Instant) -> DispatchResult<RequestId> {
        let status = self.cars.get(&car).ok_or(DispatchError::UnknownCar(car))?;
        if status.state != CarState::DoorOpen || status.door_state != DoorState::Open {
            return Err(DispatchError::DoorsNotOpen(car));
        }
        let request = Request::car_call(self.ids.next_id(), status.floor, floor, &self.topology)?;
        let id = request.id;
        info!(target: "dispatcher", request = %id, %car, floor, "car call routed");
        self.table.insert(request.clone(), car, now)?;
        self.rebalancer.busy(car);
        self.send(car, CarMessage::CarCall(request));
        self.outgoing.push(Outgoing::Assigned { request: id, car });
        Ok(id)
    }

    /// Takes a request back out of the backlog. Assigned requests stay with
    /// their car.
    pub fn withdraw(&mut self, id: RequestId) -> DispatchResult<Request> {
        if let Some(request) = self.backlog.withdraw(id) {
            info!(target: "dispatcher", request = %id, "request withdrawn");
            return Ok(request);
        }
        match self.table.car_of(id) {
            Some(car) => Err(DispatchError::AlreadyAssigned { request: id, car }),
            None => Err(DispatchError::UnknownRequest(id)),
        }
    }

    // ----- car reports -----

    pub fn on_report(&mut self, report: CarReport, now: Instant) {
        match report {
            CarReport::Status(status) => self.on_status(status, now),
            CarReport::Served { car, request } => {
                if self.table.release(request, car).is_some() {
                    debug!(target: "dispatcher", %request, %car, "request served");
                    self.outgoing.push(Outgoing::Served { request, car });
                }
            }
            CarReport::Surrendered { car, requests } => {
                for request in requests {
                    if self.table.release(request.id, car).is_some() {
                        self.reassign(request, car, now);
                    }
                }
            }
            CarReport::Rejected { car, request, reason } => {
                if self.table.release(request.id, car).is_some() {
                    info!(target: "dispatcher", request = %request.id, %car, %reason, "car refused request");
                    let button = ButtonEvent::CarCall {
                        car,
                        floor: request.target_floor(),
                    };
                    self.outgoing.push(Outgoing::Refused { button, reason });
                }
            }
            CarReport::Alert(alert) => {
                error!(target: "dispatcher", %alert, "alert");
                self.raise(alert);
            }
        }
    }

    fn on_status(&mut self, status: CarStatus, now: Instant) {
        let car = status.car;
        let previous = self.cars.insert(car, status.clone());
        self.rebalancer
            .observe(&status, self.table.has_assignments(car), now);
        self.outgoing.push(Outgoing::Status(status.clone()));

        let was_halted = previous.as_ref().map_or(false, |p| p.state.is_halted());
        if status.state.is_halted() && !was_halted {
            self.on_car_halted(car, now);
        }
        if previous.map_or(true, |p| p.state != status.state) {
            self.retry_backlog(now);
        }
    }

    fn on_car_halted(&mut self, car: CarId, now: Instant) {
        let orphans = self.table.take_car(car);
        if !orphans.is_empty() {
            warn!(target: "dispatcher", %car, count = orphans.len(), "car halted, moving its requests");
        }
        for request in orphans {
            self.reassign(request, car, now);
        }
    }

    fn reassign(&mut self, request: Request, from: CarId, now: Instant) {
        if !request.is_hall_call() {
            warn!(target: "dispatcher", request = %request.id, car = %from, floor = request.target_floor(), "car call dropped with its car");
            return;
        }
        info!(target: "dispatcher", request = %request.id, car = %from, "reassigning hall call");
        let id = request.id;
        match self.assign_avoiding(request, Some(from), now) {
            Ok(_) | Err(DispatchError::NoEligibleCar(_)) => {}
            Err(e) => error!(target: "dispatcher", request = %id, error = %e, "reassignment failed"),
        }
    }

    fn retry_backlog(&mut self, now: Instant) {
        if self.backlog.is_empty() || !self.cars.values().any(|s| !s.state.is_halted()) {
            return;
        }
        let held = self.backlog.take();
        info!(target: "dispatcher", count = held.len(), "retrying backlog");
        for request in held {
            let id = request.id;
            match self.assign(request, now) {
                Ok(_) | Err(DispatchError::NoEligibleCar(_)) => {}
                Err(e) => error!(target: "dispatcher", request = %id, error = %e, "backlog retry failed"),
            }
        }
    }

    // ----- periodic -----

    pub fn on_tick(&mut self, now: Instant) {
        self.check_backlog(now);
        self.rebalance(now);
    }

    fn check_backlog(&mut self, now: Instant) {
        let overdue = self.backlog.newly_overdue(now);
        if overdue.is_empty() {
            return;
        }
        let oldest_ms = self
            .backlog
            .oldest_age(now)
            .map_or(0, |age| age.as_millis() as u64);
        for request in &overdue {
            error!(target: "dispatcher", %request, "request starving in backlog");
        }
        self.raise(Alert::Starvation {
            pending: self.backlog.len(),
            oldest_ms,
        });
    }

    pub fn rebalance(&mut self, now: Instant) {
        for (car, floor) in self.rebalancer.plan(&self.cars, now) {
            info!(target: "dispatcher", %car, floor, "parking idle car");
            self.send(car, CarMessage::Park(floor));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::{fixture, rstest};
    use shared_resources::config::ConfigFile;

    use super::*;

    const SMALL: &str = r#"{
        "topology": { "lowest_floor": 1, "floor_count": 3, "floor_travel_ms": 1000, "door_cycle_ms": 500 },
        "control": { "rebalance_after_ms": 5000, "backlog_alert_after_ms": 2000 },
        "cars": [ { "capacity": 8, "home_floor": 1 }, { "capacity": 8, "home_floor": 1 } ]
    }"#;

    struct Fixture {
        dispatcher: Dispatcher,
        now: Instant,
    }

    #[fixture]
    fn building() -> Fixture {
        let file: ConfigFile = serde_json::from_str(SMALL).unwrap();
        let config = BuildingConfig::from_file(file).unwrap();
        let now = Instant::now();
        Fixture {
            dispatcher: Dispatcher::new(&config, Arc::new(config.topology.clone()), now),
            now,
        }
    }

    fn status(car: u8, floor: Floor, state: CarState) -> CarStatus {
        let mut status = initial_status(CarId(car), floor, 8);
        status.state = state;
        if state == CarState::DoorOpen {
            status.door_state = DoorState::Open;
        }
        status
    }

    fn assigned_car(placement: Placement) -> CarId {
        match placement {
            Placement::Assigned { car, .. } => car,
            other => panic!("expected an assignment, got {other:?}"),
        }
    }

    fn messages_to(outgoing: &[Outgoing], car: CarId) -> Vec<CarMessage> {
        outgoing
            .iter()
            .filter_map(|out| match out {
                Outgoing::ToCar(to, message) if *to == car => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    #[rstest]
    fn simultaneous_calls_spread_over_idle_cars(mut building: Fixture) {
        let d = &mut building.dispatcher;
        let up = d.hall_call(3, Direction::Up, building.now).unwrap();
        let down = d.hall_call(1, Direction::Down, building.now).unwrap();

        assert_eq!(up, Placement::Assigned { request: RequestId(1), car: CarId(1) });
        assert_eq!(down, Placement::Assigned { request: RequestId(2), car: CarId(2) });
        assert_eq!(d.table().car_of(RequestId(1)), Some(CarId(1)));
        assert_eq!(d.table().car_of(RequestId(2)), Some(CarId(2)));
        assert!(matches!(
            messages_to(&d.take_outgoing(), CarId(1)).as_slice(),
            [CarMessage::Assign(request)] if request.id == RequestId(1)
        ));
    }

    #[rstest]
    fn same_inputs_give_same_assignments() {
        let presses = [(2, Direction::Up), (3, Direction::Down), (1, Direction::Up), (2, Direction::Down)];
        let run = || {
            let Fixture { mut dispatcher, now } = building();
            presses
                .iter()
                .map(|(floor, direction)| dispatcher.hall_call(*floor, *direction, now).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[rstest]
    fn equal_cost_goes_to_lowest_car_id(mut building: Fixture) {
        let d = &mut building.dispatcher;
        d.on_report(CarReport::Status(status(1, 3, CarState::Idle)), building.now);
        d.on_report(CarReport::Status(status(2, 1, CarState::Idle)), building.now);

        let placement = d.hall_call(2, Direction::Up, building.now).unwrap();
        assert_eq!(assigned_car(placement), CarId(1));
    }

    #[rstest]
    fn approaching_car_wins_over_a_closer_idle_one(mut building: Fixture) {
        let d = &mut building.dispatcher;
        let mut moving = status(1, 1, CarState::MovingUp);
        moving.direction = Direction::Up;
        moving.up_stops = vec![3];
        d.on_report(CarReport::Status(moving), building.now);
        d.on_report(CarReport::Status(status(2, 2, CarState::Idle)), building.now);

        let placement = d.hall_call(2, Direction::Up, building.now).unwrap();
        assert_eq!(assigned_car(placement), CarId(1));
    }

    #[rstest]
    fn repeated_press_is_suppressed(mut building: Fixture) {
        let d = &mut building.dispatcher;
        let first = d.hall_call(2, Direction::Up, building.now).unwrap();
        let again = d.hall_call(2, Direction::Up, building.now).unwrap();

        assert_eq!(
            again,
            Placement::Duplicate {
                request: RequestId(1),
                car: Some(assigned_car(first))
            }
        );
        assert_eq!(d.table().len(), 1);
    }

    #[rstest]
    fn calls_wait_in_backlog_until_a_car_returns(mut building: Fixture) {
        let d = &mut building.dispatcher;
        d.on_report(CarReport::Status(status(1, 1, CarState::OutOfService)), building.now);
        d.on_report(CarReport::Status(status(2, 2, CarState::EmergencyStop)), building.now);

        let placement = d.hall_call(3, Direction::Down, building.now).unwrap();
        assert_eq!(placement, Placement::Backlogged { request: RequestId(1) });
        assert_eq!(d.backlog().len(), 1);
        assert!(d.take_outgoing().contains(&Outgoing::Backlogged { request: RequestId(1) }));

        d.on_report(CarReport::Status(status(2, 2, CarState::Idle)), building.now);
        assert!(d.backlog().is_empty());
        assert_eq!(d.table().car_of(RequestId(1)), Some(CarId(2)));
        assert_eq!(messages_to(&d.take_outgoing(), CarId(2)).len(), 1);
    }

    #[rstest]
    fn starving_backlog_raises_one_alert(mut building: Fixture) {
        let d = &mut building.dispatcher;
        let now = building.now;
        d.on_report(CarReport::Status(status(1, 1, CarState::OutOfService)), now);
        d.on_report(CarReport::Status(status(2, 1, CarState::OutOfService)), now);
        d.hall_call(2, Direction::Up, now).unwrap();
        d.take_outgoing();

        d.on_tick(now + Duration::from_secs(1));
        d.on_tick(now + Duration::from_secs(2));
        d.on_tick(now + Duration::from_secs(3));

        let alerts: Vec<Outgoing> = d
            .take_outgoing()
            .into_iter()
            .filter(|out| matches!(out, Outgoing::Alert(_)))
            .collect();
        assert_eq!(
            alerts,
            vec![Outgoing::Alert(Alert::Starvation {
                pending: 1,
                oldest_ms: 2000
            })]
        );
    }

    #[rstest]
    fn halted_car_gives_up_hall_calls_and_drops_car_calls(mut building: Fixture) {
        let d = &mut building.dispatcher;
        let now = building.now;
        d.on_report(CarReport::Status(status(2, 3, CarState::Idle)), now);
        let hall = assigned_car(d.hall_call(2, Direction::Up, now).unwrap());
        assert_eq!(hall, CarId(1));
        d.on_report(CarReport::Status(status(1, 1, CarState::DoorOpen)), now);
        let cab = d.car_call(CarId(1), 3, now).unwrap();
        d.take_outgoing();

        d.on_report(CarReport::Status(status(1, 1, CarState::OutOfService)), now);

        assert_eq!(d.table().car_of(RequestId(1)), Some(CarId(2)));
        assert_eq!(d.table().car_of(cab), None);
        assert_eq!(messages_to(&d.take_outgoing(), CarId(1)), Vec::new());
    }

    #[rstest]
    fn reassignment_without_a_car_is_reported_as_backlogged(mut building: Fixture) {
        let d = &mut building.dispatcher;
        let now = building.now;
        d.on_report(CarReport::Status(status(2, 1, CarState::EmergencyStop)), now);
        assert_eq!(assigned_car(d.hall_call(2, Direction::Up, now).unwrap()), CarId(1));
        d.take_outgoing();

        d.on_report(CarReport::Status(status(1, 1, CarState::OutOfService)), now);

        assert_eq!(d.table().car_of(RequestId(1)), None);
        assert_eq!(d.backlog().len(), 1);
        assert!(d.take_outgoing().contains(&Outgoing::Backlogged { request: RequestId(1) }));
    }

    #[rstest]
    fn surrendered_request_moves_to_another_car(mut building: Fixture) {
        let d = &mut building.dispatcher;
        let now = building.now;
        d.hall_call(3, Direction::Down, now).unwrap();
        let request = d.table().iter().next().unwrap().request.clone();
        assert_eq!(d.table().car_of(request.id), Some(CarId(1)));

        d.on_report(CarReport::Surrendered { car: CarId(1), requests: vec![request.clone()] }, now);
        assert_eq!(d.table().car_of(request.id), Some(CarId(2)));

        // a late hand-back from the old car changes nothing
        d.on_report(CarReport::Surrendered { car: CarId(1), requests: vec![request.clone()] }, now);
        assert_eq!(d.table().car_of(request.id), Some(CarId(2)));
    }

    #[rstest]
    fn served_and_rejected_requests_leave_the_table(mut building: Fixture) {
        let d = &mut building.dispatcher;
        let now = building.now;
        d.hall_call(2, Direction::Up, now).unwrap();
        d.on_report(CarReport::Served { car: CarId(1), request: RequestId(1) }, now);
        assert!(d.table().is_empty());

        d.on_report(CarReport::Status(status(2, 2, CarState::DoorOpen)), now);
        let id = d.car_call(CarId(2), 3, now).unwrap();
        let request = d.table().iter().next().unwrap().request.clone();
        d.take_outgoing();
        let rejected = CarReport::Rejected { car: CarId(2), request, reason: "doors are closing".to_owned() };
        d.on_report(rejected.clone(), now);
        assert_eq!(d.table().car_of(id), None);
        assert_eq!(
            d.take_outgoing(),
            vec![Outgoing::Refused {
                button: ButtonEvent::CarCall { car: CarId(2), floor: 3 },
                reason: "doors are closing".to_owned(),
            }]
        );

        // the same refusal twice is only passed on once
        d.on_report(rejected, now);
        assert!(d.take_outgoing().is_empty());
    }

    #[rstest]
    fn car_call_needs_open_doors(mut building: Fixture) {
        let d = &mut building.dispatcher;
        assert_eq!(d.car_call(CarId(1), 3, building.now), Err(DispatchError::DoorsNotOpen(CarId(1))));
        assert_eq!(d.car_call(CarId(9), 3, building.now), Err(DispatchError::UnknownCar(CarId(9))));

        d.on_report(CarReport::Status(status(1, 1, CarState::DoorOpen)), building.now);
        let id = d.car_call(CarId(1), 3, building.now).unwrap();
        assert!(matches!(
            messages_to(&d.take_outgoing(), CarId(1)).as_slice(),
            [CarMessage::CarCall(request)] if request.id == id && request.destination == Some(3)
        ));
    }

    #[rstest]
    fn only_backlogged_requests_can_be_withdrawn(mut building: Fixture) {
        let d = &mut building.dispatcher;
        let now = building.now;
        d.hall_call(2, Direction::Up, now).unwrap();
        assert_eq!(
            d.withdraw(RequestId(1)),
            Err(DispatchError::AlreadyAssigned { request: RequestId(1), car: CarId(1) })
        );

        d.on_report(CarReport::Status(status(1, 1, CarState::OutOfService)), now);
        d.on_report(CarReport::Status(status(2, 1, CarState::OutOfService)), now);
        let placement = d.hall_call(3, Direction::Down, now).unwrap();
        let Placement::Backlogged { request } = placement else {
            panic!("expected backlog, got {placement:?}");
        };
        assert_eq!(d.withdraw(request).map(|r| r.id), Ok(request));
        assert_eq!(d.withdraw(request), Err(DispatchError::UnknownRequest(request)));
    }

    #[rstest]
    fn invalid_hall_call_is_refused(mut building: Fixture) {
        let d = &mut building.dispatcher;
        assert!(matches!(
            d.hall_call(7, Direction::Up, building.now),
            Err(DispatchError::InvalidRequest(_))
        ));
        assert!(d.table().is_empty());
    }

    #[rstest]
    fn idle_cars_are_parked_after_a_while(mut building: Fixture) {
        let d = &mut building.dispatcher;
        let now = building.now;
        d.on_report(CarReport::Status(status(1, 3, CarState::Idle)), now);
        d.on_report(CarReport::Status(status(2, 2, CarState::DoorOpen)), now);
        d.take_outgoing();

        d.on_tick(now + Duration::from_secs(4));
        assert!(messages_to(&d.take_outgoing(), CarId(1)).is_empty());
        d.on_tick(now + Duration::from_secs(6));
        let outgoing = d.take_outgoing();
        assert_eq!(messages_to(&outgoing, CarId(1)), vec![CarMessage::Park(1)]);
        assert!(messages_to(&outgoing, CarId(2)).is_empty());
    }
}
