use std::collections::BTreeMap;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};

use dispatcher::building::Building;
use dispatcher::service::BuildingEvent;
use dispatcher::simulator::{self, Simulator};
use shared_resources::car_status::{CarState, DoorState};
use shared_resources::config::BuildingConfig;
use shared_resources::direction::Direction;
use shared_resources::events::{Alert, ButtonEvent, SensorEvent};
use shared_resources::ids::{CarId, RequestId};

const PATIENCE: Duration = Duration::from_secs(10);

const THREE_FLOORS: &str = r#"{
    "topology": { "lowest_floor": 1, "floor_count": 3, "floor_travel_ms": 100, "door_cycle_ms": 50 },
    "control": {
        "tick_ms": 5,
        "door_dwell_ms": 300,
        "sensor_slack_ms": 400,
        "rebalance_after_ms": 60000,
        "backlog_alert_after_ms": 60000
    },
    "cars": [ { "capacity": 8, "home_floor": 1 }, { "capacity": 8, "home_floor": 1 } ]
}"#;

struct Running {
    building: Building,
    simulator: JoinHandle<()>,
    seen: Vec<BuildingEvent>,
}

impl Running {
    /// Collects building events until `done` holds for everything seen so far.
    fn wait_until(&mut self, what: &str, done: impl Fn(&[BuildingEvent]) -> bool) {
        let deadline = Instant::now() + PATIENCE;
        while !done(&self.seen) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.building.events().recv_timeout(remaining) {
                Ok(event) => self.seen.push(event),
                Err(_) => panic!("timed out waiting for {what}; saw {:#?}", self.seen),
            }
        }
    }

    fn stop(self) {
        self.building.shutdown();
        self.simulator.join().unwrap();
    }
}

fn has(seen: &[BuildingEvent], event: &BuildingEvent) -> bool {
    seen.contains(event)
}

fn car_in(seen: &[BuildingEvent], car: CarId, state: CarState) -> bool {
    seen.iter().rev().find_map(|event| match event {
        BuildingEvent::Status(status) if status.car == car => Some(status.state == state),
        _ => None,
    }) == Some(true)
}

#[fixture]
fn running() -> Running {
    let config = BuildingConfig::from_json(THREE_FLOORS).unwrap();
    let building = Building::start(&config).unwrap();
    let start_floors: BTreeMap<_, _> = config.cars.iter().map(|car| (car.id, car.home_floor)).collect();
    let simulator = simulator::spawn(
        Simulator::new(building.topology().clone(), &start_floors),
        building.commands().clone(),
        building.link(),
    )
    .unwrap();
    Running {
        building,
        simulator,
        seen: Vec::new(),
    }
}

#[rstest]
fn calls_from_both_ends_go_to_different_cars(mut running: Running) {
    running
        .building
        .press(ButtonEvent::HallCall { floor: 3, direction: Direction::Up })
        .unwrap();
    running
        .building
        .press(ButtonEvent::HallCall { floor: 1, direction: Direction::Down })
        .unwrap();

    let first = BuildingEvent::Assigned { request: RequestId(1), car: CarId(1) };
    let second = BuildingEvent::Assigned { request: RequestId(2), car: CarId(2) };
    running.wait_until("both assignments", |seen| has(seen, &first) && has(seen, &second));

    running.wait_until("car 1 doors open at floor 3", |seen| {
        seen.iter().any(|event| {
            matches!(event, BuildingEvent::Status(s)
                if s.car == CarId(1) && s.floor == 3 && s.door_state == DoorState::Open)
        })
    });
    let served_1 = BuildingEvent::Served { request: RequestId(1), car: CarId(1) };
    let served_2 = BuildingEvent::Served { request: RequestId(2), car: CarId(2) };
    running.wait_until("both services", |seen| has(seen, &served_1) && has(seen, &served_2));

    // car 1 passed floor 2 on the way up, never with its doors open
    let moving_with_open_doors = running.seen.iter().any(|event| {
        matches!(event, BuildingEvent::Status(s) if s.state.is_moving() && s.door_state != DoorState::Closed)
    });
    assert!(!moving_with_open_doors);
    running.stop();
}

#[rstest]
fn emergency_hands_the_call_to_the_other_car(mut running: Running) {
    running
        .building
        .press(ButtonEvent::HallCall { floor: 3, direction: Direction::Down })
        .unwrap();
    let assigned = BuildingEvent::Assigned { request: RequestId(1), car: CarId(1) };
    running.wait_until("assignment to car 1", |seen| has(seen, &assigned));

    running.building.sensor(CarId(1), SensorEvent::Emergency).unwrap();

    let served = BuildingEvent::Served { request: RequestId(1), car: CarId(2) };
    running.wait_until("service by car 2", |seen| has(seen, &served));
    assert!(has(&running.seen, &BuildingEvent::Alert(Alert::Emergency { car: CarId(1) })));
    assert!(car_in(&running.seen, CarId(1), CarState::EmergencyStop));
    running.stop();
}

#[rstest]
fn backlog_is_served_once_a_car_is_reset(mut running: Running) {
    for car in [CarId(1), CarId(2)] {
        running.building.sensor(car, SensorEvent::Emergency).unwrap();
    }
    running.wait_until("both cars halted", |seen| {
        car_in(seen, CarId(1), CarState::EmergencyStop) && car_in(seen, CarId(2), CarState::EmergencyStop)
    });

    running
        .building
        .press(ButtonEvent::HallCall { floor: 2, direction: Direction::Up })
        .unwrap();
    let held = BuildingEvent::Backlogged { request: RequestId(1) };
    running.wait_until("backlog entry", |seen| has(seen, &held));

    running.building.reset(CarId(2)).unwrap();
    let served = BuildingEvent::Served { request: RequestId(1), car: CarId(2) };
    running.wait_until("service after reset", |seen| has(seen, &served));
    assert!(car_in(&running.seen, CarId(1), CarState::EmergencyStop));
    running.stop();
}

#[rstest]
fn destination_pressed_inside_the_car_is_served(mut running: Running) {
    running
        .building
        .press(ButtonEvent::HallCall { floor: 1, direction: Direction::Up })
        .unwrap();
    running.wait_until("car 1 doors open", |seen| {
        seen.iter().any(|event| {
            matches!(event, BuildingEvent::Status(s)
                if s.car == CarId(1) && s.state == CarState::DoorOpen && s.door_state == DoorState::Open)
        })
    });

    running
        .building
        .press(ButtonEvent::CarCall { car: CarId(1), floor: 3 })
        .unwrap();
    let served = BuildingEvent::Served { request: RequestId(2), car: CarId(1) };
    running.wait_until("destination reached", |seen| has(seen, &served));
    running.stop();
}

#[rstest]
fn car_call_with_closed_doors_is_refused(mut running: Running) {
    let button = ButtonEvent::CarCall { car: CarId(2), floor: 3 };
    running.building.press(button).unwrap();

    running.wait_until("refusal", |seen| {
        seen.iter()
            .any(|event| matches!(event, BuildingEvent::Refused { button: b, .. } if *b == button))
    });
    running.stop();
}
