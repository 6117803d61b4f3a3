/// ----- SAFETY MONITOR -----
/// Sits between the state machine and the hardware of one car. Every
/// transition that moves the car or its doors is checked here first;
/// rejected transitions are logged and kept in a short audit trail.

use std::collections::VecDeque;

use thiserror::Error;
use tracing::warn;

use shared_resources::car_status::{CarState, DoorState};
use shared_resources::direction::Direction;
use shared_resources::events::Alert;
use shared_resources::ids::CarId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Depart(Direction),
    OpenDoors,
    CloseDoors,
    /// Not requested by the state machine: reported by the door sensor.
    DoorsOpenedWhileMoving,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VetoReason {
    #[error("doors are {}, not closed", .0.as_str())]
    DoorsNotClosed(DoorState),

    #[error("load {load} exceeds capacity {capacity}")]
    Overloaded { load: u16, capacity: u16 },

    #[error("car is halted in {}", .0.as_str())]
    Halted(CarState),

    #[error("car is {} and has not stopped", .0.as_str())]
    StillMoving(CarState),

    #[error("door interlock broken")]
    InterlockBroken,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{car}: {attempted:?} vetoed, {reason}")]
pub struct Veto {
    pub car: CarId,
    pub attempted: Transition,
    pub reason: VetoReason,
}

/// What the monitor needs to know about the car to judge a transition.
#[derive(Debug, Clone, Copy)]
pub struct Gate {
    pub state: CarState,
    pub door_state: DoorState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadVerdict {
    Approved(u16),
    Overloaded(u16),
}

#[derive(Debug, Clone)]
pub struct SafetyMonitor {
    car: CarId,
    capacity: u16,
    measured_load: u16,
    overload_switch: bool,
    alarm_raised: bool,
    audit: VecDeque<Veto>,
    audit_capacity: usize,
}

impl SafetyMonitor {
    pub fn new(car: CarId, capacity: u16, audit_capacity: usize) -> Self {
        SafetyMonitor {
            car,
            capacity,
            measured_load: 0,
            overload_switch: false,
            alarm_raised: false,
            audit: VecDeque::with_capacity(audit_capacity),
            audit_capacity,
        }
    }

    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    pub fn is_overloaded(&self) -> bool {
        self.measured_load > self.capacity || self.overload_switch
    }

    /// A reading within capacity may be committed as the car's load;
    /// anything above it is held here and blocks departure.
    pub fn record_load(&mut self, load: u16) -> LoadVerdict {
        self.measured_load = load;
        if load > self.capacity {
            LoadVerdict::Overloaded(load)
        } else {
            if !self.is_overloaded() {
                self.alarm_raised = false;
            }
            LoadVerdict::Approved(load)
        }
    }

    pub fn set_overload_switch(&mut self, on: bool) {
        self.overload_switch = on;
        if !self.is_overloaded() {
            self.alarm_raised = false;
        }
    }

    /// The overload alarm, raised once per overload episode.
    pub fn take_alarm(&mut self) -> Option<Alert> {
        if !self.is_overloaded() || self.alarm_raised {
            return None;
        }
        self.alarm_raised = true;
        Some(Alert::Overload {
            car: self.car,
            load: self.measured_load,
            capacity: self.capacity,
        })
    }

    pub fn check(&mut self, gate: Gate, attempted: Transition) -> Result<(), Veto> {
        match self.judge(gate, attempted) {
            None => Ok(()),
            Some(reason) => Err(self.veto(attempted, reason)),
        }
    }

    fn judge(&self, gate: Gate, attempted: Transition) -> Option<VetoReason> {
        if gate.state.is_halted() {
            return Some(VetoReason::Halted(gate.state));
        }
        let overloaded = VetoReason::Overloaded {
            load: self.measured_load,
            capacity: self.capacity,
        };
        match attempted {
            Transition::Depart(_) if gate.door_state != DoorState::Closed => {
                Some(VetoReason::DoorsNotClosed(gate.door_state))
            }
            Transition::Depart(_) | Transition::CloseDoors if self.is_overloaded() => Some(overloaded),
            Transition::OpenDoors if gate.state.is_moving() => Some(VetoReason::StillMoving(gate.state)),
            Transition::DoorsOpenedWhileMoving => Some(VetoReason::InterlockBroken),
            _ => None,
        }
    }

    /// Records a fault detected outside of `check`, e.g. from a sensor.
    pub fn veto(&mut self, attempted: Transition, reason: VetoReason) -> Veto {
        let veto = Veto {
            car: self.car,
            attempted,
            reason,
        };
        warn!(
            target: "safety",
            car = %veto.car,
            attempted = ?veto.attempted,
            reason = %veto.reason,
            "transition vetoed"
        );
        if self.audit_capacity > 0 {
            if self.audit.len() == self.audit_capacity {
                self.audit.pop_front();
            }
            self.audit.push_back(veto.clone());
        }
        veto
    }

    pub fn audit(&self) -> impl Iterator<Item = &Veto> {
        self.audit.iter()
    }

    pub fn clear_alarm(&mut self) {
        self.alarm_raised = false;
    }
}
