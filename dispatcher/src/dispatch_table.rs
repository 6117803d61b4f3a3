use std::collections::BTreeMap;
use std::time::Instant;

use shared_resources::direction::Direction;
use shared_resources::ids::{CarId, Floor, RequestId};
use shared_resources::request::Request;

use crate::error::{DispatchError, DispatchResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub request: Request,
    pub car: CarId,
    pub assigned_at: Instant,
}

/// Which car owns which request. A request id is in the table at most once.
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    entries: BTreeMap<RequestId, Assignment>,
}

impl DispatchTable {
    pub fn new() -> Self {
        DispatchTable::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.entries.values()
    }

    pub fn insert(&mut self, request: Request, car: CarId, now: Instant) -> DispatchResult<()> {
        if let Some(existing) = self.entries.get(&request.id) {
            return Err(DispatchError::AlreadyAssigned {
                request: request.id,
                car: existing.car,
            });
        }
        self.entries.insert(
            request.id,
            Assignment {
                request,
                car,
                assigned_at: now,
            },
        );
        Ok(())
    }

    pub fn car_of(&self, id: RequestId) -> Option<CarId> {
        self.entries.get(&id).map(|assignment| assignment.car)
    }

    /// Removes `id` only while it belongs to `car`.
    pub fn release(&mut self, id: RequestId, car: CarId) -> Option<Request> {
        if self.car_of(id) != Some(car) {
            return None;
        }
        self.entries.remove(&id).map(|assignment| assignment.request)
    }

    /// An unserved hall call for the same landing button.
    pub fn find_hall_call(&self, floor: Floor, direction: Direction) -> Option<&Assignment> {
        self.entries.values().find(|assignment| {
            assignment.request.is_hall_call()
                && assignment.request.origin == floor
                && assignment.request.direction == direction
        })
    }

    pub fn assignments_of(&self, car: CarId) -> impl Iterator<Item = &Assignment> {
        self.entries
            .values()
            .filter(move |assignment| assignment.car == car)
    }

    pub fn has_assignments(&self, car: CarId) -> bool {
        self.assignments_of(car).next().is_some()
    }

    pub fn targets_of(&self, car: CarId) -> impl Iterator<Item = Floor> + '_ {
        self.assignments_of(car)
            .map(|assignment| assignment.request.target_floor())
    }

    /// Everything `car` still owns, oldest request first.
    pub fn take_car(&mut self, car: CarId) -> Vec<Request> {
        let ids: Vec<RequestId> = self.assignments_of(car).map(|a| a.request.id).collect();
        ids.into_iter()
            .filter_map(|id| self.entries.remove(&id))
            .map(|assignment| assignment.request)
            .collect()
    }
}
