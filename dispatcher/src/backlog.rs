/// ----- BACKLOG -----
/// Hall calls no car can take right now. Entries keep the time they were
/// first held so a starving request is reported once, however often it is
/// retried.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use shared_resources::direction::Direction;
use shared_resources::ids::{Floor, RequestId};
use shared_resources::request::Request;

#[derive(Debug, Clone)]
struct Held {
    request: Request,
    since: Instant,
    alerted: bool,
}

#[derive(Debug, Clone)]
pub struct Backlog {
    held: VecDeque<Held>,
    alert_after: Duration,
}

impl Backlog {
    pub fn new(alert_after: Duration) -> Self {
        Backlog {
            held: VecDeque::new(),
            alert_after,
        }
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.held.iter().any(|held| held.request.id == id)
    }

    pub fn requests(&self) -> impl Iterator<Item = &Request> {
        self.held.iter().map(|held| &held.request)
    }

    pub fn hold(&mut self, request: Request, now: Instant) {
        if self.contains(request.id) {
            return;
        }
        self.held.push_back(Held {
            request,
            since: now,
            alerted: false,
        });
    }

    pub fn find_hall_call(&self, floor: Floor, direction: Direction) -> Option<&Request> {
        self.requests().find(|request| {
            request.is_hall_call() && request.origin == floor && request.direction == direction
        })
    }

    pub fn withdraw(&mut self, id: RequestId) -> Option<Request> {
        let index = self.held.iter().position(|held| held.request.id == id)?;
        self.held.remove(index).map(|held| held.request)
    }

    /// Empties the backlog, oldest first.
    pub fn take(&mut self) -> Vec<Request> {
        self.held.drain(..).map(|held| held.request).collect()
    }

    pub fn oldest_age(&self, now: Instant) -> Option<Duration> {
        self.held
            .iter()
            .map(|held| now.saturating_duration_since(held.since))
            .max()
    }

    /// Requests that crossed the alert threshold since the last call.
    pub fn newly_overdue(&mut self, now: Instant) -> Vec<RequestId> {
        let alert_after = self.alert_after;
        self.held
            .iter_mut()
            .filter(|held| !held.alerted && now.saturating_duration_since(held.since) >= alert_after)
            .map(|held| {
                held.alerted = true;
                held.request.id
            })
            .collect()
    }
}
