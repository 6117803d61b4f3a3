use std::collections::{BTreeMap, VecDeque};
use std::io::{self, Stdout, Write};

use crossterm::{cursor, terminal, ExecutableCommand};

use shared_resources::car_status::CarStatus;
use shared_resources::ids::CarId;

use crate::service::BuildingEvent;

const RECENT_ALERTS: usize = 5;

/// Live status table of every car, redrawn in place on each change.
pub struct Dashboard {
    stdout: Stdout,
    cars: BTreeMap<CarId, CarStatus>,
    alerts: VecDeque<String>,
    drawn: u16,
}

fn stops(status: &CarStatus) -> String {
    let up: Vec<String> = status.up_stops.iter().map(|f| f.to_string()).collect();
    let down: Vec<String> = status.down_stops.iter().map(|f| f.to_string()).collect();
    format!("^{} v{}", up.join(","), down.join(","))
}

impl Dashboard {
    pub fn new() -> Self {
        Dashboard {
            stdout: io::stdout(),
            cars: BTreeMap::new(),
            alerts: VecDeque::with_capacity(RECENT_ALERTS),
            drawn: 0,
        }
    }

    pub fn update(&mut self, event: &BuildingEvent) -> io::Result<()> {
        match event {
            BuildingEvent::Status(status) => {
                self.cars.insert(status.car, status.clone());
            }
            BuildingEvent::Alert(alert) => {
                if self.alerts.len() == RECENT_ALERTS {
                    self.alerts.pop_front();
                }
                self.alerts.push_back(alert.to_string());
            }
            _ => return Ok(()),
        }
        self.printstatus()
    }

    fn printstatus(&mut self) -> io::Result<()> {
        let mut table = Vec::new();
        let lines = self.render(&mut table)?;
        if self.drawn > 0 {
            self.stdout.execute(cursor::MoveUp(self.drawn))?;
        }
        self.stdout
            .execute(terminal::Clear(terminal::ClearType::FromCursorDown))?;
        self.stdout.write_all(&table)?;
        self.stdout.flush()?;
        self.drawn = lines;
        Ok(())
    }

    /// Writes the table and returns the number of lines written.
    pub fn render(&self, out: &mut impl Write) -> io::Result<u16> {
        let rule = "+--------+--------------+-------+------+---------+-----------+----------------------+";
        let mut lines = 0;
        let mut line = |out: &mut dyn Write, text: String| -> io::Result<()> {
            lines += 1;
            writeln!(out, "{text}")
        };
        line(out, rule.to_string())?;
        line(
            out,
            format!(
                "| {0:<6} | {1:<12} | {2:<5} | {3:<4} | {4:<7} | {5:<9} | {6:<20} |",
                "CAR", "STATE", "FLOOR", "DIR", "DOORS", "LOAD", "STOPS"
            ),
        )?;
        line(out, rule.to_string())?;
        for status in self.cars.values() {
            let load = format!(
                "{}/{}{}",
                status.load,
                status.capacity,
                if status.overloaded { " !" } else { "" }
            );
            line(
                out,
                format!(
                    "| {0:<6} | {1:<12} | {2:<5} | {3:<4} | {4:<7} | {5:<9} | {6:<20} |",
                    status.car.to_string(),
                    status.state.as_str(),
                    status.floor,
                    status.direction.as_str(),
                    status.door_state.as_str(),
                    load,
                    stops(status)
                ),
            )?;
        }
        line(out, rule.to_string())?;
        for alert in &self.alerts {
            line(out, format!("ALERT {alert}"))?;
        }
        Ok(lines)
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Dashboard::new()
    }
}

#[cfg(test)]
mod tests {
    use shared_resources::car_status::{CarState, DoorState};
    use shared_resources::direction::Direction;
    use shared_resources::events::Alert;

    use super::*;

    #[test]
    fn table_has_a_row_per_car_and_recent_alerts() {
        let mut dashboard = Dashboard::new();
        let status = CarStatus {
            car: CarId(2),
            floor: 4,
            direction: Direction::Up,
            state: CarState::MovingUp,
            door_state: DoorState::Closed,
            load: 3,
            capacity: 8,
            overloaded: false,
            up_stops: vec![6, 7],
            down_stops: vec![],
            parking: None,
        };
        dashboard.cars.insert(status.car, status);
        dashboard.alerts.push_back(Alert::Emergency { car: CarId(1) }.to_string());

        let mut out = Vec::new();
        let lines = dashboard.render(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(lines, 6);
        assert!(text.contains("car#2"));
        assert!(text.contains("movingUp"));
        assert!(text.contains("^6,7 v"));
        assert!(text.contains("ALERT car#1 emergency stop"));
    }
}
