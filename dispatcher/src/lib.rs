//! Dispatch side of the elevator controller: the dispatcher that assigns
//! requests to cars, the building context that runs it next to the car
//! control loops, and the simulated hardware and console used to drive it.

pub mod backlog;
pub mod building;
pub mod cli;
pub mod console;
pub mod cost;
pub mod debug;
pub mod dispatch_table;
pub mod dispatcher;
pub mod error;
pub mod rebalance;
pub mod service;
pub mod simulator;

pub use building::{Building, CarLink};
pub use service::BuildingEvent;
