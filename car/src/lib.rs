//! Control of a single elevator car: the state machine, its SCAN stop
//! queue, the safety monitor that gates every transition, and the control
//! loop that runs it all on a dedicated thread.

pub mod controller;
pub mod doors;
pub mod error;
pub mod fsm;
pub mod messages;
pub mod requests;
pub mod safety;
pub mod watchdog;

pub use fsm::Car;
pub use messages::{CarMessage, CarReport, Effect};
