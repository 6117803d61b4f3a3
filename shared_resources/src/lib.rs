//! Types shared by the car controllers and the dispatcher: requests, ids,
//! hardware events, car status snapshots and building configuration.

pub mod call;
pub mod car_status;
pub mod config;
pub mod direction;
pub mod error;
pub mod events;
pub mod ids;
pub mod request;
