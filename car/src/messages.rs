use shared_resources::car_status::CarStatus;
use shared_resources::events::{Alert, Command, SensorEvent};
use shared_resources::ids::{CarId, Floor, RequestId};
use shared_resources::request::Request;

/// Everything a car's control loop accepts through its inbox.
#[derive(Debug, Clone, PartialEq)]
pub enum CarMessage {
    /// Hall call chosen for this car by the dispatcher.
    Assign(Request),
    /// Destination pressed inside the car.
    CarCall(Request),
    Sensor(SensorEvent),
    /// Best-effort relocation of an idle car.
    Park(Floor),
    /// Door close button.
    CloseDoor,
    /// Maintenance reset after a fault or emergency.
    Reset,
    Shutdown,
}

/// Everything a car tells the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum CarReport {
    Status(CarStatus),
    Served { car: CarId, request: RequestId },
    /// Requests handed back because the car can no longer serve them.
    Surrendered { car: CarId, requests: Vec<Request> },
    Rejected { car: CarId, request: Request, reason: String },
    Alert(Alert),
}

/// Output of one state machine step, in the order it was produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Command(Command),
    Report(CarReport),
}
