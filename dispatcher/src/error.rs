use thiserror::Error;

use car::error::CarError;
use shared_resources::error::{ConfigError, RequestError};
use shared_resources::ids::{CarId, RequestId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("no car is able to take {0}, holding it in the backlog")]
    NoEligibleCar(RequestId),

    #[error("{0} is not part of this building")]
    UnknownCar(CarId),

    #[error("{0} does not have its doors open")]
    DoorsNotOpen(CarId),

    #[error("{request} is already assigned to {car}")]
    AlreadyAssigned { request: RequestId, car: CarId },

    #[error("{0} is neither pending nor assigned")]
    UnknownRequest(RequestId),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

#[derive(Debug, Error)]
pub enum BuildingError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Car(#[from] CarError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("could not start {name}: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} channel is closed")]
    Disconnected(&'static str),

    #[error("console: {0}")]
    Console(#[from] std::io::Error),
}

pub type BuildingResult<T> = Result<T, BuildingError>;
