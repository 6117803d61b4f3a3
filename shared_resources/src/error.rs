use thiserror::Error;

use crate::ids::Floor;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("floor {0} is outside the building")]
    FloorOutOfRange(Floor),

    #[error("a hall call needs a direction of travel")]
    MissingDirection,

    #[error("destination {0} is the floor the passenger is already on")]
    SameFloor(Floor),
}

pub type RequestResult<T> = Result<T, RequestError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
