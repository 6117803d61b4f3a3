use thiserror::Error;

use shared_resources::ids::CarId;

#[derive(Debug, Error)]
pub enum CarError {
    #[error("{0}: hardware command channel closed")]
    CommandChannelClosed(CarId),

    #[error("{0}: dispatcher report channel closed")]
    ReportChannelClosed(CarId),

    #[error("could not start control loop: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type CarResult<T> = Result<T, CarError>;
