use protocol::{DropletId, Location, ProtocolError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("No droplet with id {0}")]
    UnknownDroplet(DropletId),

    #[error("{0} is outside the board")]
    OutOfBounds(Location),

    #[error("Droplet {id} cannot move from {from} to {to} in one step")]
    IllegalMove {
        id: DropletId,
        from: Location,
        to: Location,
    },

    #[error("Droplet id {0} is already in use")]
    DuplicateId(DropletId),

    #[error("Droplets {0} and {1} are too far apart to mix")]
    TooFarToMix(DropletId, DropletId),

    #[error("Droplets {0} and {1} collided")]
    Collision(DropletId, DropletId),

    #[error("Invalid split error model: {0}")]
    ErrorModel(#[from] rand_distr::NormalError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
