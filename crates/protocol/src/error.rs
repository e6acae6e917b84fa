//! Protocol error types.

use thiserror::Error;

use crate::DropletId;

/// Errors that can occur while decoding a snapshot.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed snapshot payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Droplet id {0} appears more than once in a snapshot")]
    DuplicateId(DropletId),
}
