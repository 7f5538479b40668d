//! Crate-level error type.

use crate::scene::serialization::SerializationError;
use crate::scene::SceneError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot start operation '{requested}' while '{open}' is still open")]
    OperationInProgress { open: String, requested: String },
    #[error("no open operation to {action}")]
    NoOpenOperation { action: &'static str },
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}
