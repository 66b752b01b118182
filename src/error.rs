use crate::io::ReadError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("energy kernel failed: {0}")]
    Kernel(String),
    #[error("energy has not been computed yet")]
    NotComputedYet,
    #[error("empty velocity search window at {frequency} Hz (velocity index {index})")]
    DegenerateSearchWindow { frequency: f64, index: usize },
    #[error("failed to read seismic record")]
    Read(#[from] ReadError),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidParameter(msg.into())
}

pub(crate) fn shape(msg: impl Into<String>) -> Error {
    Error::ShapeMismatch(msg.into())
}
