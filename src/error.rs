use thiserror::Error;

/// Errors raised by the pose tracker.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed keypoints: flat length {len} is not a multiple of 3")]
    MalformedKeypoints { len: usize },

    #[error("Keypoint count mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// A track survived the claim phase but no detection carries its id.
    #[error("Track {id} survived matching without a detection")]
    MissingMatch { id: u32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
