use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Invalid scale parameters: {0}")]
    InvalidParameters(String),

    #[error("Channel index {index} out of bounds for matrix with {n_channels} channels")]
    ChannelOutOfBounds { index: usize, n_channels: usize },

    #[error("Scale solve did not converge for input {value} after {iterations} iterations")]
    Convergence { value: f64, iterations: usize },

    #[error("No root bracketed for input {value} within {limit} scale units")]
    BracketExceeded { value: f64, limit: f64 },
}

pub type Result<T> = std::result::Result<T, TransformError>;
