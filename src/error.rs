/* ------------------------------------------------------------------ */
/* Error taxonomy for corpus loading and sequence generation          */
/* ------------------------------------------------------------------ */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    /// Invalid combination of generator options.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Corpus statistics disagree with the declared vocabulary.
    #[error("corpus statistics inconsistent with vocabulary: {0}")]
    DataIntegrity(String),
    /// A sampling step cannot be satisfied by the available pool.
    #[error("sampling precondition violated: {0}")]
    SamplingPrecondition(String),
    #[error("malformed corpus statistics: {0}")]
    Artifact(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("batch shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("invalid sampling weights: {0}")]
    Weights(#[from] rand::distr::weighted::Error),
}

pub type Result<T> = std::result::Result<T, DataError>;

impl DataError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn integrity(msg: impl Into<String>) -> Self {
        Self::DataIntegrity(msg.into())
    }

    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        Self::SamplingPrecondition(msg.into())
    }
}
