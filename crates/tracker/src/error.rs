//! Error taxonomy for scoreboard operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoreboardError {
    /// Transport failure or timeout; the request may be retried.
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status.
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid team: {0}")]
    Validation(String),
}

pub type ScoreboardResult<T> = Result<T, ScoreboardError>;

impl ScoreboardError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for ScoreboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
