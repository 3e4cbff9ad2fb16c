use crate::data::bar::BarError;
use thiserror::Error;

//errors raised by the backtest pipeline
//each one aborts the run for a single parameter set only
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BacktestError {
    #[error("Insufficient data: {available} bars available, EMA period {required} needs at least {required}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Data integrity error at bar {index}: {reason}")]
    DataIntegrity { index: usize, reason: String },

    #[error("Invalid bar at index {index}: {source}")]
    InvalidBar {
        index: usize,
        #[source]
        source: BarError,
    },
}

impl BacktestError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        BacktestError::InvalidConfiguration(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, BacktestError>;
