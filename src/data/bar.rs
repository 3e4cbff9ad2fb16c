use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BarError {
    #[error("Non-finite price in bar at {0}")]
    NonFinite(DateTime<Utc>),
    #[error("Bar high ({high}) below low ({low})")]
    InvalidHighLow { high: f64, low: f64 },
    #[error("Bar close ({close}) outside [{low}, {high}]")]
    InvalidClose { close: f64, high: f64, low: f64 },
    #[error("Bar open ({open}) outside [{low}, {high}]")]
    InvalidOpen { open: f64, high: f64, low: f64 },
    #[error("Non-positive price: low is {0}")]
    NonPositivePrice(f64),
    #[error("Negative volume: {0}")]
    NegativeVolume(f64),
}

//one ohlcv observation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, BarError> {
        let bar = Bar::new_unchecked(timestamp, open, high, low, close, volume);
        bar.validate()?;
        Ok(bar)
    }

    pub fn new_unchecked(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    //open = high = low = close, zero volume
    pub fn flat(timestamp: DateTime<Utc>, close: f64) -> Self {
        Bar::new_unchecked(timestamp, close, close, close, close, 0.0)
    }

    //checks the ohlc envelope, price sign and volume sign
    pub fn validate(&self) -> Result<(), BarError> {
        let Bar {
            open,
            high,
            low,
            close,
            volume,
            ..
        } = *self;

        if [open, high, low, close, volume].iter().any(|v| !v.is_finite()) {
            return Err(BarError::NonFinite(self.timestamp));
        }
        if high < low {
            return Err(BarError::InvalidHighLow { high, low });
        }
        if !(low..=high).contains(&close) {
            return Err(BarError::InvalidClose { close, high, low });
        }
        if !(low..=high).contains(&open) {
            return Err(BarError::InvalidOpen { open, high, low });
        }
        //every price sits in [low, high], fills and returns divide by them
        if low <= 0.0 {
            return Err(BarError::NonPositivePrice(low));
        }
        if volume < 0.0 {
            return Err(BarError::NegativeVolume(volume));
        }
        Ok(())
    }
}
