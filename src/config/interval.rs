use crate::error::BacktestError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MINUTES_PER_YEAR: f64 = 365.0 * 24.0 * 60.0;
const HOURS_PER_YEAR: f64 = 365.0 * 24.0;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const WEEKS_PER_YEAR: f64 = 52.0;
const MONTHS_PER_YEAR: f64 = 12.0;

//spacing of the bars fed to the engine, drives return annualization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BarInterval {
    Minutes(u32),
    Hours(u32),
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl BarInterval {
    //number of bars in one year
    pub fn periods_per_year(&self) -> f64 {
        match self {
            BarInterval::Minutes(n) => MINUTES_PER_YEAR / (*n).max(1) as f64,
            BarInterval::Hours(n) => HOURS_PER_YEAR / (*n).max(1) as f64,
            BarInterval::Daily => TRADING_DAYS_PER_YEAR,
            BarInterval::Weekly => WEEKS_PER_YEAR,
            BarInterval::Monthly => MONTHS_PER_YEAR,
        }
    }

    //maps a typical bar spacing onto the closest interval
    //anything from one to six days counts as daily so weekends and holidays don't skew it
    pub fn from_spacing(spacing: Duration) -> Self {
        let secs = spacing.num_seconds().max(60);

        if secs >= Duration::days(28).num_seconds() {
            BarInterval::Monthly
        } else if secs >= Duration::days(7).num_seconds() {
            BarInterval::Weekly
        } else if secs >= Duration::days(1).num_seconds() {
            BarInterval::Daily
        } else if secs >= 3600 {
            BarInterval::Hours((secs / 3600) as u32)
        } else {
            BarInterval::Minutes((secs / 60) as u32)
        }
    }
}

impl fmt::Display for BarInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarInterval::Minutes(n) => write!(f, "{}m", n),
            BarInterval::Hours(n) => write!(f, "{}h", n),
            BarInterval::Daily => write!(f, "1d"),
            BarInterval::Weekly => write!(f, "1w"),
            BarInterval::Monthly => write!(f, "1mo"),
        }
    }
}

impl FromStr for BarInterval {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(s.len());
        let (count, unit) = s.split_at(split);

        let count: u32 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| BacktestError::invalid_config(format!("bad interval '{}'", s)))?
        };
        if count == 0 {
            return Err(BacktestError::invalid_config(format!(
                "interval '{}' must be positive",
                s
            )));
        }

        match (unit, count) {
            ("m" | "min", n) => Ok(BarInterval::Minutes(n)),
            ("h", n) => Ok(BarInterval::Hours(n)),
            ("d", 1) => Ok(BarInterval::Daily),
            ("w", 1) => Ok(BarInterval::Weekly),
            ("mo" | "mon", 1) => Ok(BarInterval::Monthly),
            _ => Err(BacktestError::invalid_config(format!(
                "unsupported interval '{}'",
                s
            ))),
        }
    }
}

impl TryFrom<String> for BarInterval {
    type Error = BacktestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BarInterval> for String {
    fn from(value: BarInterval) -> Self {
        value.to_string()
    }
}
