pub mod ema_channel;

use crate::config::EmaSeed;
use crate::data::BarSeries;
use crate::error::Result;
use serde::{Deserialize, Serialize};

//what the strategy wants done on a bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

//one signal per bar, index into the bar series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub index: usize,
    pub kind: SignalKind,
}

impl Signal {
    pub fn new(index: usize, kind: SignalKind) -> Self {
        Signal { index, kind }
    }

    pub fn hold(index: usize) -> Self {
        Signal::new(index, SignalKind::Hold)
    }

    pub fn is_actionable(&self) -> bool {
        self.kind != SignalKind::Hold
    }
}

//strategy interface: bars in, one signal per bar out
//signal t must only look at bars 0..=t
pub trait Strategy: Send + Sync {
    //returns the strategy name
    fn name(&self) -> &str;

    //fewest bars that can produce a non-hold signal
    fn required_bars(&self) -> usize;

    fn generate_signals(&self, bars: &BarSeries) -> Result<Vec<Signal>>;
}

//helper function to calculate an exponential moving average
//values inside the warm-up window are none
pub fn ema(values: &[f64], period: usize, seed: EmaSeed) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    if values.is_empty() || period == 0 {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev: Option<f64> = None;

    for (i, &value) in values.iter().enumerate() {
        let current = match (prev, seed) {
            (Some(p), _) => alpha * value + (1.0 - alpha) * p,
            (None, EmaSeed::FirstValue) => value,
            (None, EmaSeed::Sma) if i + 1 == period => {
                values[..period].iter().sum::<f64>() / period as f64
            }
            (None, EmaSeed::Sma) => {
                result.push(None);
                continue;
            }
        };
        prev = Some(current);

        //first-value seeding still reports the warm-up bars as undefined
        result.push(if i + 1 >= period { Some(current) } else { None });
    }

    result
}

//signal statistics for reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub total_signals: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    //actionable signals per bar
    pub signal_frequency: f64,
    pub avg_interval_days: f64,
    pub max_interval_days: f64,
    pub min_interval_days: f64,
}

impl SignalSummary {
    pub fn from_signals(signals: &[Signal], bars: &BarSeries) -> Self {
        let actionable: Vec<&Signal> = signals.iter().filter(|s| s.is_actionable()).collect();
        let buy_signals = actionable
            .iter()
            .filter(|s| s.kind == SignalKind::Buy)
            .count();
        let sell_signals = actionable.len() - buy_signals;

        let signal_frequency = if bars.is_empty() {
            0.0
        } else {
            actionable.len() as f64 / bars.len() as f64
        };

        let intervals: Vec<f64> = actionable
            .windows(2)
            .filter_map(|w| {
                let a = bars.get(w[0].index)?;
                let b = bars.get(w[1].index)?;
                Some((b.timestamp - a.timestamp).num_seconds() as f64 / 86_400.0)
            })
            .collect();

        let (avg, max, min) = if intervals.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (
                intervals.iter().sum::<f64>() / intervals.len() as f64,
                intervals.iter().cloned().fold(f64::MIN, f64::max),
                intervals.iter().cloned().fold(f64::MAX, f64::min),
            )
        };

        SignalSummary {
            total_signals: actionable.len(),
            buy_signals,
            sell_signals,
            signal_frequency,
            avg_interval_days: avg,
            max_interval_days: max,
            min_interval_days: min,
        }
    }
}
