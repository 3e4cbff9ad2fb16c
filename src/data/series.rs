use crate::data::bar::Bar;
use crate::error::{BacktestError, Result};
use chrono::Duration;
use serde::Serialize;

//immutable, strictly time-ordered sequence of bars for a single symbol
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    //validates every bar and the ordering, then takes ownership of the bars
    pub fn new(bars: Vec<Bar>) -> Result<Self> {
        for (index, bar) in bars.iter().enumerate() {
            //bars built with new_unchecked get the full ohlcv check here
            bar.validate()
                .map_err(|source| BacktestError::InvalidBar { index, source })?;

            if index == 0 {
                continue;
            }

            let prev = &bars[index - 1];
            if bar.timestamp == prev.timestamp {
                return Err(BacktestError::DataIntegrity {
                    index,
                    reason: format!("duplicate timestamp {}", bar.timestamp.to_rfc3339()),
                });
            }
            if bar.timestamp < prev.timestamp {
                return Err(BacktestError::DataIntegrity {
                    index,
                    reason: format!(
                        "timestamp {} precedes previous bar {}",
                        bar.timestamp.to_rfc3339(),
                        prev.timestamp.to_rfc3339()
                    ),
                });
            }
        }

        Ok(BarSeries { bars })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    //returns the close prices in order
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    //median spacing between consecutive bars
    //none when fewer than two bars
    pub fn median_spacing(&self) -> Option<Duration> {
        if self.bars.len() < 2 {
            return None;
        }

        let mut gaps: Vec<i64> = self
            .bars
            .windows(2)
            .map(|w| (w[1].timestamp - w[0].timestamp).num_seconds())
            .collect();
        gaps.sort_unstable();

        Some(Duration::seconds(gaps[gaps.len() / 2]))
    }
}

impl<'a> IntoIterator for &'a BarSeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}
