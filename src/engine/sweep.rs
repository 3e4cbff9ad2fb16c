use crate::config::StrategyParams;
use crate::engine::backtest::BacktestEngine;
use crate::error::Result;
use crate::metrics::PerformanceReport;
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::warn;

//evaluates the ema channel strategy over a set of ema periods
//every period is an independent run, a failure only affects its own entry
pub struct ParameterSweep<'a> {
    engine: &'a BacktestEngine,
    base: StrategyParams,
    periods: Vec<usize>,
}

impl<'a> ParameterSweep<'a> {
    //duplicate periods are dropped, first occurrence wins
    pub fn new(engine: &'a BacktestEngine, base: StrategyParams, periods: &[usize]) -> Self {
        let mut unique: Vec<usize> = Vec::with_capacity(periods.len());
        for &period in periods {
            if !unique.contains(&period) {
                unique.push(period);
            }
        }

        ParameterSweep {
            engine,
            base,
            periods: unique,
        }
    }

    pub fn periods(&self) -> &[usize] {
        &self.periods
    }

    //lazily evaluates one period at a time, calling it again restarts from the first period
    pub fn iter(&self) -> impl Iterator<Item = (usize, Result<PerformanceReport>)> + '_ {
        self.periods
            .iter()
            .map(move |&period| (period, self.evaluate(period)))
    }

    //fans the periods out over the rayon pool, keyed by period in input order
    pub fn run_parallel(&self) -> IndexMap<usize, Result<PerformanceReport>> {
        let results: Vec<(usize, Result<PerformanceReport>)> = self
            .periods
            .par_iter()
            .map(|&period| (period, self.evaluate(period)))
            .collect();

        results.into_iter().collect()
    }

    //sequential counterpart of run_parallel
    pub fn run(&self) -> IndexMap<usize, Result<PerformanceReport>> {
        self.iter().collect()
    }

    fn evaluate(&self, period: usize) -> Result<PerformanceReport> {
        let params = self.base.with_period(period);
        match self.engine.run_params(params) {
            Ok(result) => Ok(result.report),
            Err(err) => {
                warn!(ema_period = period, error = %err, "sweep run failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Bar, BarSeries};
    use crate::engine::BacktestConfig;
    use crate::error::BacktestError;
    use chrono::{Duration, TimeZone, Utc};

    fn engine(n: usize) -> BacktestEngine {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.7).sin() * 10.0 + i as f64 * 0.2;
                Bar::flat(start + Duration::days(i as i64), close)
            })
            .collect();
        BacktestEngine::new(BacktestConfig::default(), BarSeries::new(bars).unwrap())
    }

    #[test]
    fn test_failed_period_does_not_stop_sweep() {
        let engine = engine(30);
        let sweep = ParameterSweep::new(&engine, StrategyParams::new(5, 0.01), &[5, 50, 10]);
        let results = sweep.run();

        assert_eq!(results.keys().copied().collect::<Vec<_>>(), vec![5, 50, 10]);
        assert!(results[&5].is_ok());
        assert!(matches!(
            results[&50],
            Err(BacktestError::InsufficientData {
                required: 50,
                available: 30
            })
        ));
        assert!(results[&10].is_ok());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let engine = engine(120);
        let sweep = ParameterSweep::new(
            &engine,
            StrategyParams::new(5, 0.005),
            &[5, 8, 13, 21, 34],
        );
        let sequential = sweep.run();
        let parallel = sweep.run_parallel();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_iter_is_restartable() {
        let engine = engine(60);
        let sweep = ParameterSweep::new(&engine, StrategyParams::new(5, 0.01), &[5, 10]);
        let first: Vec<usize> = sweep.iter().map(|(p, _)| p).collect();
        let second: Vec<usize> = sweep.iter().map(|(p, _)| p).collect();
        assert_eq!(first, vec![5, 10]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_periods_dropped() {
        let engine = engine(20);
        let sweep = ParameterSweep::new(&engine, StrategyParams::default(), &[7, 3, 7]);
        assert_eq!(sweep.periods(), &[7, 3]);
    }
}
