use crate::config::{
    BarInterval, StrategyParams, DEFAULT_COMMISSION_RATE, DEFAULT_INITIAL_CAPITAL,
};
use crate::data::BarSeries;
use crate::engine::execution::{ExecutedTrade, ExecutionEngine, FillPrice, TradeSide};
use crate::error::{BacktestError, Result};
use crate::metrics::{
    match_round_trips, monthly_returns, BenchmarkComparison, EquityCurveBuilder, EquityPoint,
    MonthlyReturn, PerformanceAnalyzer, PerformanceReport, RoundTrip,
};
use crate::portfolio::Account;
use crate::strategy::ema_channel::EmaChannelStrategy;
use crate::strategy::{Signal, SignalKind, SignalSummary, Strategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

//configuration for a backtest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    //fraction of notional per side, in [0, 1)
    pub commission_rate: f64,
    pub fill_price: FillPrice,
    //annual, as a fraction
    pub risk_free_rate: f64,
    //inferred from the bar spacing when none
    pub interval: Option<BarInterval>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            commission_rate: DEFAULT_COMMISSION_RATE,
            fill_price: FillPrice::Close,
            risk_free_rate: 0.0,
            interval: None,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(BacktestError::invalid_config(format!(
                "initial_capital must be > 0, got {}",
                self.initial_capital
            )));
        }
        if !self.commission_rate.is_finite() || !(0.0..1.0).contains(&self.commission_rate) {
            return Err(BacktestError::invalid_config(format!(
                "commission_rate must be in [0, 1), got {}",
                self.commission_rate
            )));
        }
        if !self.risk_free_rate.is_finite() || self.risk_free_rate < 0.0 {
            return Err(BacktestError::invalid_config(format!(
                "risk_free_rate must be >= 0, got {}",
                self.risk_free_rate
            )));
        }
        Ok(())
    }
}

//raw output of the portfolio simulator
#[derive(Debug, Clone, Serialize)]
pub struct Simulation {
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<ExecutedTrade>,
    pub total_commission: f64,
    //true when the run ended long, the position is marked but not realized
    pub open_at_end: bool,
}

//result of a backtest
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub strategy: String,
    pub interval: BarInterval,
    pub signals: Vec<Signal>,
    pub signal_summary: SignalSummary,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<ExecutedTrade>,
    pub round_trips: Vec<RoundTrip>,
    pub monthly_returns: Vec<MonthlyReturn>,
    pub report: PerformanceReport,
    pub benchmark: BenchmarkComparison,
}

//main backtest engine, owns the bars and the run configuration
//runs never share state so one engine can serve many parameter sets
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
    bars: BarSeries,
}

impl BacktestEngine {
    //creates a new backtest engine
    pub fn new(config: BacktestConfig, bars: BarSeries) -> Self {
        BacktestEngine { config, bars }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn bars(&self) -> &BarSeries {
        &self.bars
    }

    //configured interval, or the one implied by the bar spacing
    pub fn interval(&self) -> BarInterval {
        self.config.interval.unwrap_or_else(|| {
            self.bars
                .median_spacing()
                .map(BarInterval::from_spacing)
                .unwrap_or_default()
        })
    }

    pub fn analyzer(&self) -> PerformanceAnalyzer {
        PerformanceAnalyzer::new(self.interval(), self.config.risk_free_rate)
    }

    //advances a flat/long account bar by bar and records equity after each bar's fills
    pub fn simulate(&self, signals: &[Signal]) -> Result<Simulation> {
        self.config.validate()?;

        if signals.len() != self.bars.len() {
            return Err(BacktestError::invalid_config(format!(
                "{} signals for {} bars",
                signals.len(),
                self.bars.len()
            )));
        }

        let mut account = Account::new(self.config.initial_capital, self.config.commission_rate)?;
        let mut execution = ExecutionEngine::new(self.config.fill_price);
        let mut curve = EquityCurveBuilder::with_capacity(self.bars.len());

        for (index, (bar, signal)) in self.bars.iter().zip(signals).enumerate() {
            //orders carried over from the previous bar fill at this open
            if let Some(fill) = execution.process(index, bar) {
                account.process_fill(fill);
            }

            let side = match signal.kind {
                SignalKind::Buy => Some(TradeSide::Buy),
                SignalKind::Sell => Some(TradeSide::Sell),
                SignalKind::Hold => None,
            };

            if let Some(side) = side {
                execution.submit(side, index);
                if let Some(fill) = execution.process(index, bar) {
                    account.process_fill(fill);
                }
            }

            curve.push(bar.timestamp, account.equity(bar.close));
        }

        if let Some(order) = execution.cancel_pending() {
            debug!(
                side = %order.side,
                signal_index = order.signal_index,
                "order left unfilled at end of data"
            );
        }

        Ok(Simulation {
            equity_curve: curve.finish(),
            total_commission: account.total_commission,
            open_at_end: account.position.is_some(),
            trades: account.trade_log,
        })
    }

    //runs the full pipeline for one strategy
    pub fn run(&self, strategy: &dyn Strategy) -> Result<BacktestResult> {
        self.config.validate()?;

        let required = strategy.required_bars();
        if self.bars.len() < required {
            return Err(BacktestError::InsufficientData {
                required,
                available: self.bars.len(),
            });
        }

        info!(
            strategy = strategy.name(),
            bars = self.bars.len(),
            initial_capital = self.config.initial_capital,
            commission_rate = self.config.commission_rate,
            "starting backtest"
        );

        let signals = strategy.generate_signals(&self.bars)?;
        let simulation = self.simulate(&signals)?;
        let round_trips = match_round_trips(&simulation.trades);

        let interval = self.interval();
        let analyzer = PerformanceAnalyzer::new(interval, self.config.risk_free_rate);
        let report = analyzer.analyze(
            self.config.initial_capital,
            &simulation.equity_curve,
            &simulation.trades,
            &round_trips,
        );
        let benchmark =
            analyzer.compare_with_benchmark(&self.bars, &simulation.equity_curve, &report);
        let signal_summary = SignalSummary::from_signals(&signals, &self.bars);
        let months = monthly_returns(&simulation.equity_curve);

        info!(
            strategy = strategy.name(),
            trades = simulation.trades.len(),
            round_trips = round_trips.len(),
            open_at_end = simulation.open_at_end,
            total_return = report.total_return,
            "backtest complete"
        );

        Ok(BacktestResult {
            strategy: strategy.name().to_string(),
            interval,
            signals,
            signal_summary,
            equity_curve: simulation.equity_curve,
            trades: simulation.trades,
            monthly_returns: months,
            round_trips,
            report,
            benchmark,
        })
    }

    //runs the ema channel strategy with the given parameters
    pub fn run_params(&self, params: StrategyParams) -> Result<BacktestResult> {
        let strategy = EmaChannelStrategy::new(params)?;
        self.run(&strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Bar;
    use chrono::{Duration, TimeZone, Utc};

    fn series(prices: &[(f64, f64)]) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        BarSeries::new(
            prices
                .iter()
                .enumerate()
                .map(|(i, &(open, close))| {
                    Bar::new_unchecked(
                        start + Duration::days(i as i64),
                        open,
                        open.max(close),
                        open.min(close),
                        close,
                        0.0,
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    fn signals(kinds: &[SignalKind]) -> Vec<Signal> {
        kinds
            .iter()
            .enumerate()
            .map(|(i, &k)| Signal::new(i, k))
            .collect()
    }

    fn config(commission_rate: f64, fill_price: FillPrice) -> BacktestConfig {
        BacktestConfig {
            initial_capital: 1_000.0,
            commission_rate,
            fill_price,
            ..BacktestConfig::default()
        }
    }

    use SignalKind::{Buy, Hold, Sell};

    #[test]
    fn test_simulate_close_fills() {
        let bars = series(&[(10.0, 10.0), (10.0, 20.0), (20.0, 25.0), (25.0, 15.0)]);
        let engine = BacktestEngine::new(config(0.0, FillPrice::Close), bars);
        let sim = engine
            .simulate(&signals(&[Hold, Buy, Hold, Sell]))
            .unwrap();

        let equity: Vec<f64> = sim.equity_curve.iter().map(|p| p.equity).collect();
        assert_eq!(equity, vec![1_000.0, 1_000.0, 1_250.0, 750.0]);
        assert_eq!(sim.trades.len(), 2);
        assert_eq!(sim.trades[0].price, 20.0);
        assert_eq!(sim.trades[1].price, 15.0);
        assert!(!sim.open_at_end);
        assert!((sim.equity_curve[3].drawdown + 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_simulate_next_open_fills() {
        let bars = series(&[(10.0, 10.0), (10.0, 20.0), (22.0, 25.0), (25.0, 15.0), (12.0, 12.0)]);
        let engine = BacktestEngine::new(config(0.0, FillPrice::NextOpen), bars);
        let sim = engine
            .simulate(&signals(&[Hold, Buy, Hold, Sell, Hold]))
            .unwrap();

        assert_eq!(sim.trades.len(), 2);
        assert_eq!(sim.trades[0].bar_index, 2);
        assert_eq!(sim.trades[0].price, 22.0);
        assert_eq!(sim.trades[1].bar_index, 4);
        assert_eq!(sim.trades[1].price, 12.0);

        //still flat on the signal bar
        assert_eq!(sim.equity_curve[1].equity, 1_000.0);
    }

    #[test]
    fn test_next_open_signal_on_last_bar_never_fills() {
        let bars = series(&[(10.0, 10.0), (10.0, 11.0)]);
        let engine = BacktestEngine::new(config(0.0, FillPrice::NextOpen), bars);
        let sim = engine.simulate(&signals(&[Hold, Buy])).unwrap();
        assert!(sim.trades.is_empty());
        assert_eq!(sim.equity_curve.last().unwrap().equity, 1_000.0);
    }

    #[test]
    fn test_open_position_marked_not_realized() {
        let bars = series(&[(10.0, 10.0), (10.0, 12.0), (12.0, 18.0)]);
        let engine = BacktestEngine::new(config(0.0, FillPrice::Close), bars);
        let sim = engine.simulate(&signals(&[Buy, Hold, Hold])).unwrap();
        assert!(sim.open_at_end);
        assert_eq!(sim.trades.len(), 1);
        assert_eq!(sim.equity_curve.last().unwrap().equity, 1_800.0);
        assert!(match_round_trips(&sim.trades).is_empty());
    }

    #[test]
    fn test_commission_reduces_equity_on_fill() {
        let bars = series(&[(10.0, 10.0), (10.0, 10.0)]);
        let engine = BacktestEngine::new(config(0.01, FillPrice::Close), bars);
        let sim = engine.simulate(&signals(&[Buy, Sell])).unwrap();

        //buy: 1000 = amount*(1.01); sell gives back amount*(0.99)
        let amount = 1_000.0 / 1.01;
        let expected = amount * 0.99;
        assert!((sim.equity_curve[1].equity - expected).abs() < 1e-9);
        assert!((sim.total_commission - amount * 0.02).abs() < 1e-9);
        assert!(sim.equity_curve[0].equity < 1_000.0);
    }

    #[test]
    fn test_invalid_configuration_rejected_before_simulation() {
        let bars = series(&[(10.0, 10.0)]);
        let mut cfg = config(0.0, FillPrice::Close);
        cfg.initial_capital = 0.0;
        let engine = BacktestEngine::new(cfg, bars.clone());
        assert!(matches!(
            engine.simulate(&signals(&[Hold])),
            Err(BacktestError::InvalidConfiguration(_))
        ));

        let engine = BacktestEngine::new(config(1.0, FillPrice::Close), bars);
        assert!(matches!(
            engine.run_params(StrategyParams::new(1, 0.0)),
            Err(BacktestError::InvalidConfiguration(_))
        ));
    }

    struct FixedWarmup(usize);

    impl Strategy for FixedWarmup {
        fn name(&self) -> &str {
            "fixed-warmup"
        }

        fn required_bars(&self) -> usize {
            self.0
        }

        fn generate_signals(&self, bars: &BarSeries) -> Result<Vec<Signal>> {
            Ok((0..bars.len()).map(Signal::hold).collect())
        }
    }

    #[test]
    fn test_run_checks_required_bars() {
        let bars = series(&[(10.0, 10.0), (10.0, 11.0), (11.0, 12.0)]);
        let engine = BacktestEngine::new(config(0.0, FillPrice::Close), bars);

        assert_eq!(
            engine.run(&FixedWarmup(10)).unwrap_err(),
            BacktestError::InsufficientData {
                required: 10,
                available: 3
            }
        );
        let result = engine.run(&FixedWarmup(3)).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.equity_curve.len(), 3);
    }

    #[test]
    fn test_signal_count_mismatch() {
        let bars = series(&[(10.0, 10.0), (10.0, 10.0)]);
        let engine = BacktestEngine::new(config(0.0, FillPrice::Close), bars);
        assert!(engine.simulate(&signals(&[Hold])).is_err());
    }

    #[test]
    fn test_interval_inferred_from_bars() {
        let bars = series(&[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)]);
        let engine = BacktestEngine::new(BacktestConfig::default(), bars.clone());
        assert_eq!(engine.interval(), BarInterval::Daily);

        let engine = BacktestEngine::new(
            BacktestConfig {
                interval: Some(BarInterval::Hours(4)),
                ..BacktestConfig::default()
            },
            bars,
        );
        assert_eq!(engine.interval(), BarInterval::Hours(4));
    }
}
