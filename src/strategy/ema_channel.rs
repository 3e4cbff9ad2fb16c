use crate::config::StrategyParams;
use crate::data::BarSeries;
use crate::error::{BacktestError, Result};
use crate::strategy::{ema, Signal, SignalKind, Strategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

//ema channel bands on a single bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelBands {
    pub ema: f64,
    pub upper: f64,
    pub lower: f64,
}

//ema channel breakout strategy
//goes long when close breaks above ema*(1+width)
//exits when close breaks below ema*(1-width)
#[derive(Debug, Clone)]
pub struct EmaChannelStrategy {
    params: StrategyParams,
    name: String,
}

impl EmaChannelStrategy {
    pub fn new(params: StrategyParams) -> Result<Self> {
        params.validate()?;
        let name = format!(
            "EMA Channel (period={}, width={})",
            params.ema_period, params.channel_width
        );
        Ok(EmaChannelStrategy { params, name })
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    //channel bands per bar, none inside the warm-up window
    pub fn channel(&self, bars: &BarSeries) -> Vec<Option<ChannelBands>> {
        let width = self.params.channel_width;
        ema(&bars.closes(), self.params.ema_period, self.params.ema_seed)
            .into_iter()
            .map(|value| {
                value.map(|ema| ChannelBands {
                    ema,
                    upper: ema * (1.0 + width),
                    lower: ema * (1.0 - width),
                })
            })
            .collect()
    }
}

impl Strategy for EmaChannelStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_bars(&self) -> usize {
        self.params.ema_period
    }

    fn generate_signals(&self, bars: &BarSeries) -> Result<Vec<Signal>> {
        if bars.len() < self.required_bars() {
            return Err(BacktestError::InsufficientData {
                required: self.required_bars(),
                available: bars.len(),
            });
        }

        let bands = self.channel(bars);
        let mut in_position = false;

        let signals: Vec<Signal> = bars
            .iter()
            .zip(bands)
            .enumerate()
            .map(|(index, (bar, band))| {
                let kind = match band {
                    Some(b) if !in_position && bar.close > b.upper => {
                        in_position = true;
                        SignalKind::Buy
                    }
                    Some(b) if in_position && bar.close < b.lower => {
                        in_position = false;
                        SignalKind::Sell
                    }
                    _ => SignalKind::Hold,
                };
                Signal::new(index, kind)
            })
            .collect();

        debug!(
            strategy = %self.name,
            buys = signals.iter().filter(|s| s.kind == SignalKind::Buy).count(),
            sells = signals.iter().filter(|s| s.kind == SignalKind::Sell).count(),
            "generated signals"
        );

        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmaSeed;
    use crate::data::Bar;
    use chrono::{Duration, TimeZone, Utc};

    fn series(closes: &[f64]) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        BarSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| Bar::flat(start + Duration::days(i as i64), c))
                .collect(),
        )
        .unwrap()
    }

    fn kinds(signals: &[Signal]) -> Vec<SignalKind> {
        signals.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_insufficient_data() {
        let strategy = EmaChannelStrategy::new(StrategyParams::new(5, 0.02)).unwrap();
        let err = strategy.generate_signals(&series(&[1.0, 2.0, 3.0])).unwrap_err();
        assert_eq!(
            err,
            BacktestError::InsufficientData {
                required: 5,
                available: 3
            }
        );
    }

    #[test]
    fn test_rejects_invalid_params() {
        assert!(EmaChannelStrategy::new(StrategyParams::new(0, 0.02)).is_err());
        assert!(EmaChannelStrategy::new(StrategyParams::new(5, 1.5)).is_err());
    }

    #[test]
    fn test_warmup_bars_hold() {
        let strategy = EmaChannelStrategy::new(StrategyParams::new(3, 0.0)).unwrap();
        let signals = strategy
            .generate_signals(&series(&[10.0, 20.0, 30.0, 40.0]))
            .unwrap();
        assert_eq!(signals.len(), 4);
        assert_eq!(signals[0].kind, SignalKind::Hold);
        assert_eq!(signals[1].kind, SignalKind::Hold);
        //ema[2] = 20, close 30 breaks out
        assert_eq!(signals[2].kind, SignalKind::Buy);
        assert_eq!(signals[3].kind, SignalKind::Hold);
    }

    #[test]
    fn test_buy_then_sell_on_breakdown() {
        //period 2: alpha = 2/3
        let strategy = EmaChannelStrategy::new(StrategyParams::new(2, 0.05)).unwrap();
        let closes = [100.0, 100.0, 120.0, 120.0, 90.0, 80.0];
        let signals = strategy.generate_signals(&series(&closes)).unwrap();
        assert_eq!(
            kinds(&signals),
            vec![
                SignalKind::Hold,
                SignalKind::Hold,
                SignalKind::Buy,
                SignalKind::Hold,
                SignalKind::Sell,
                SignalKind::Hold,
            ]
        );
    }

    #[test]
    fn test_no_sell_without_position() {
        let strategy = EmaChannelStrategy::new(StrategyParams::new(2, 0.01)).unwrap();
        let signals = strategy
            .generate_signals(&series(&[100.0, 100.0, 80.0, 60.0, 50.0]))
            .unwrap();
        assert!(signals.iter().all(|s| s.kind == SignalKind::Hold));
    }

    #[test]
    fn test_channel_bands() {
        let params = StrategyParams {
            ema_period: 2,
            channel_width: 0.1,
            ema_seed: EmaSeed::Sma,
        };
        let strategy = EmaChannelStrategy::new(params).unwrap();
        let bands = strategy.channel(&series(&[100.0, 100.0]));
        assert_eq!(bands[0], None);
        let b = bands[1].unwrap();
        assert_eq!(b.ema, 100.0);
        assert!((b.upper - 110.0).abs() < 1e-9);
        assert!((b.lower - 90.0).abs() < 1e-9);
    }
}
