use crate::engine::BacktestConfig;
use crate::error::{BacktestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_EMA_PERIOD: usize = 33;
pub const DEFAULT_CHANNEL_WIDTH: f64 = 0.02;
pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_COMMISSION_RATE: f64 = 0.001;

//how the first ema value is produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmaSeed {
    //simple average of the first `period` closes
    #[default]
    Sma,
    //first close, recurrence runs from bar one
    FirstValue,
}

impl EmaSeed {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sma" => Some(EmaSeed::Sma),
            "first" | "first_value" | "first-value" => Some(EmaSeed::FirstValue),
            _ => None,
        }
    }
}

//ema channel strategy parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub ema_period: usize,
    pub channel_width: f64,
    pub ema_seed: EmaSeed,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            ema_period: DEFAULT_EMA_PERIOD,
            channel_width: DEFAULT_CHANNEL_WIDTH,
            ema_seed: EmaSeed::Sma,
        }
    }
}

impl StrategyParams {
    pub fn new(ema_period: usize, channel_width: f64) -> Self {
        StrategyParams {
            ema_period,
            channel_width,
            ..StrategyParams::default()
        }
    }

    //copy of these params with a different ema period
    pub fn with_period(&self, ema_period: usize) -> Self {
        StrategyParams {
            ema_period,
            ..*self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ema_period == 0 {
            return Err(BacktestError::invalid_config("ema_period must be > 0"));
        }
        //a width of 1 or more would put the lower band at or below zero
        if !self.channel_width.is_finite() || !(0.0..1.0).contains(&self.channel_width) {
            return Err(BacktestError::invalid_config(format!(
                "channel_width must be in [0, 1), got {}",
                self.channel_width
            )));
        }
        Ok(())
    }
}

//complete run configuration, loadable from json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfiguration {
    //data
    pub data_path: PathBuf,

    //strategy
    #[serde(default)]
    pub strategy: StrategyParams,

    //extra ema periods evaluated by the sweep command
    #[serde(default)]
    pub sweep_periods: Vec<usize>,

    //account and execution settings
    #[serde(default)]
    pub backtest: BacktestConfig,

    //optional output paths
    #[serde(default)]
    pub output_equity_csv: Option<PathBuf>,
    #[serde(default)]
    pub output_trades_csv: Option<PathBuf>,
    #[serde(default)]
    pub output_json: Option<PathBuf>,
}

impl Default for BacktestConfiguration {
    fn default() -> Self {
        BacktestConfiguration {
            data_path: PathBuf::from("data.csv"),
            strategy: StrategyParams::default(),
            sweep_periods: Vec::new(),
            backtest: BacktestConfig::default(),
            output_equity_csv: None,
            output_trades_csv: None,
            output_json: None,
        }
    }
}

impl BacktestConfiguration {
    //load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: BacktestConfiguration = serde_json::from_str(&contents)?;
        Ok(config)
    }

    //save configuration to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.strategy.validate()?;
        self.backtest.validate()?;
        if let Some(&bad) = self.sweep_periods.iter().find(|&&p| p == 0) {
            return Err(BacktestError::invalid_config(format!(
                "sweep period {} must be > 0",
                bad
            )));
        }
        Ok(())
    }
}
