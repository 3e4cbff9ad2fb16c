pub mod backtest_config;
pub mod interval;

pub use backtest_config::{
    BacktestConfiguration, EmaSeed, StrategyParams, DEFAULT_CHANNEL_WIDTH,
    DEFAULT_COMMISSION_RATE, DEFAULT_EMA_PERIOD, DEFAULT_INITIAL_CAPITAL,
};
pub use interval::BarInterval;
