//a Rust-based EMA channel trend-following backtesting engine

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod portfolio;
pub mod strategy;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{BacktestConfiguration, BarInterval, EmaSeed, StrategyParams};
    pub use crate::data::{load_csv, Bar, BarSeries};
    pub use crate::engine::{
        BacktestConfig, BacktestEngine, BacktestResult, ExecutedTrade, FillPrice,
        ParameterSweep, Simulation, TradeSide,
    };
    pub use crate::error::BacktestError;
    pub use crate::metrics::{
        match_round_trips, BenchmarkComparison, EquityPoint, MonthlyReturn, PerformanceAnalyzer,
        PerformanceReport, RoundTrip,
    };
    pub use crate::portfolio::{Account, AccountState, Position};
    pub use crate::strategy::{
        ema_channel::{ChannelBands, EmaChannelStrategy},
        Signal, SignalKind, SignalSummary, Strategy,
    };
}
