pub mod backtest;
pub mod execution;
pub mod sweep;

pub use backtest::{BacktestConfig, BacktestEngine, BacktestResult, Simulation};
pub use execution::{ExecutedTrade, ExecutionEngine, Fill, FillPrice, Order, TradeSide};
pub use sweep::ParameterSweep;
