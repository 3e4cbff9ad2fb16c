pub mod round_trip;
pub mod summary;
pub mod timeseries;

pub use round_trip::{match_round_trips, RoundTrip};
pub use summary::{
    calculate_cagr, BenchmarkComparison, PerformanceAnalyzer, PerformanceReport, MIN_CAGR_DAYS,
};
pub use timeseries::{
    average_drawdown, calculate_equity_curve, calculate_returns, drawdown_periods, max_drawdown,
    monthly_returns, DrawdownPeriod, EquityCurveBuilder, EquityPoint, MonthlyReturn,
};
