use crate::config::BarInterval;
use crate::data::BarSeries;
use crate::engine::execution::{ExecutedTrade, TradeSide};
use crate::metrics::round_trip::RoundTrip;
use crate::metrics::timeseries::{
    average_drawdown, calculate_returns, drawdown_periods, elapsed_days, max_drawdown,
    monthly_returns, EquityPoint,
};
use indexmap::IndexMap;
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

//computes performance metrics from finalized run output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceAnalyzer {
    periods_per_year: f64,
    //annual rate as a fraction
    risk_free_rate: f64,
}

impl PerformanceAnalyzer {
    pub fn new(interval: BarInterval, risk_free_rate: f64) -> Self {
        PerformanceAnalyzer {
            periods_per_year: interval.periods_per_year(),
            risk_free_rate,
        }
    }

    pub fn periods_per_year(&self) -> f64 {
        self.periods_per_year
    }

    pub fn annualization_factor(&self) -> f64 {
        self.periods_per_year.sqrt()
    }

    pub fn risk_free_per_period(&self) -> f64 {
        self.risk_free_rate / self.periods_per_year
    }

    //pure pass over the curve and trades
    pub fn analyze(
        &self,
        initial_capital: f64,
        equity_curve: &[EquityPoint],
        trades: &[ExecutedTrade],
        round_trips: &[RoundTrip],
    ) -> PerformanceReport {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = (final_equity / initial_capital - 1.0) * 100.0;
        let days = elapsed_days(equity_curve);
        let cagr = calculate_cagr(initial_capital, final_equity, days);

        let returns = calculate_returns(equity_curve);
        let volatility = self.calculate_volatility(&returns);
        let sharpe_ratio = self.calculate_sharpe_ratio(&returns);
        let sortino_ratio = self.calculate_sortino_ratio(&returns);

        let max_dd = max_drawdown(equity_curve);
        let calmar_ratio = if max_dd < 0.0 { cagr / max_dd.abs() } else { 0.0 };

        let underwater = drawdown_periods(equity_curve);
        let longest_drawdown_days = underwater
            .iter()
            .map(|p| p.duration_days)
            .fold(0.0, f64::max);
        let deepest_drawdown = underwater.iter().map(|p| p.depth).fold(0.0, f64::min);

        let trade_stats = calculate_trade_statistics(round_trips);
        let monthly = calculate_monthly_statistics(equity_curve);

        PerformanceReport {
            initial_capital,
            final_equity,
            total_return,
            cagr,
            elapsed_days: days,
            volatility,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown: max_dd,
            calmar_ratio,
            avg_drawdown: average_drawdown(equity_curve),
            current_drawdown: equity_curve.last().map_or(0.0, |p| p.drawdown),
            deepest_drawdown,
            drawdown_periods: underwater.len(),
            longest_drawdown_days,
            num_executed_trades: trades.len(),
            num_round_trips: trade_stats.num_trades,
            num_winning_trades: trade_stats.num_winning_trades,
            num_losing_trades: trade_stats.num_losing_trades,
            win_rate: trade_stats.win_rate,
            profit_factor: trade_stats.profit_factor,
            avg_trade_return: trade_stats.avg_trade_return,
            best_trade: trade_stats.best_trade,
            worst_trade: trade_stats.worst_trade,
            avg_holding_days: trade_stats.avg_holding_days,
            total_commission: trades.iter().map(|t| t.commission).sum(),
            exposure: calculate_exposure(equity_curve.len(), trades),
            best_month: monthly.best_month,
            worst_month: monthly.worst_month,
            positive_months: monthly.positive_months,
            negative_months: monthly.negative_months,
            avg_monthly_return: monthly.avg_monthly_return,
            monthly_volatility: monthly.monthly_volatility,
        }
    }

    //strategy versus buying and holding the same bars
    //the information ratio needs one equity point per bar, otherwise it is 0
    pub fn compare_with_benchmark(
        &self,
        bars: &BarSeries,
        equity_curve: &[EquityPoint],
        report: &PerformanceReport,
    ) -> BenchmarkComparison {
        let buy_hold_return = match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => (last.close / first.close - 1.0) * 100.0,
            _ => 0.0,
        };
        let excess_return = report.total_return - buy_hold_return;

        let information_ratio = if equity_curve.len() == bars.len() {
            let strategy_returns = calculate_returns(equity_curve);
            let excess: Vec<f64> = bars
                .bars()
                .windows(2)
                .zip(strategy_returns)
                .map(|(w, r)| r - (w[1].close / w[0].close - 1.0))
                .collect();
            self.calculate_information_ratio(&excess)
        } else {
            0.0
        };

        BenchmarkComparison {
            buy_hold_return,
            strategy_return: report.total_return,
            excess_return,
            information_ratio,
            outperformed: excess_return > 0.0,
        }
    }

    //annualized standard deviation of returns, percent
    fn calculate_volatility(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }
        let std_dev = returns.std_dev();
        if !std_dev.is_finite() {
            return 0.0;
        }
        std_dev * self.annualization_factor() * 100.0
    }

    fn calculate_sharpe_ratio(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }

        let mean = returns.mean();
        let std_dev = returns.std_dev();

        if std_dev == 0.0 || !std_dev.is_finite() {
            return 0.0;
        }

        (mean - self.risk_free_per_period()) / std_dev * self.annualization_factor()
    }

    fn calculate_information_ratio(&self, excess_returns: &[f64]) -> f64 {
        if excess_returns.len() < 2 {
            return 0.0;
        }

        let std_dev = excess_returns.std_dev();
        if std_dev == 0.0 || !std_dev.is_finite() {
            return 0.0;
        }

        excess_returns.mean() / std_dev * self.annualization_factor()
    }

    fn calculate_sortino_ratio(&self, returns: &[f64]) -> f64 {
        if returns.is_empty() {
            return 0.0;
        }

        //downside deviation divides by every period, not just the losing ones
        let downside_sq: f64 = returns
            .iter()
            .filter(|&&r| r < 0.0)
            .map(|r| r * r)
            .sum();

        if downside_sq == 0.0 {
            return 0.0;
        }

        let downside_dev = (downside_sq / returns.len() as f64).sqrt();
        let mean = returns.mean();

        (mean - self.risk_free_per_period()) / downside_dev * self.annualization_factor()
    }
}

//shortest span that is annualized, shorter runs report a cagr of 0
pub const MIN_CAGR_DAYS: f64 = 1.0;

//compound annual growth rate in percent over a calendar span
pub fn calculate_cagr(initial_capital: f64, final_equity: f64, elapsed_days: f64) -> f64 {
    if elapsed_days < MIN_CAGR_DAYS || initial_capital <= 0.0 {
        return 0.0;
    }
    if final_equity <= 0.0 {
        return -100.0;
    }
    ((final_equity / initial_capital).powf(365.0 / elapsed_days) - 1.0) * 100.0
}

//aggregate, read-only snapshot of a run's metrics
//percent fields are already multiplied by 100
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub cagr: f64,
    pub elapsed_days: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub calmar_ratio: f64,
    //mean of the underwater points
    pub avg_drawdown: f64,
    //drawdown of the last point
    pub current_drawdown: f64,
    //deepest of the drawdown periods
    pub deepest_drawdown: f64,
    pub drawdown_periods: usize,
    pub longest_drawdown_days: f64,
    pub num_executed_trades: usize,
    pub num_round_trips: usize,
    pub num_winning_trades: usize,
    pub num_losing_trades: usize,
    pub win_rate: f64,
    //f64::INFINITY when there are wins and no losses, serialized as null
    pub profit_factor: f64,
    pub avg_trade_return: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub avg_holding_days: f64,
    pub total_commission: f64,
    pub exposure: f64,
    pub best_month: f64,
    pub worst_month: f64,
    pub positive_months: usize,
    pub negative_months: usize,
    pub avg_monthly_return: f64,
    //sample stdev of monthly returns, not annualized
    pub monthly_volatility: f64,
}

impl PerformanceReport {
    //metric name -> value, in display order
    pub fn to_metric_map(&self) -> IndexMap<&'static str, f64> {
        let mut map = IndexMap::new();
        map.insert("initial_capital", self.initial_capital);
        map.insert("final_equity", self.final_equity);
        map.insert("total_return_pct", self.total_return);
        map.insert("cagr_pct", self.cagr);
        map.insert("elapsed_days", self.elapsed_days);
        map.insert("volatility_pct", self.volatility);
        map.insert("sharpe_ratio", self.sharpe_ratio);
        map.insert("sortino_ratio", self.sortino_ratio);
        map.insert("max_drawdown_pct", self.max_drawdown);
        map.insert("calmar_ratio", self.calmar_ratio);
        map.insert("avg_drawdown_pct", self.avg_drawdown);
        map.insert("current_drawdown_pct", self.current_drawdown);
        map.insert("deepest_drawdown_pct", self.deepest_drawdown);
        map.insert("drawdown_periods", self.drawdown_periods as f64);
        map.insert("longest_drawdown_days", self.longest_drawdown_days);
        map.insert("executed_trades", self.num_executed_trades as f64);
        map.insert("round_trips", self.num_round_trips as f64);
        map.insert("winning_trades", self.num_winning_trades as f64);
        map.insert("losing_trades", self.num_losing_trades as f64);
        map.insert("win_rate_pct", self.win_rate);
        map.insert("profit_factor", self.profit_factor);
        map.insert("avg_trade_return_pct", self.avg_trade_return);
        map.insert("best_trade_pct", self.best_trade);
        map.insert("worst_trade_pct", self.worst_trade);
        map.insert("avg_holding_days", self.avg_holding_days);
        map.insert("total_commission", self.total_commission);
        map.insert("exposure_pct", self.exposure);
        map.insert("best_month_pct", self.best_month);
        map.insert("worst_month_pct", self.worst_month);
        map.insert("positive_months", self.positive_months as f64);
        map.insert("negative_months", self.negative_months as f64);
        map.insert("avg_monthly_return_pct", self.avg_monthly_return);
        map.insert("monthly_volatility_pct", self.monthly_volatility);
        map
    }

    //builds the metrics table
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();

        table.add_row(Row::new(vec![Cell::new("Metric"), Cell::new("Value")]));

        let profit_factor = if self.profit_factor.is_infinite() {
            "inf".to_string()
        } else {
            format!("{:.3}", self.profit_factor)
        };

        let rows = [
            ("Initial Capital", format!("${:.2}", self.initial_capital)),
            ("Final Equity", format!("${:.2}", self.final_equity)),
            ("Total Return", format!("{:.2}%", self.total_return)),
            ("CAGR", format!("{:.2}%", self.cagr)),
            ("Volatility (ann.)", format!("{:.2}%", self.volatility)),
            ("Sharpe Ratio", format!("{:.3}", self.sharpe_ratio)),
            ("Sortino Ratio", format!("{:.3}", self.sortino_ratio)),
            ("Max Drawdown", format!("{:.2}%", self.max_drawdown)),
            ("Calmar Ratio", format!("{:.3}", self.calmar_ratio)),
            ("Avg Drawdown", format!("{:.2}%", self.avg_drawdown)),
            ("Current Drawdown", format!("{:.2}%", self.current_drawdown)),
            (
                "Longest Drawdown",
                format!("{:.1} days", self.longest_drawdown_days),
            ),
            ("Executed Trades", format!("{}", self.num_executed_trades)),
            ("Round Trips", format!("{}", self.num_round_trips)),
            ("Win Rate", format!("{:.2}%", self.win_rate)),
            ("Profit Factor", profit_factor),
            ("Avg Trade Return", format!("{:.2}%", self.avg_trade_return)),
            ("Best Trade", format!("{:.2}%", self.best_trade)),
            ("Worst Trade", format!("{:.2}%", self.worst_trade)),
            ("Avg Holding", format!("{:.1} days", self.avg_holding_days)),
            ("Total Commission", format!("${:.2}", self.total_commission)),
            ("Exposure", format!("{:.2}%", self.exposure)),
            ("Best Month", format!("{:.2}%", self.best_month)),
            ("Worst Month", format!("{:.2}%", self.worst_month)),
            (
                "Up / Down Months",
                format!("{} / {}", self.positive_months, self.negative_months),
            ),
            ("Avg Monthly Return", format!("{:.2}%", self.avg_monthly_return)),
            ("Monthly Volatility", format!("{:.2}%", self.monthly_volatility)),
        ];

        for (name, value) in rows {
            table.add_row(Row::new(vec![Cell::new(name), Cell::new(&value)]));
        }

        table
    }

    //prints metrics in a formatted table
    pub fn pretty_print_table(&self) {
        self.to_table().printstd();
    }
}

//strategy versus holding the instrument over the same bars, returns in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub buy_hold_return: f64,
    pub strategy_return: f64,
    pub excess_return: f64,
    //annualized mean / stdev of per-bar strategy minus buy-and-hold returns
    pub information_ratio: f64,
    pub outperformed: bool,
}

struct TradeStats {
    num_trades: usize,
    num_winning_trades: usize,
    num_losing_trades: usize,
    win_rate: f64,
    profit_factor: f64,
    avg_trade_return: f64,
    best_trade: f64,
    worst_trade: f64,
    avg_holding_days: f64,
}

fn calculate_trade_statistics(round_trips: &[RoundTrip]) -> TradeStats {
    if round_trips.is_empty() {
        return TradeStats {
            num_trades: 0,
            num_winning_trades: 0,
            num_losing_trades: 0,
            win_rate: 0.0,
            profit_factor: 0.0,
            avg_trade_return: 0.0,
            best_trade: 0.0,
            worst_trade: 0.0,
            avg_holding_days: 0.0,
        };
    }

    let total = round_trips.len();
    let returns: Vec<f64> = round_trips.iter().map(|t| t.return_pct).collect();

    let num_winning = round_trips.iter().filter(|t| t.is_win()).count();
    let num_losing = round_trips.iter().filter(|t| t.is_loss()).count();

    let gross_profit: f64 = returns.iter().filter(|&&r| r > 0.0).sum();
    let gross_loss: f64 = returns.iter().filter(|&&r| r < 0.0).sum::<f64>().abs();

    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    TradeStats {
        num_trades: total,
        num_winning_trades: num_winning,
        num_losing_trades: num_losing,
        win_rate: num_winning as f64 / total as f64 * 100.0,
        profit_factor,
        avg_trade_return: returns.iter().sum::<f64>() / total as f64,
        best_trade: returns.iter().cloned().fold(f64::MIN, f64::max),
        worst_trade: returns.iter().cloned().fold(f64::MAX, f64::min),
        avg_holding_days: round_trips.iter().map(|t| t.holding_days).sum::<f64>() / total as f64,
    }
}

struct MonthlyStats {
    best_month: f64,
    worst_month: f64,
    positive_months: usize,
    negative_months: usize,
    avg_monthly_return: f64,
    monthly_volatility: f64,
}

fn calculate_monthly_statistics(equity_curve: &[EquityPoint]) -> MonthlyStats {
    let returns: Vec<f64> = monthly_returns(equity_curve)
        .iter()
        .map(|m| m.return_pct)
        .collect();

    if returns.is_empty() {
        return MonthlyStats {
            best_month: 0.0,
            worst_month: 0.0,
            positive_months: 0,
            negative_months: 0,
            avg_monthly_return: 0.0,
            monthly_volatility: 0.0,
        };
    }

    let monthly_volatility = if returns.len() < 2 {
        0.0
    } else {
        returns.iter().std_dev()
    };

    MonthlyStats {
        best_month: returns.iter().cloned().fold(f64::MIN, f64::max),
        worst_month: returns.iter().cloned().fold(f64::MAX, f64::min),
        positive_months: returns.iter().filter(|&&r| r > 0.0).count(),
        negative_months: returns.iter().filter(|&&r| r < 0.0).count(),
        avg_monthly_return: returns.iter().sum::<f64>() / returns.len() as f64,
        monthly_volatility,
    }
}

//percentage of bars that closed with an open position
//a bar counts as long from its buy fill up to, not including, its sell fill
fn calculate_exposure(num_bars: usize, trades: &[ExecutedTrade]) -> f64 {
    if num_bars == 0 {
        return 0.0;
    }

    let mut long_bars = 0usize;
    let mut entry: Option<usize> = None;

    for trade in trades {
        match (trade.side, entry) {
            (TradeSide::Buy, None) => entry = Some(trade.bar_index),
            (TradeSide::Sell, Some(start)) => {
                long_bars += trade.bar_index.saturating_sub(start);
                entry = None;
            }
            _ => {}
        }
    }

    if let Some(start) = entry {
        long_bars += num_bars.saturating_sub(start);
    }

    long_bars as f64 / num_bars as f64 * 100.0
}
