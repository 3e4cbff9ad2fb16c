use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

//a point in the equity curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    //running peak up to and including this point
    pub peak: f64,
    //(equity - peak) / peak in percent, never positive
    pub drawdown: f64,
}

//incrementally builds an equity curve with running peak and drawdown
#[derive(Debug, Clone, Default)]
pub struct EquityCurveBuilder {
    points: Vec<EquityPoint>,
    peak: Option<f64>,
}

impl EquityCurveBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        EquityCurveBuilder {
            points: Vec::with_capacity(capacity),
            peak: None,
        }
    }

    pub fn push(&mut self, timestamp: DateTime<Utc>, equity: f64) {
        let peak = self.peak.map_or(equity, |p| p.max(equity));
        self.peak = Some(peak);

        let drawdown = if peak > 0.0 {
            ((equity - peak) / peak * 100.0).min(0.0)
        } else {
            0.0
        };

        self.points.push(EquityPoint {
            timestamp,
            equity,
            peak,
            drawdown,
        });
    }

    pub fn finish(self) -> Vec<EquityPoint> {
        self.points
    }
}

//calculates the equity curve with drawdowns
pub fn calculate_equity_curve(
    timestamps: &[DateTime<Utc>],
    equity_values: &[f64],
) -> Vec<EquityPoint> {
    let mut builder = EquityCurveBuilder::with_capacity(timestamps.len());
    for (&timestamp, &equity) in timestamps.iter().zip(equity_values.iter()) {
        builder.push(timestamp, equity);
    }
    builder.finish()
}

//calculates maximum drawdown (most negative, in percent) from equity curve
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    equity_curve
        .iter()
        .map(|point| point.drawdown)
        .fold(0.0, f64::min)
}

//calculates per-bar returns equity[t] / equity[t-1] - 1
//a non-positive previous equity yields a zero return for that bar
pub fn calculate_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            if w[0].equity > 0.0 {
                w[1].equity / w[0].equity - 1.0
            } else {
                0.0
            }
        })
        .collect()
}

//elapsed calendar days between first and last point, fractional
pub fn elapsed_days(equity_curve: &[EquityPoint]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(first), Some(last)) => {
            (last.timestamp - first.timestamp).num_seconds() as f64 / 86_400.0
        }
        _ => 0.0,
    }
}

//a stretch of the curve spent below a prior peak
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPeriod {
    pub start: DateTime<Utc>,
    //first point back at the peak, or the last point if never recovered
    pub end: DateTime<Utc>,
    pub duration_days: f64,
    //deepest drawdown inside the period, percent
    pub depth: f64,
    pub recovered: bool,
}

//splits the curve into underwater periods
pub fn drawdown_periods(equity_curve: &[EquityPoint]) -> Vec<DrawdownPeriod> {
    let mut periods = Vec::new();
    let mut current: Option<(DateTime<Utc>, f64)> = None;

    for point in equity_curve {
        match (current, point.drawdown < 0.0) {
            (None, true) => current = Some((point.timestamp, point.drawdown)),
            (Some((start, depth)), true) => current = Some((start, depth.min(point.drawdown))),
            (Some((start, depth)), false) => {
                periods.push(DrawdownPeriod {
                    start,
                    end: point.timestamp,
                    duration_days: (point.timestamp - start).num_seconds() as f64 / 86_400.0,
                    depth,
                    recovered: true,
                });
                current = None;
            }
            (None, false) => {}
        }
    }

    //still underwater at the end
    if let (Some((start, depth)), Some(last)) = (current, equity_curve.last()) {
        periods.push(DrawdownPeriod {
            start,
            end: last.timestamp,
            duration_days: (last.timestamp - start).num_seconds() as f64 / 86_400.0,
            depth,
            recovered: false,
        });
    }

    periods
}

//mean of the underwater points in percent, 0 when the curve never dips
pub fn average_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let underwater: Vec<f64> = equity_curve
        .iter()
        .map(|p| p.drawdown)
        .filter(|&dd| dd < 0.0)
        .collect();

    if underwater.is_empty() {
        return 0.0;
    }
    underwater.iter().sum::<f64>() / underwater.len() as f64
}

//return of one calendar month, month-end equity over the previous month-end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    //percent
    pub return_pct: f64,
}

//groups the curve by calendar month and compares consecutive month-end equities
//the first month has no base and months without bars are skipped
pub fn monthly_returns(equity_curve: &[EquityPoint]) -> Vec<MonthlyReturn> {
    let mut month_ends: Vec<(i32, u32, f64)> = Vec::new();

    for point in equity_curve {
        let (year, month) = (point.timestamp.year(), point.timestamp.month());
        match month_ends.last_mut() {
            Some(last) if last.0 == year && last.1 == month => last.2 = point.equity,
            _ => month_ends.push((year, month, point.equity)),
        }
    }

    month_ends
        .windows(2)
        .map(|w| {
            let (_, _, base) = w[0];
            let (year, month, equity) = w[1];
            let return_pct = if base > 0.0 {
                (equity / base - 1.0) * 100.0
            } else {
                0.0
            };
            MonthlyReturn {
                year,
                month,
                return_pct,
            }
        })
        .collect()
}
