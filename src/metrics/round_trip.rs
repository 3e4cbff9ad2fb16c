use crate::engine::execution::{ExecutedTrade, TradeSide};
use serde::{Deserialize, Serialize};

//a matched entry + exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub entry: ExecutedTrade,
    pub exit: ExecutedTrade,
    //price-only return in percent, commission not subtracted
    pub return_pct: f64,
    //dollar pnl net of both commissions
    pub pnl: f64,
    pub holding_bars: usize,
    pub holding_days: f64,
}

impl RoundTrip {
    pub fn from_pair(entry: &ExecutedTrade, exit: &ExecutedTrade) -> Self {
        let return_pct = (exit.price - entry.price) / entry.price * 100.0;
        let pnl = entry.net_cash_flow() + exit.net_cash_flow();
        let holding_days = (exit.timestamp - entry.timestamp).num_seconds() as f64 / 86_400.0;

        RoundTrip {
            entry: entry.clone(),
            exit: exit.clone(),
            return_pct,
            pnl,
            holding_bars: exit.bar_index.saturating_sub(entry.bar_index),
            holding_days,
        }
    }

    pub fn is_win(&self) -> bool {
        self.return_pct > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.return_pct < 0.0
    }
}

//pairs each buy with the next sell in chronological order
//a trailing buy with no exit is left unmatched
pub fn match_round_trips(trades: &[ExecutedTrade]) -> Vec<RoundTrip> {
    let mut round_trips = Vec::with_capacity(trades.len() / 2);
    let mut open: Option<&ExecutedTrade> = None;

    for trade in trades {
        match (trade.side, open) {
            (TradeSide::Buy, None) => open = Some(trade),
            (TradeSide::Sell, Some(entry)) => {
                round_trips.push(RoundTrip::from_pair(entry, trade));
                open = None;
            }
            //the simulator alternates sides, anything else is skipped
            _ => {}
        }
    }

    round_trips
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn trade(id: u64, side: TradeSide, index: usize, price: f64, qty: f64, rate: f64) -> ExecutedTrade {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        ExecutedTrade {
            id,
            side,
            bar_index: index,
            timestamp: start + Duration::days(index as i64),
            price,
            quantity: qty,
            amount: price * qty,
            commission: price * qty * rate,
        }
    }

    #[test]
    fn test_pairs_buy_and_sell() {
        let trades = vec![
            trade(1, TradeSide::Buy, 2, 100.0, 10.0, 0.001),
            trade(2, TradeSide::Sell, 7, 110.0, 10.0, 0.001),
            trade(3, TradeSide::Buy, 9, 105.0, 10.0, 0.001),
            trade(4, TradeSide::Sell, 12, 100.0, 10.0, 0.001),
        ];
        let trips = match_round_trips(&trades);
        assert_eq!(trips.len(), 2);

        assert!((trips[0].return_pct - 10.0).abs() < 1e-9);
        assert_eq!(trips[0].holding_bars, 5);
        assert_eq!(trips[0].holding_days, 5.0);
        //1100 - 1.1 - (1000 + 1.0)
        assert!((trips[0].pnl - 97.9).abs() < 1e-9);
        assert!(trips[0].is_win());

        assert!(trips[1].is_loss());
        assert_eq!(trips[1].entry.id, 3);
        assert_eq!(trips[1].exit.id, 4);
    }

    #[test]
    fn test_trailing_buy_unmatched() {
        let trades = vec![
            trade(1, TradeSide::Buy, 0, 100.0, 1.0, 0.0),
            trade(2, TradeSide::Sell, 1, 101.0, 1.0, 0.0),
            trade(3, TradeSide::Buy, 2, 102.0, 1.0, 0.0),
        ];
        let trips = match_round_trips(&trades);
        assert_eq!(trips.len(), 1);
        assert!(trips.len() <= trades.len() / 2);
    }

    #[test]
    fn test_empty_and_buy_only() {
        assert!(match_round_trips(&[]).is_empty());
        assert!(match_round_trips(&[trade(1, TradeSide::Buy, 0, 1.0, 1.0, 0.0)]).is_empty());
    }
}
