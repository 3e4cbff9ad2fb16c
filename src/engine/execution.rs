use crate::data::Bar;
use crate::error::BacktestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//trade side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

//which price a signal fills at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPrice {
    //close of the bar that produced the signal
    #[default]
    Close,
    //open of the following bar
    NextOpen,
}

impl FromStr for FillPrice {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "close" => Ok(FillPrice::Close),
            "next_open" | "next-open" | "open" => Ok(FillPrice::NextOpen),
            other => Err(BacktestError::invalid_config(format!(
                "unknown fill price '{}'",
                other
            ))),
        }
    }
}

//an executed trade, immutable once recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedTrade {
    pub id: u64,
    pub side: TradeSide,
    //bar index the fill happened on
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub quantity: f64,
    //price * quantity
    pub amount: f64,
    //amount * commission rate
    pub commission: f64,
}

impl ExecutedTrade {
    //cash that left or entered the account including commission
    pub fn net_cash_flow(&self) -> f64 {
        match self.side {
            TradeSide::Buy => -(self.amount + self.commission),
            TradeSide::Sell => self.amount - self.commission,
        }
    }
}

//an order waiting for its fill bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Order {
    pub side: TradeSide,
    //bar that produced the signal
    pub signal_index: usize,
}

//price and bar an order filled at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub side: TradeSide,
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

//simulates order execution under a fill-price convention
//at most one order is ever pending since the account is all-in or all-out
pub struct ExecutionEngine {
    fill_price: FillPrice,
    pending: Option<Order>,
}

impl ExecutionEngine {
    pub fn new(fill_price: FillPrice) -> Self {
        ExecutionEngine {
            fill_price,
            pending: None,
        }
    }

    //queues an order, replacing anything still pending
    pub fn submit(&mut self, side: TradeSide, signal_index: usize) {
        self.pending = Some(Order { side, signal_index });
    }

    //fills the pending order if it is due on this bar
    //close orders fill on their own bar, next-open orders on the bar after
    pub fn process(&mut self, index: usize, bar: &Bar) -> Option<Fill> {
        let order = self.pending?;

        let price = match self.fill_price {
            FillPrice::Close if index == order.signal_index => bar.close,
            FillPrice::NextOpen if index > order.signal_index => bar.open,
            _ => return None,
        };

        self.pending = None;
        Some(Fill {
            side: order.side,
            bar_index: index,
            timestamp: bar.timestamp,
            price,
        })
    }

    //drops an order that can no longer fill (end of data)
    pub fn cancel_pending(&mut self) -> Option<Order> {
        self.pending.take()
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new(FillPrice::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(day: u32, open: f64, close: f64) -> Bar {
        let ts = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        Bar::new_unchecked(ts, open, open.max(close), open.min(close), close, 0.0)
    }

    #[test]
    fn test_close_fills_same_bar() {
        let mut engine = ExecutionEngine::new(FillPrice::Close);
        engine.submit(TradeSide::Buy, 3);
        let fill = engine.process(3, &bar(4, 10.0, 12.0)).unwrap();
        assert_eq!(fill.price, 12.0);
        assert_eq!(fill.bar_index, 3);
        assert_eq!(engine.cancel_pending(), None);
    }

    #[test]
    fn test_next_open_waits_one_bar() {
        let mut engine = ExecutionEngine::new(FillPrice::NextOpen);
        engine.submit(TradeSide::Sell, 3);
        assert!(engine.process(3, &bar(4, 10.0, 12.0)).is_none());

        let fill = engine.process(4, &bar(5, 11.0, 9.0)).unwrap();
        assert_eq!(fill.side, TradeSide::Sell);
        assert_eq!(fill.price, 11.0);
        assert_eq!(fill.bar_index, 4);
    }

    #[test]
    fn test_cancel_pending() {
        let mut engine = ExecutionEngine::new(FillPrice::NextOpen);
        engine.submit(TradeSide::Buy, 9);
        assert_eq!(
            engine.cancel_pending(),
            Some(Order {
                side: TradeSide::Buy,
                signal_index: 9
            })
        );
        assert!(engine.process(10, &bar(11, 1.0, 1.0)).is_none());
    }

    #[test]
    fn test_fill_price_parse() {
        assert_eq!("close".parse::<FillPrice>().unwrap(), FillPrice::Close);
        assert_eq!("next-open".parse::<FillPrice>().unwrap(), FillPrice::NextOpen);
        assert!("vwap".parse::<FillPrice>().is_err());
    }

    #[test]
    fn test_net_cash_flow() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let buy = ExecutedTrade {
            id: 1,
            side: TradeSide::Buy,
            bar_index: 0,
            timestamp: ts,
            price: 10.0,
            quantity: 5.0,
            amount: 50.0,
            commission: 0.5,
        };
        assert_eq!(buy.net_cash_flow(), -50.5);
        let sell = ExecutedTrade {
            side: TradeSide::Sell,
            ..buy.clone()
        };
        assert_eq!(sell.net_cash_flow(), 49.5);
    }
}
