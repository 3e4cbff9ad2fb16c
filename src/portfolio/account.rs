use crate::engine::execution::{ExecutedTrade, Fill, TradeSide};
use crate::error::{BacktestError, Result};
use crate::portfolio::position::Position;
use tracing::debug;

//flat or long, the only two account states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Flat,
    Long,
}

//single-position, long-only cash account
#[derive(Debug, Clone)]
pub struct Account {
    //initial account balance
    pub initial_capital: f64,

    //current cash, commissions already deducted
    pub cash: f64,

    //open position, none while flat
    pub position: Option<Position>,

    //complete trade log in fill order
    pub trade_log: Vec<ExecutedTrade>,

    //fraction of notional charged per side
    pub commission_rate: f64,

    //commission paid so far
    pub total_commission: f64,

    next_trade_id: u64,
}

impl Account {
    //creates a new account, rejecting capital and commission outside their ranges
    pub fn new(initial_capital: f64, commission_rate: f64) -> Result<Self> {
        if !initial_capital.is_finite() || initial_capital <= 0.0 {
            return Err(BacktestError::invalid_config(format!(
                "initial_capital must be > 0, got {}",
                initial_capital
            )));
        }
        if !commission_rate.is_finite() || !(0.0..1.0).contains(&commission_rate) {
            return Err(BacktestError::invalid_config(format!(
                "commission_rate must be in [0, 1), got {}",
                commission_rate
            )));
        }

        Ok(Account {
            initial_capital,
            cash: initial_capital,
            position: None,
            trade_log: Vec::new(),
            commission_rate,
            total_commission: 0.0,
            next_trade_id: 1,
        })
    }

    pub fn state(&self) -> AccountState {
        if self.position.is_some() {
            AccountState::Long
        } else {
            AccountState::Flat
        }
    }

    //applies a fill if it is valid for the current state
    //buys while long and sells while flat are ignored
    pub fn process_fill(&mut self, fill: Fill) -> Option<&ExecutedTrade> {
        match (fill.side, self.state()) {
            (TradeSide::Buy, AccountState::Flat) => self.buy(fill),
            (TradeSide::Sell, AccountState::Long) => self.sell(fill),
            _ => None,
        }
    }

    //all-in buy sized so that amount + commission uses exactly the available cash
    fn buy(&mut self, fill: Fill) -> Option<&ExecutedTrade> {
        if self.cash <= 0.0 || fill.price <= 0.0 {
            return None;
        }

        let quantity = self.cash / (fill.price * (1.0 + self.commission_rate));
        let amount = quantity * fill.price;
        let commission = amount * self.commission_rate;

        self.cash -= amount + commission;
        //guard against dust from rounding
        if self.cash.abs() < 1e-9 {
            self.cash = 0.0;
        }
        self.position = Some(Position::open(
            quantity,
            fill.price,
            fill.timestamp,
            fill.bar_index,
        ));

        debug!(
            quantity,
            price = fill.price,
            commission,
            timestamp = %fill.timestamp,
            "buy filled"
        );

        self.record(fill, quantity, amount, commission)
    }

    //sells the entire position
    fn sell(&mut self, fill: Fill) -> Option<&ExecutedTrade> {
        let position = self.position.take()?;

        let quantity = position.quantity;
        let amount = quantity * fill.price;
        let commission = amount * self.commission_rate;

        self.cash += amount - commission;

        debug!(
            quantity,
            price = fill.price,
            commission,
            pnl = position.unrealized_pnl(fill.price),
            timestamp = %fill.timestamp,
            "sell filled"
        );

        self.record(fill, quantity, amount, commission)
    }

    fn record(
        &mut self,
        fill: Fill,
        quantity: f64,
        amount: f64,
        commission: f64,
    ) -> Option<&ExecutedTrade> {
        self.total_commission += commission;
        self.trade_log.push(ExecutedTrade {
            id: self.next_trade_id,
            side: fill.side,
            bar_index: fill.bar_index,
            timestamp: fill.timestamp,
            price: fill.price,
            quantity,
            amount,
            commission,
        });
        self.next_trade_id += 1;
        self.trade_log.last()
    }

    //cash when flat, cash plus marked position when long
    pub fn equity(&self, mark_price: f64) -> f64 {
        match &self.position {
            Some(position) => self.cash + position.market_value(mark_price),
            None => self.cash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn fill(side: TradeSide, index: usize, price: f64) -> Fill {
        Fill {
            side,
            bar_index: index,
            timestamp: ts(index as u32 + 1),
            price,
        }
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert!(Account::new(0.0, 0.001).is_err());
        assert!(Account::new(-5.0, 0.001).is_err());
        assert!(Account::new(f64::INFINITY, 0.001).is_err());
        assert!(Account::new(1000.0, -0.1).is_err());
        assert!(Account::new(1000.0, 1.0).is_err());
        assert!(Account::new(1000.0, 0.0).is_ok());
    }

    #[test]
    fn test_buy_uses_all_cash_without_commission() {
        let mut account = Account::new(10_000.0, 0.0).unwrap();
        let trade = account
            .process_fill(fill(TradeSide::Buy, 0, 100.0))
            .cloned()
            .unwrap();

        assert_eq!(trade.id, 1);
        assert_eq!(trade.quantity, 100.0);
        assert_eq!(trade.amount, 10_000.0);
        assert_eq!(trade.commission, 0.0);
        assert_eq!(account.cash, 0.0);
        assert_eq!(account.state(), AccountState::Long);
        assert_eq!(account.equity(110.0), 11_000.0);
    }

    #[test]
    fn test_round_trip_with_commission() {
        let mut account = Account::new(10_100.0, 0.01).unwrap();
        account.process_fill(fill(TradeSide::Buy, 0, 100.0));

        //quantity = 10100 / (100 * 1.01) = 100
        let position = account.position.clone().unwrap();
        assert!((position.quantity - 100.0).abs() < 1e-9);
        assert!((account.total_commission - 100.0).abs() < 1e-9);
        assert_eq!(account.cash, 0.0);

        let sell = account
            .process_fill(fill(TradeSide::Sell, 5, 120.0))
            .cloned()
            .unwrap();
        assert_eq!(sell.id, 2);
        assert!((sell.amount - 12_000.0).abs() < 1e-6);
        assert!((sell.commission - 120.0).abs() < 1e-6);
        assert!((account.cash - 11_880.0).abs() < 1e-6);
        assert!((account.total_commission - 220.0).abs() < 1e-6);
        assert_eq!(account.state(), AccountState::Flat);
        assert_eq!(account.equity(1.0), account.cash);
    }

    #[test]
    fn test_ignores_out_of_state_fills() {
        let mut account = Account::new(1_000.0, 0.0).unwrap();
        assert!(account.process_fill(fill(TradeSide::Sell, 0, 10.0)).is_none());
        account.process_fill(fill(TradeSide::Buy, 1, 10.0));
        assert!(account.process_fill(fill(TradeSide::Buy, 2, 11.0)).is_none());
        assert_eq!(account.trade_log.len(), 1);
    }
}
