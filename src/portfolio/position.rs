use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//an open long position, exists only while quantity > 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_timestamp: DateTime<Utc>,
    pub entry_index: usize,
}

impl Position {
    pub fn open(
        quantity: f64,
        entry_price: f64,
        entry_timestamp: DateTime<Utc>,
        entry_index: usize,
    ) -> Self {
        Position {
            quantity,
            entry_price,
            entry_timestamp,
            entry_index,
        }
    }

    //mark-to-market value at a given price
    pub fn market_value(&self, current_price: f64) -> f64 {
        self.quantity * current_price
    }

    //calculates unrealized pnl at a given price, before exit commission
    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        (current_price - self.entry_price) * self.quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mark_to_market() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let position = Position::open(2.0, 50.0, ts, 0);
        assert_eq!(position.market_value(60.0), 120.0);
        assert_eq!(position.unrealized_pnl(45.0), -10.0);
    }
}
