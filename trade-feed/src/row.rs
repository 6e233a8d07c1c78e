use crate::trade::Trade;
use serde::Serialize;

/// Render-ready view of a [`Trade`], kept in a buffer mirrored from the trade buffer.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct TradeRow {
    pub time: String,
    pub kind: &'static str,
    pub is_buy: bool,
    pub price: String,
    pub amount: String,
}

impl From<&Trade> for TradeRow {
    fn from(trade: &Trade) -> Self {
        Self {
            time: trade.time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            kind: trade.side_str(),
            is_buy: trade.is_buy,
            price: trade.price.abs().normalize().to_string(),
            amount: trade.amount.normalize().to_string(),
        }
    }
}
