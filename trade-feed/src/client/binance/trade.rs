use crate::trade::Trade;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ### Raw Payload Examples
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/rest-api/market-data-endpoints#recent-trades-list>
///```json
/// {
///     "id": 28457,
///     "price": "4.00000100",
///     "qty": "12.00000000",
///     "quoteQty": "48.000012",
///     "time": 1499865549590,
///     "isBuyerMaker": true,
///     "isBestMatch": true
/// }
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct BinanceRecentTrade {
    pub id: u64,
    pub price: Decimal,
    #[serde(rename = "qty")]
    pub amount: Decimal,
    #[serde(
        rename = "time",
        deserialize_with = "crate::de::de_u64_epoch_ms_as_datetime_utc"
    )]
    pub time: DateTime<Utc>,
    #[serde(rename = "isBuyerMaker")]
    pub buyer_is_maker: bool,
}

impl From<BinanceRecentTrade> for Trade {
    fn from(trade: BinanceRecentTrade) -> Self {
        Self {
            is_buy: !trade.buyer_is_maker,
            price: trade.price,
            amount: trade.amount,
            time: trade.time,
        }
    }
}

/// ### Raw Payload Examples
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams#trade-streams>
///```json
/// {
///     "e": "trade",
///     "E": 1672515782136,
///     "s": "BNBBTC",
///     "t": 12345,
///     "p": "0.001",
///     "q": "100",
///     "T": 1672515782136,
///     "m": true,
///     "M": true
/// }
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct BinanceTradeEvent {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "t")]
    pub id: u64,
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "q")]
    pub amount: Decimal,
    #[serde(
        rename = "T",
        deserialize_with = "crate::de::de_u64_epoch_ms_as_datetime_utc"
    )]
    pub time: DateTime<Utc>,
    #[serde(rename = "m")]
    pub buyer_is_maker: bool,
}

impl From<BinanceTradeEvent> for Trade {
    fn from(trade: BinanceTradeEvent) -> Self {
        Self {
            is_buy: !trade.buyer_is_maker,
            price: trade.price,
            amount: trade.amount,
            time: trade.time,
        }
    }
}

/// Error body returned by Binance on a failed REST call, eg/ `{"code":-1121,"msg":"Invalid symbol."}`.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct BinanceApiError {
    pub code: i64,
    pub msg: String,
}
