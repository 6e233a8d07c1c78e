use crate::{error::FeedError, trade::Trade};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// [`MarketDataClient`] for the Binance spot market (REST snapshot + WebSocket trade stream).
pub mod binance;

/// Offline [`MarketDataClient`] producing random trades.
pub mod simulated;

/// Live trades delivered by a [`Subscription`], in arrival order.
pub type TradeUpdates = BoxStream<'static, Trade>;

/// Snapshot fetch and live subscription for a market symbol.
///
/// Implementations must stop work promptly once the passed token is cancelled.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Fetch at most `limit` of the most recent trades for `symbol`, oldest first.
    async fn fetch_recent_trades(
        &self,
        symbol: &str,
        limit: usize,
        token: &CancellationToken,
    ) -> Result<Vec<Trade>, FeedError>;

    /// Open a live trade stream for `symbol` that yields until `token` is cancelled.
    async fn subscribe_trade_updates(
        &self,
        symbol: &str,
        token: CancellationToken,
    ) -> Result<Subscription, FeedError>;
}

/// Open live trade stream for a symbol.
pub struct Subscription {
    pub symbol: String,
    pub updates: TradeUpdates,
}

impl Subscription {
    pub fn new(symbol: impl Into<String>, updates: TradeUpdates) -> Self {
        Self {
            symbol: symbol.into(),
            updates,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("symbol", &self.symbol)
            .finish_non_exhaustive()
    }
}
