use crate::{
    client::{MarketDataClient, Subscription},
    error::FeedError,
    symbol::SymbolResolver,
    trade::{CurrencyPair, Trade},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use rand::Rng;
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default delay between simulated live trades.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Offline market producing random trades for any well formed [`CurrencyPair`].
///
/// Symbols are the concatenated currency names, eg/ `BTC/USDT` resolves to `BTCUSDT`.
#[derive(Debug, Clone)]
pub struct SimulatedMarket {
    tick_interval: Duration,
    live_channel_capacity: usize,
}

impl Default for SimulatedMarket {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            live_channel_capacity: 64,
        }
    }
}

impl SimulatedMarket {
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_live_channel_capacity(mut self, capacity: usize) -> Self {
        self.live_channel_capacity = capacity.max(1);
        self
    }
}

#[async_trait]
impl MarketDataClient for SimulatedMarket {
    async fn fetch_recent_trades(
        &self,
        symbol: &str,
        limit: usize,
        token: &CancellationToken,
    ) -> Result<Vec<Trade>, FeedError> {
        if token.is_cancelled() {
            return Err(FeedError::Cancelled);
        }

        // Oldest first, spaced one tick apart and ending now
        let now = Utc::now();
        let tick = chrono::Duration::from_std(self.tick_interval)
            .map_err(|error| FeedError::Config(error.to_string()))?;
        let trades = (0..limit)
            .rev()
            .map(|age| {
                i32::try_from(age)
                    .ok()
                    .and_then(|age| tick.checked_mul(age))
                    .and_then(|offset| now.checked_sub_signed(offset))
                    .map(random_trade)
                    .ok_or_else(|| {
                        FeedError::Config(format!("{limit} trades overflow the simulated clock"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(symbol, count = trades.len(), "generated simulated trades");
        Ok(trades)
    }

    async fn subscribe_trade_updates(
        &self,
        symbol: &str,
        token: CancellationToken,
    ) -> Result<Subscription, FeedError> {
        if token.is_cancelled() {
            return Err(FeedError::Cancelled);
        }

        let (tx, rx) = mpsc::channel(self.live_channel_capacity);
        let tick_interval = self.tick_interval;
        let stream_symbol = symbol.to_string();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            // First tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if tx.send(random_trade(Utc::now())).await.is_err() {
                            break;
                        }
                    }
                }
            }

            debug!(symbol = %stream_symbol, "simulated trade stream stopped");
        });

        Ok(Subscription::new(symbol, ReceiverStream::new(rx).boxed()))
    }
}

#[async_trait]
impl SymbolResolver for SimulatedMarket {
    async fn get_symbol(&self, pair: &CurrencyPair) -> Result<String, FeedError> {
        if !pair.is_well_formed() {
            return Err(FeedError::InvalidPair(pair.clone()));
        }

        Ok(format!(
            "{}{}",
            pair.base.trim().to_ascii_uppercase(),
            pair.quote.trim().to_ascii_uppercase()
        ))
    }
}

fn random_trade(time: DateTime<Utc>) -> Trade {
    let mut rng = rand::rng();

    Trade {
        is_buy: rng.random_bool(0.5),
        price: Decimal::new(rng.random_range(1..=1_000_000), 2),
        amount: Decimal::new(rng.random_range(1..=100_000), 4),
        time,
    }
}
