//! # Trade-Feed
//! Most-recent-first live trade feed for a single [`CurrencyPair`].
//!
//! A [`ReloadCoordinator`] seeds the [`TradeFeedModel`] trade buffer with a REST snapshot and
//! then streams live trades into it. A newer reload request always supersedes an in-flight one:
//! the older attempt is cancelled and its results are discarded, so stale trades never land
//! after fresher ones.
//!
//! ## Main Components
//! * [`TradeFeedModel`]: trade [`RingBuffer`](trade_feed_buffer::RingBuffer), active pair and
//!   loading flag, each observable.
//! * [`ReloadCoordinator`]: takeover, snapshot and live stream state machine.
//! * [`ReloadDispatcher`]: channel through which views request reloads.
//! * [`MarketDataClient`] & [`SymbolResolver`]: market data collaborators, implemented for
//!   Binance ([`BinanceClient`]) and an offline [`SimulatedMarket`].

/// [`MarketDataClient`] trait and its Binance & simulated implementations.
pub mod client;

/// [`FeedConfig`] & defaults.
pub mod config;

/// [`ReloadCoordinator`], [`ReloadToken`] and live trade handling.
pub mod coordinator;

/// Serde helpers for exchange payloads.
pub mod de;

/// [`ReloadDispatcher`] request channel.
pub mod dispatch;

/// All errors generated in `trade-feed`.
pub mod error;

/// [`TradeFeedModel`] observable state.
pub mod model;

/// Render-ready [`TradeRow`].
pub mod row;

/// [`SymbolResolver`] and the exchange listing lookup table.
pub mod symbol;

/// [`Trade`] & [`CurrencyPair`].
pub mod trade;

pub use client::{
    MarketDataClient, Subscription, TradeUpdates,
    binance::{BinanceClient, BinanceSymbolResolver},
    simulated::SimulatedMarket,
};
pub use config::FeedConfig;
pub use coordinator::{LiveTrade, ReloadCoordinator, ReloadOutcome, ReloadToken, on_next_trade};
pub use dispatch::{ReloadDispatcher, ReloadRequest};
pub use error::FeedError;
pub use model::TradeFeedModel;
pub use row::TradeRow;
pub use symbol::{LazySymbolResolver, SymbolListing, SymbolResolver, SymbolSource, SymbolTable};
pub use trade::{CurrencyPair, Trade};
