use crate::{
    client::{MarketDataClient, Subscription},
    error::FeedError,
    model::{TradeFeedModel, TradesGuard},
    symbol::SymbolResolver,
    trade::{CurrencyPair, Trade},
};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, error, info, warn};

/// Cancellation handle owned by a single reload attempt.
///
/// Clones share identity. Supersession is detected by comparing the handle stored as current
/// against the attempt's own handle with [`ReloadToken::is_same_attempt`], never by value.
#[derive(Debug, Clone)]
pub struct ReloadToken(Arc<ReloadTokenInner>);

#[derive(Debug)]
struct ReloadTokenInner {
    attempt: u64,
    cancel: CancellationToken,
}

impl ReloadToken {
    fn new(attempt: u64, cancel: CancellationToken) -> Self {
        Self(Arc::new(ReloadTokenInner { attempt, cancel }))
    }

    /// Sequence number of the attempt, starting at 1. Used for logging only.
    pub fn attempt(&self) -> u64 {
        self.0.attempt
    }

    pub fn is_same_attempt(&self, other: &ReloadToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancel.is_cancelled()
    }

    pub fn cancel(&self) {
        self.0.cancel.cancel()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.0.cancel.cancelled()
    }

    /// Underlying [`CancellationToken`] handed to the [`MarketDataClient`].
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.0.cancel
    }
}

/// How a successful call to [`ReloadCoordinator::request_reload`] ended.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ReloadOutcome {
    /// Snapshot applied and live trades for `symbol` are being streamed into the buffer.
    Streaming { symbol: String },
    /// A newer request took over before this attempt finished. The buffer was left to it.
    Superseded,
    /// The process shutdown token was cancelled.
    Shutdown,
}

/// What [`on_next_trade`] did with a live trade.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LiveTrade {
    Applied,
    /// A reload is in progress and will supply a fresh snapshot.
    DroppedWhileLoading,
    /// The subscription delivering the trade belongs to a superseded attempt.
    DroppedSuperseded,
}

/// Serialises reload requests for the [`TradeFeedModel`] so at most one attempt owns the trade
/// buffer, and merges each attempt's snapshot with its live trade stream.
///
/// Two locks are used, always in this order: the takeover lock (current [`ReloadToken`] and the
/// loading flag transition) and then the trades lock held by [`TradeFeedModel`].
#[derive(Debug)]
pub struct ReloadCoordinator<Client, Resolver> {
    model: Arc<TradeFeedModel>,
    client: Arc<Client>,
    resolver: Arc<Resolver>,
    trades_count_limit: usize,
    shutdown: CancellationToken,
    current: Mutex<Option<ReloadToken>>,
    attempts: AtomicU64,
}

impl<Client, Resolver> ReloadCoordinator<Client, Resolver>
where
    Client: MarketDataClient + 'static,
    Resolver: SymbolResolver + 'static,
{
    /// Snapshots are bounded by the trade buffer capacity of `model`. Every reload token is a
    /// child of `shutdown`.
    pub fn new(
        model: Arc<TradeFeedModel>,
        client: Arc<Client>,
        resolver: Arc<Resolver>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            trades_count_limit: model.capacity(),
            model,
            client,
            resolver,
            shutdown,
            current: Mutex::new(None),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn model(&self) -> &Arc<TradeFeedModel> {
        &self.model
    }

    /// Token of the attempt that currently owns the trade buffer, if any.
    pub fn current_token(&self) -> Option<ReloadToken> {
        self.current.lock().clone()
    }

    /// Replace the trade buffer contents with a snapshot for `pair` and stream live trades
    /// into it until the next reload.
    ///
    /// A newer request supersedes this one at any point. Errors from symbol resolution,
    /// the snapshot fetch or the subscription leave the buffer empty and are returned.
    /// The loading flag is reset on every path unless a newer attempt has taken over,
    /// including when the returned future is dropped early.
    pub async fn request_reload(&self, pair: &CurrencyPair) -> Result<ReloadOutcome, FeedError> {
        let token = self.take_over(pair);
        let _release = Release {
            current: &self.current,
            model: &self.model,
            token: token.clone(),
        };

        let mut trades = self.model.lock_trades().await;
        if token.is_cancelled() {
            debug!(attempt = token.attempt(), %pair, "reload superseded before loading");
            return Ok(self.abandoned());
        }

        match self.load(&mut trades, pair, &token).await {
            Ok(Some(subscription)) => {
                let symbol = subscription.symbol.clone();
                self.spawn_forwarder(subscription, token.clone());
                info!(attempt = token.attempt(), %pair, %symbol, "streaming live trades");
                Ok(ReloadOutcome::Streaming { symbol })
            }
            Ok(None) => Ok(self.abandoned()),
            Err(error) if token.is_cancelled() => {
                debug!(attempt = token.attempt(), %pair, %error, "reload superseded while loading");
                Ok(self.abandoned())
            }
            Err(error) => {
                trades.clear();
                warn!(attempt = token.attempt(), %pair, %error, "reload failed");
                Err(error)
            }
        }
    }

    /// Cancel the attempt that currently owns the trade buffer, stopping its live stream.
    pub fn cancel_current(&self) {
        if let Some(token) = self.current.lock().as_ref() {
            token.cancel();
        }
    }

    fn take_over(&self, pair: &CurrencyPair) -> ReloadToken {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let token = ReloadToken::new(attempt, self.shutdown.child_token());

        let mut current = self.current.lock();
        self.model.set_loading(true);
        if let Some(previous) = current.replace(token.clone()) {
            debug!(attempt, superseded = previous.attempt(), "cancelling previous reload");
            previous.cancel();
        }
        drop(current);

        info!(attempt, %pair, "reload requested");
        token
    }

    /// Resolve, fetch and apply the snapshot, then subscribe. `None` if superseded midway.
    ///
    /// Once the snapshot is applied, every early return clears it again.
    async fn load(
        &self,
        trades: &mut TradesGuard<'_>,
        pair: &CurrencyPair,
        token: &ReloadToken,
    ) -> Result<Option<Subscription>, FeedError> {
        let symbol = self.resolver.get_symbol(pair).await?;
        let snapshot = self
            .client
            .fetch_recent_trades(&symbol, self.trades_count_limit, token.cancellation_token())
            .await?;

        // Superseded during the fetch, the result is stale
        if token.is_cancelled() {
            return Ok(None);
        }

        debug!(attempt = token.attempt(), %symbol, count = snapshot.len(), "applying trade snapshot");
        trades.clear();
        trades.push_front_n(snapshot);

        if token.is_cancelled() {
            trades.clear();
            return Ok(None);
        }

        let subscribed = self
            .client
            .subscribe_trade_updates(&symbol, token.cancellation_token().clone())
            .await;

        // Superseded during the subscribe, the applied snapshot is stale as well
        if token.is_cancelled() {
            trades.clear();
            return Ok(None);
        }

        match subscribed {
            Ok(subscription) => Ok(Some(subscription)),
            Err(error) => {
                trades.clear();
                Err(error)
            }
        }
    }

    fn spawn_forwarder(&self, subscription: Subscription, token: ReloadToken) {
        let model = Arc::clone(&self.model);
        let Subscription { symbol, mut updates } = subscription;

        tokio::spawn(async move {
            loop {
                let trade = tokio::select! {
                    _ = token.cancelled() => break,
                    trade = updates.next() => match trade {
                        Some(trade) => trade,
                        None => {
                            warn!(attempt = token.attempt(), %symbol, "live trade stream ended");
                            break;
                        }
                    },
                };

                on_next_trade(&model, trade, &token).await;
            }

            debug!(attempt = token.attempt(), %symbol, "stopped forwarding live trades");
        });
    }

    fn abandoned(&self) -> ReloadOutcome {
        if self.shutdown.is_cancelled() {
            ReloadOutcome::Shutdown
        } else {
            ReloadOutcome::Superseded
        }
    }
}

impl<Client, Resolver> Drop for ReloadCoordinator<Client, Resolver> {
    fn drop(&mut self) {
        if let Some(token) = self.current.get_mut().take() {
            token.cancel();
        }
    }
}

/// Apply a live trade delivered to the attempt owning `token`.
///
/// Trades are dropped while any reload is loading. The loading flag is read again with the
/// trades lock held since only that read is atomic with the push.
pub async fn on_next_trade(model: &TradeFeedModel, trade: Trade, token: &ReloadToken) -> LiveTrade {
    if model.is_loading() {
        debug!(attempt = token.attempt(), "dropped live trade while loading");
        return LiveTrade::DroppedWhileLoading;
    }

    let outcome = model
        .modify_trades(|trades| {
            if model.is_loading() {
                LiveTrade::DroppedWhileLoading
            } else if token.is_cancelled() {
                LiveTrade::DroppedSuperseded
            } else {
                trades.push_front(trade);
                LiveTrade::Applied
            }
        })
        .await;

    if outcome != LiveTrade::Applied {
        debug!(attempt = token.attempt(), ?outcome, "dropped live trade");
    }
    outcome
}

/// Resets the loading flag when an attempt ends, if that attempt still owns it.
struct Release<'a> {
    current: &'a Mutex<Option<ReloadToken>>,
    model: &'a TradeFeedModel,
    token: ReloadToken,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        let current = self.current.lock();
        match current.as_ref() {
            Some(owner) if owner.is_same_attempt(&self.token) => self.model.set_loading(false),
            Some(owner) => debug!(
                attempt = self.token.attempt(),
                owner = owner.attempt(),
                "loading flag left to newer reload"
            ),
            None => error!(attempt = self.token.attempt(), "reload finished with no current token"),
        }
    }
}
