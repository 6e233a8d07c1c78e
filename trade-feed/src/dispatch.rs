use crate::{
    client::MarketDataClient,
    coordinator::{ReloadCoordinator, ReloadOutcome},
    model::TradeFeedModel,
    symbol::SymbolResolver,
    trade::CurrencyPair,
};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Request to reload the trade buffer for the model's active [`CurrencyPair`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReloadRequest;

/// Front door used by views to change the active [`CurrencyPair`].
///
/// The requester sets the active pair itself, then the dispatcher loop spawned by
/// [`ReloadDispatcher::spawn`] runs [`ReloadCoordinator::request_reload`] for it.
#[derive(Debug, Clone)]
pub struct ReloadDispatcher {
    model: Arc<TradeFeedModel>,
    request_tx: mpsc::UnboundedSender<ReloadRequest>,
}

impl ReloadDispatcher {
    /// Start the dispatcher loop, which runs until `shutdown` is cancelled or every
    /// [`ReloadDispatcher`] handle is dropped.
    pub fn spawn<Client, Resolver>(
        coordinator: Arc<ReloadCoordinator<Client, Resolver>>,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>)
    where
        Client: MarketDataClient + 'static,
        Resolver: SymbolResolver + 'static,
    {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            model: Arc::clone(coordinator.model()),
            request_tx,
        };

        let handle = tokio::spawn(run_dispatcher(coordinator, request_rx, shutdown));
        (dispatcher, handle)
    }

    pub fn model(&self) -> &Arc<TradeFeedModel> {
        &self.model
    }

    /// Make `pair` active and request a reload if the model allows one.
    ///
    /// Returns `false` and leaves the model untouched when the reload is not allowed, eg/ while
    /// another reload is loading.
    pub async fn select_pair(&self, pair: CurrencyPair) -> bool {
        if !self.model.can_reload(&pair).await {
            debug!(%pair, "reload not allowed");
            return false;
        }

        self.model.set_active_pair(pair);
        self.request_reload()
    }

    /// Request a reload of the current active pair. Returns `false` if the dispatcher loop
    /// has stopped.
    pub fn request_reload(&self) -> bool {
        self.request_tx.send(ReloadRequest).is_ok()
    }
}

async fn run_dispatcher<Client, Resolver>(
    coordinator: Arc<ReloadCoordinator<Client, Resolver>>,
    mut request_rx: mpsc::UnboundedReceiver<ReloadRequest>,
    shutdown: CancellationToken,
) where
    Client: MarketDataClient + 'static,
    Resolver: SymbolResolver + 'static,
{
    info!("reload dispatcher started");

    loop {
        let request = tokio::select! {
            _ = shutdown.cancelled() => break,
            request = request_rx.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        let pair = coordinator.model().active_pair();
        debug!(?request, %pair, "dispatching reload");

        // Each reload runs on its own task so a newer request can supersede it
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            let model = coordinator.model();
            match coordinator.request_reload(&pair).await {
                Ok(ReloadOutcome::Streaming { .. }) => model.set_last_error(None),
                Ok(outcome) => debug!(%pair, ?outcome, "reload ended without streaming"),
                Err(error) if error.is_cancellation() => {
                    debug!(%pair, %error, "reload cancelled");
                }
                Err(error) => {
                    error!(%pair, %error, "failed to reload trades");
                    model.set_last_error(Some(error));
                }
            }
        });
    }

    coordinator.cancel_current();
    info!("reload dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::{Subscription, simulated::SimulatedMarket},
        error::FeedError,
        trade::Trade,
    };
    use async_trait::async_trait;
    use std::time::Duration;
    use trade_feed_buffer::BufferAction;

    /// Client whose calls end as if their token had been cancelled.
    struct CancellingMarket;

    #[async_trait]
    impl MarketDataClient for CancellingMarket {
        async fn fetch_recent_trades(
            &self,
            _: &str,
            _: usize,
            _: &CancellationToken,
        ) -> Result<Vec<Trade>, FeedError> {
            Err(FeedError::Cancelled)
        }

        async fn subscribe_trade_updates(
            &self,
            _: &str,
            _: CancellationToken,
        ) -> Result<Subscription, FeedError> {
            Err(FeedError::Cancelled)
        }
    }

    fn dispatcher(shutdown: &CancellationToken) -> (ReloadDispatcher, JoinHandle<()>) {
        let model = Arc::new(TradeFeedModel::new(10, 64).unwrap());
        let market = Arc::new(SimulatedMarket::default());
        let coordinator = Arc::new(ReloadCoordinator::new(
            model,
            Arc::clone(&market),
            market,
            shutdown.clone(),
        ));
        ReloadDispatcher::spawn(coordinator, shutdown.clone())
    }

    #[tokio::test]
    async fn test_select_pair_reloads_active_pair() {
        let shutdown = CancellationToken::new();
        let (dispatcher, handle) = dispatcher(&shutdown);
        let mut loading_rx = dispatcher.model().subscribe_loading();
        let mut changes_rx = dispatcher.model().subscribe_trades();
        let pair = CurrencyPair::new("ETH", "USDT");

        assert!(dispatcher.select_pair(pair.clone()).await);
        assert_eq!(dispatcher.model().active_pair(), pair);

        // Snapshot applied
        loop {
            let change = changes_rx.recv().await.unwrap();
            if change.action == BufferAction::PushFront {
                assert_eq!(change.added.len(), 10);
                break;
            }
        }
        loading_rx.wait_for(|loading| !*loading).await.unwrap();
        assert_eq!(dispatcher.model().trades_snapshot().await.len(), 10);
        assert_eq!(dispatcher.model().last_error(), None);

        // Same pair with trades held is not reloaded
        assert!(!dispatcher.select_pair(pair).await);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_reload_publishes_error() {
        let shutdown = CancellationToken::new();
        let (dispatcher, handle) = dispatcher(&shutdown);
        let mut errors_rx = dispatcher.model().subscribe_errors();

        // Bypass eligibility to send an unresolvable pair
        let pair = CurrencyPair::new("BTC", "BTC");
        dispatcher.model().set_active_pair(pair.clone());
        assert!(dispatcher.request_reload());

        let error = errors_rx
            .wait_for(|error| error.is_some())
            .await
            .unwrap()
            .clone();
        assert_eq!(error, Some(FeedError::InvalidPair(pair)));

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_reload_does_not_publish_error() {
        let shutdown = CancellationToken::new();
        let model = Arc::new(TradeFeedModel::new(10, 64).unwrap());
        let coordinator = Arc::new(ReloadCoordinator::new(
            model,
            Arc::new(CancellingMarket),
            Arc::new(SimulatedMarket::default()),
            shutdown.clone(),
        ));
        let (dispatcher, handle) = ReloadDispatcher::spawn(coordinator, shutdown.clone());
        let mut changes_rx = dispatcher.model().subscribe_trades();

        assert!(dispatcher.select_pair(CurrencyPair::new("ETH", "USDT")).await);

        // Buffer cleared as the reload ends
        assert_eq!(changes_rx.recv().await.unwrap().action, BufferAction::Clear);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!dispatcher.model().is_loading());
        assert_eq!(dispatcher.model().last_error(), None);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
