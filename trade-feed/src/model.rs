use crate::{
    error::FeedError,
    trade::{CurrencyPair, Trade},
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{MutexGuard, broadcast, watch};
use trade_feed_buffer::{BufferChange, ObserverId, RingBuffer, subscribe_mirror};

/// Exclusive access to the trade buffer, held for the duration of a critical section.
pub type TradesGuard<'a> = MutexGuard<'a, RingBuffer<Trade>>;

/// Observable state of the trade feed: the trade buffer, the active [`CurrencyPair`] and the
/// loading flag.
///
/// The loading flag and the trade buffer are guarded by independent locks. The buffer itself
/// does no locking; every access goes through [`TradeFeedModel::modify_trades`] or
/// [`TradeFeedModel::lock_trades`].
#[derive(Debug)]
pub struct TradeFeedModel {
    loading: Mutex<bool>,
    loading_tx: watch::Sender<bool>,
    active_pair_tx: watch::Sender<CurrencyPair>,
    last_error_tx: watch::Sender<Option<FeedError>>,
    trades: tokio::sync::Mutex<RingBuffer<Trade>>,
    trade_changes_tx: broadcast::Sender<BufferChange<Trade>>,
    capacity: usize,
}

impl TradeFeedModel {
    /// Create a model whose trade buffer holds at most `capacity` trades. `change_capacity`
    /// bounds how many unread [`BufferChange`]s a lagging subscriber may fall behind by.
    pub fn new(capacity: usize, change_capacity: usize) -> Result<Self, FeedError> {
        let mut trades = RingBuffer::new(capacity)?;
        let (trade_changes_tx, _) = broadcast::channel(change_capacity.max(1));

        let changes_tx = trade_changes_tx.clone();
        trades.subscribe(move |change: &BufferChange<Trade>| {
            // No receivers is fine, nobody is watching yet
            let _ = changes_tx.send(change.clone());
        });

        Ok(Self {
            loading: Mutex::new(false),
            loading_tx: watch::Sender::new(false),
            active_pair_tx: watch::Sender::new(CurrencyPair::default()),
            last_error_tx: watch::Sender::new(None),
            trades: tokio::sync::Mutex::new(trades),
            trade_changes_tx,
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.lock()
    }

    pub fn set_loading(&self, value: bool) {
        let mut loading = self.loading.lock();
        *loading = value;
        self.loading_tx.send_if_modified(|current| {
            let modified = *current != value;
            *current = value;
            modified
        });
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading_tx.subscribe()
    }

    pub fn active_pair(&self) -> CurrencyPair {
        self.active_pair_tx.borrow().clone()
    }

    /// Set by the requester before a reload is dispatched, so views can reflect the new
    /// selection while the snapshot is loading.
    pub fn set_active_pair(&self, pair: CurrencyPair) {
        self.active_pair_tx.send_replace(pair);
    }

    pub fn subscribe_active_pair(&self) -> watch::Receiver<CurrencyPair> {
        self.active_pair_tx.subscribe()
    }

    pub fn last_error(&self) -> Option<FeedError> {
        self.last_error_tx.borrow().clone()
    }

    pub fn set_last_error(&self, error: Option<FeedError>) {
        self.last_error_tx.send_replace(error);
    }

    pub fn subscribe_errors(&self) -> watch::Receiver<Option<FeedError>> {
        self.last_error_tx.subscribe()
    }

    /// Receive every [`BufferChange`] raised by the trade buffer from now on.
    pub fn subscribe_trades(&self) -> broadcast::Receiver<BufferChange<Trade>> {
        self.trade_changes_tx.subscribe()
    }

    /// Run `action` with exclusive access to the trade buffer.
    pub async fn modify_trades<F, R>(&self, action: F) -> R
    where
        F: FnOnce(&mut RingBuffer<Trade>) -> R,
    {
        let mut trades = self.trades.lock().await;
        action(&mut trades)
    }

    /// Acquire the trade buffer lock for a critical section that spans `.await` points.
    pub async fn lock_trades(&self) -> TradesGuard<'_> {
        self.trades.lock().await
    }

    /// Consistent front-to-back copy of the trade buffer.
    pub async fn trades_snapshot(&self) -> Vec<Trade> {
        self.modify_trades(|trades| trades.to_vec()).await
    }

    /// Keep `mirror` in lockstep with the trade buffer, storing `transform(trade)`.
    pub async fn mirror_trades<U, F>(
        &self,
        mirror: Arc<Mutex<RingBuffer<U>>>,
        transform: F,
    ) -> Result<ObserverId, FeedError>
    where
        U: Clone + Send + 'static,
        F: Fn(&Trade) -> U + Send + 'static,
    {
        self.modify_trades(|trades| subscribe_mirror(trades, mirror, transform))
            .await
            .map_err(FeedError::from)
    }

    /// Whether a reload for `candidate` should be offered: nothing is loading, the pair is well
    /// formed, and either no trades are held or `candidate` differs from the active pair.
    pub async fn can_reload(&self, candidate: &CurrencyPair) -> bool {
        if self.is_loading() || !candidate.is_well_formed() {
            return false;
        }

        let is_empty = self.modify_trades(|trades| trades.is_empty()).await;
        is_empty || *candidate != self.active_pair()
    }
}
