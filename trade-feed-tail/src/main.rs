use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use trade_feed::{
    BinanceClient, BinanceSymbolResolver, CurrencyPair, FeedConfig, FeedError, MarketDataClient,
    ReloadCoordinator, ReloadDispatcher, SimulatedMarket, SymbolResolver, Trade, TradeFeedModel,
    TradeRow,
};
use trade_feed_buffer::{BufferAction, RingBuffer};

/// Rows logged after each completed reload.
const ROWS_SHOWN_AFTER_RELOAD: usize = 5;

#[tokio::main]
async fn main() {
    init_logging();

    let config = FeedConfig::from_env();
    let pair = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ")
        .parse_pair()
        .unwrap_or_else(|| CurrencyPair::new("BTC", "USDT"));

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(error) = tokio::signal::ctrl_c().await {
                error!(%error, "failed to listen for ctrl-c");
            }
            info!("shutting down");
            shutdown.cancel();
        }
    });

    let result = if std::env::var("TRADE_FEED_SIMULATE").is_ok() {
        info!("using simulated market");
        let market = Arc::new(SimulatedMarket::default());
        run(config, pair, Arc::clone(&market), market, shutdown).await
    } else {
        match BinanceClient::new(&config) {
            Ok(client) => {
                let resolver = Arc::new(BinanceSymbolResolver::new(client.clone()));
                run(config, pair, Arc::new(client), resolver, shutdown).await
            }
            Err(error) => Err(error),
        }
    };

    if let Err(error) = result {
        error!(%error, "trade feed tail failed");
    }
}

async fn run<Client, Resolver>(
    config: FeedConfig,
    pair: CurrencyPair,
    client: Arc<Client>,
    resolver: Arc<Resolver>,
    shutdown: CancellationToken,
) -> Result<(), FeedError>
where
    Client: MarketDataClient + 'static,
    Resolver: SymbolResolver + 'static,
{
    config.validate()?;
    info!(?config, "starting trade feed tail");

    let model = Arc::new(TradeFeedModel::new(
        config.trades_count_limit,
        config.live_channel_capacity,
    )?);
    let rows = Arc::new(Mutex::new(RingBuffer::new(config.trades_count_limit)?));
    model
        .mirror_trades(Arc::clone(&rows), |trade: &Trade| TradeRow::from(trade))
        .await?;

    tokio::spawn(log_trade_changes(Arc::clone(&model), shutdown.clone()));
    tokio::spawn(log_reloads(Arc::clone(&model), rows, shutdown.clone()));

    let coordinator = Arc::new(ReloadCoordinator::new(
        Arc::clone(&model),
        client,
        resolver,
        shutdown.clone(),
    ));
    let (dispatcher, dispatcher_handle) = ReloadDispatcher::spawn(coordinator, shutdown.clone());

    select_pair(&dispatcher, pair).await;
    info!("enter a currency pair, eg/ `ETH USDT`, to switch");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => match line.parse_pair() {
                Some(pair) => select_pair(&dispatcher, pair).await,
                None => warn!(input = %line.trim(), "expected two currency names"),
            },
            Ok(None) => {
                // stdin closed, keep tailing until ctrl-c
                shutdown.cancelled().await;
                break;
            }
            Err(error) => {
                error!(%error, "failed to read stdin");
                shutdown.cancelled().await;
                break;
            }
        }
    }

    if let Err(error) = dispatcher_handle.await {
        error!(%error, "reload dispatcher panicked");
    }
    Ok(())
}

async fn select_pair(dispatcher: &ReloadDispatcher, pair: CurrencyPair) {
    if dispatcher.select_pair(pair.clone()).await {
        info!(%pair, "loading trades");
    } else {
        warn!(
            %pair,
            loading = dispatcher.model().is_loading(),
            active = %dispatcher.model().active_pair(),
            "reload not allowed"
        );
    }
}

/// Log each live trade, and errors published by failed reloads.
async fn log_trade_changes(model: Arc<TradeFeedModel>, shutdown: CancellationToken) {
    let mut changes_rx = model.subscribe_trades();
    let mut errors_rx = model.subscribe_errors();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            change = changes_rx.recv() => match change {
                // Live trades arrive one per change, snapshots are logged by log_reloads
                Ok(change) if change.action == BufferAction::PushFront && change.added.len() == 1 => {
                    let row = TradeRow::from(&change.added[0]);
                    info!(time = %row.time, kind = row.kind, price = %row.price, amount = %row.amount, "trade");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "trade log lagging"),
                Err(RecvError::Closed) => break,
            },
            changed = errors_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(error) = errors_rx.borrow_and_update().as_ref() {
                    error!(%error, "reload failed");
                }
            }
        }
    }
}

/// Log the newest rows once a reload finishes loading.
async fn log_reloads(
    model: Arc<TradeFeedModel>,
    rows: Arc<Mutex<RingBuffer<TradeRow>>>,
    shutdown: CancellationToken,
) {
    let mut loading_rx = model.subscribe_loading();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = loading_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        if *loading_rx.borrow_and_update() {
            continue;
        }

        let table = rows.lock();
        info!(pair = %model.active_pair(), rows = table.size(), "trades loaded");
        for row in table.iter().take(ROWS_SHOWN_AFTER_RELOAD) {
            info!(time = %row.time, kind = row.kind, price = %row.price, amount = %row.amount, "trade");
        }
    }
}

trait ParsePair {
    fn parse_pair(&self) -> Option<CurrencyPair>;
}

impl ParsePair for str {
    /// Accepts `BTC USDT`, `BTC/USDT` and `btc-usdt`.
    fn parse_pair(&self) -> Option<CurrencyPair> {
        let mut names = self
            .split(|c: char| c.is_whitespace() || c == '/' || c == '-')
            .filter(|name| !name.is_empty());

        match (names.next(), names.next(), names.next()) {
            (Some(base), Some(quote), None) => Some(CurrencyPair::new(
                base.to_ascii_uppercase(),
                quote.to_ascii_uppercase(),
            )),
            _ => None,
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
