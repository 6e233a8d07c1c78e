use self::{
    exchange_info::BinanceExchangeInfo,
    trade::{BinanceApiError, BinanceRecentTrade, BinanceTradeEvent},
};
use crate::{
    client::{MarketDataClient, Subscription},
    config::FeedConfig,
    error::FeedError,
    symbol::{LazySymbolResolver, SymbolListing, SymbolSource},
    trade::Trade,
};
use async_trait::async_trait;
use futures::{Future, StreamExt};
use serde::de::DeserializeOwned;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Binance `exchangeInfo` payload.
pub mod exchange_info;

/// Binance recent trade & live trade payloads.
pub mod trade;

/// [`SymbolResolver`](crate::symbol::SymbolResolver) backed by the Binance `exchangeInfo`
/// listing, fetched once on first use.
pub type BinanceSymbolResolver = LazySymbolResolver<BinanceClient>;

type WebSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECENT_TRADES_PATH: &str = "/api/v3/trades";
const EXCHANGE_INFO_PATH: &str = "/api/v3/exchangeInfo";

/// Largest `limit` accepted by the Binance recent trades endpoint.
pub const MAX_RECENT_TRADES_LIMIT: usize = 1000;

/// Binance spot market data client.
#[derive(Debug, Clone)]
pub struct BinanceClient {
    http: reqwest::Client,
    rest_url: Url,
    ws_url: Url,
    live_channel_capacity: usize,
}

impl BinanceClient {
    /// Fails with [`FeedError::Config`] if `config` is invalid or asks for more trades than
    /// [`MAX_RECENT_TRADES_LIMIT`].
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        config.validate()?;
        if config.trades_count_limit > MAX_RECENT_TRADES_LIMIT {
            return Err(FeedError::Config(format!(
                "trades_count_limit {} exceeds the Binance maximum of {MAX_RECENT_TRADES_LIMIT}",
                config.trades_count_limit
            )));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            rest_url: Url::parse(&config.rest_url)?,
            ws_url: Url::parse(&config.ws_url)?,
            live_channel_capacity: config.live_channel_capacity,
        })
    }

    /// `<ws_url>/ws/<symbol>@trade` with the symbol lower-cased.
    pub fn trade_stream_url(&self, symbol: &str) -> Result<Url, FeedError> {
        let path = format!("ws/{}@trade", symbol.to_ascii_lowercase());
        join(&self.ws_url, &path)
    }

    async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, FeedError>
    where
        T: DeserializeOwned,
    {
        let url = join(&self.rest_url, path)?;
        debug!(%url, ?query, "sending Binance REST request");

        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<BinanceApiError>(&body)
                .map(|error| error.msg)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(FeedError::ApiCall(format!("{}: {}", status.as_u16(), message)));
        }

        Ok(serde_json::from_slice::<T>(&body)?)
    }
}

#[async_trait]
impl MarketDataClient for BinanceClient {
    async fn fetch_recent_trades(
        &self,
        symbol: &str,
        limit: usize,
        token: &CancellationToken,
    ) -> Result<Vec<Trade>, FeedError> {
        let query = [("symbol", symbol.to_string()), ("limit", limit.to_string())];
        let trades = cancellable(
            token,
            self.get::<Vec<BinanceRecentTrade>>(RECENT_TRADES_PATH, &query),
        )
        .await?;

        debug!(symbol, count = trades.len(), "fetched Binance recent trades");
        Ok(trades.into_iter().map(Trade::from).collect())
    }

    async fn subscribe_trade_updates(
        &self,
        symbol: &str,
        token: CancellationToken,
    ) -> Result<Subscription, FeedError> {
        let url = self.trade_stream_url(symbol)?;
        let (websocket, _) = cancellable(&token, async {
            connect_async(url.as_str()).await.map_err(FeedError::from)
        })
        .await?;
        info!(symbol, %url, "connected to Binance trade stream");

        let (tx, rx) = mpsc::channel(self.live_channel_capacity);
        tokio::spawn(run_trade_stream(symbol.to_string(), websocket, tx, token));

        Ok(Subscription::new(symbol, ReceiverStream::new(rx).boxed()))
    }
}

#[async_trait]
impl SymbolSource for BinanceClient {
    async fn fetch_symbol_listings(&self) -> Result<Vec<SymbolListing>, FeedError> {
        let info = self.get::<BinanceExchangeInfo>(EXCHANGE_INFO_PATH, &[]).await?;
        Ok(info.symbols.into_iter().map(SymbolListing::from).collect())
    }
}

/// Forward trades read from the `websocket` until `token` is cancelled, the socket closes, or
/// the [`Subscription`] is dropped.
async fn run_trade_stream(
    symbol: String,
    mut websocket: WebSocket,
    tx: mpsc::Sender<Trade>,
    token: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = token.cancelled() => {
                debug!(%symbol, "trade stream cancelled");
                break;
            }
            message = websocket.next() => message,
        };

        match message {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<BinanceTradeEvent>(&text) {
                    Ok(event) => {
                        if tx.send(Trade::from(event)).await.is_err() {
                            debug!(%symbol, "trade receiver dropped, stopping stream");
                            break;
                        }
                    }
                    Err(error) => {
                        warn!(%symbol, %error, payload = text.as_str(), "failed to parse trade event");
                    }
                }
            }
            Some(Ok(Message::Close(frame))) => {
                info!(%symbol, ?frame, "Binance closed trade stream");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(error)) => {
                error!(%symbol, %error, "Binance trade stream failed");
                break;
            }
            None => {
                info!(%symbol, "Binance trade stream ended");
                break;
            }
        }
    }
}

/// Drive `future` to completion unless `token` is cancelled first.
async fn cancellable<T, Fut>(token: &CancellationToken, future: Fut) -> Result<T, FeedError>
where
    Fut: Future<Output = Result<T, FeedError>>,
{
    tokio::select! {
        _ = token.cancelled() => Err(FeedError::Cancelled),
        result = future => result,
    }
}

fn join(base: &Url, path: &str) -> Result<Url, FeedError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(path.trim_start_matches('/'))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(rest_url: &str, ws_url: &str) -> BinanceClient {
        BinanceClient::new(
            &FeedConfig::default()
                .with_rest_url(rest_url)
                .with_ws_url(ws_url),
        )
        .unwrap()
    }

    #[test]
    fn test_trade_stream_url() {
        struct TestCase {
            ws_url: &'static str,
            symbol: &'static str,
            expected: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0: symbol is lower-cased
                ws_url: "wss://stream.binance.com:9443",
                symbol: "BTCUSDT",
                expected: "wss://stream.binance.com:9443/ws/btcusdt@trade",
            },
            TestCase {
                // TC1: base url w/ trailing slash
                ws_url: "wss://stream.binance.com:9443/",
                symbol: "ethbtc",
                expected: "wss://stream.binance.com:9443/ws/ethbtc@trade",
            },
            TestCase {
                // TC2: base url w/ path prefix
                ws_url: "ws://localhost:8080/binance",
                symbol: "ETHBTC",
                expected: "ws://localhost:8080/binance/ws/ethbtc@trade",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = client("https://api.binance.com", test.ws_url)
                .trade_stream_url(test.symbol)
                .unwrap();
            assert_eq!(actual.as_str(), test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let result = BinanceClient::new(&FeedConfig::default().with_rest_url("not a url"));
        assert!(matches!(result, Err(FeedError::Config(_))));
    }

    #[test]
    fn test_new_trades_count_limit() {
        struct TestCase {
            limit: usize,
            expected_ok: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: Binance maximum
                limit: MAX_RECENT_TRADES_LIMIT,
                expected_ok: true,
            },
            TestCase {
                // TC1: above the Binance maximum
                limit: MAX_RECENT_TRADES_LIMIT + 1,
                expected_ok: false,
            },
            TestCase {
                // TC2: zero
                limit: 0,
                expected_ok: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = BinanceClient::new(&FeedConfig::default().with_trades_count_limit(test.limit));
            match (actual, test.expected_ok) {
                (Ok(_), true) => {}
                (Err(FeedError::Config(_)), false) => {}
                (actual, _) => panic!("TC{} failed: {:?}", index, actual),
            }
        }
    }

    #[tokio::test]
    async fn test_cancellable_returns_cancelled() {
        let token = CancellationToken::new();
        token.cancel();

        let result = cancellable(&token, futures::future::pending::<Result<(), FeedError>>()).await;

        assert_eq!(result, Err(FeedError::Cancelled));
    }
}
