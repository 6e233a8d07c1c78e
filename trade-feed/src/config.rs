use crate::error::FeedError;

/// Default number of trades fetched in a snapshot and held in the trade buffer.
pub const DEFAULT_TRADES_COUNT_LIMIT: usize = 1000;

/// Default Binance spot REST base url.
pub const DEFAULT_REST_URL: &str = "https://api.binance.com";

/// Default Binance spot WebSocket base url.
pub const DEFAULT_WS_URL: &str = "wss://stream.binance.com:9443";

/// Trade feed configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Bounds both the snapshot fetch size and the trade buffer capacity. Binance serves at most
    /// 1000 recent trades, so [`BinanceClient::new`](crate::BinanceClient::new) rejects more.
    pub trades_count_limit: usize,
    /// Market data REST base url.
    pub rest_url: String,
    /// Market data WebSocket base url.
    pub ws_url: String,
    /// Live trades buffered between the socket reader and the feed before backpressure.
    pub live_channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            trades_count_limit: DEFAULT_TRADES_COUNT_LIMIT,
            rest_url: DEFAULT_REST_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            live_channel_capacity: 1000,
        }
    }
}

impl FeedConfig {
    /// Build a configuration from `TRADES_COUNT_LIMIT`, `BINANCE_REST_URL` and
    /// `BINANCE_WS_URL`, falling back to defaults for absent or unparsable values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// As [`FeedConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            trades_count_limit: lookup("TRADES_COUNT_LIMIT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.trades_count_limit),
            rest_url: lookup("BINANCE_REST_URL").unwrap_or(defaults.rest_url),
            ws_url: lookup("BINANCE_WS_URL").unwrap_or(defaults.ws_url),
            live_channel_capacity: defaults.live_channel_capacity,
        }
    }

    /// Set the trade count limit
    pub fn with_trades_count_limit(mut self, limit: usize) -> Self {
        self.trades_count_limit = limit;
        self
    }

    /// Set the REST base url
    pub fn with_rest_url(mut self, url: impl Into<String>) -> Self {
        self.rest_url = url.into();
        self
    }

    /// Set the WebSocket base url
    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    /// Set the live trade channel capacity
    pub fn with_live_channel_capacity(mut self, capacity: usize) -> Self {
        self.live_channel_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), FeedError> {
        if self.trades_count_limit == 0 {
            return Err(FeedError::Config(
                "trades_count_limit must be greater than zero".to_string(),
            ));
        }
        if self.live_channel_capacity == 0 {
            return Err(FeedError::Config(
                "live_channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_builder() {
        let config = FeedConfig::default()
            .with_trades_count_limit(500)
            .with_rest_url("http://localhost:8080")
            .with_ws_url("ws://localhost:8081")
            .with_live_channel_capacity(64);

        assert_eq!(config.trades_count_limit, 500);
        assert_eq!(config.rest_url, "http://localhost:8080");
        assert_eq!(config.ws_url, "ws://localhost:8081");
        assert_eq!(config.live_channel_capacity, 64);
    }

    #[test]
    fn test_default_config() {
        let config = FeedConfig::default();
        assert_eq!(config.trades_count_limit, 1000);
        assert_eq!(config.rest_url, "https://api.binance.com");
        assert_eq!(config.ws_url, "wss://stream.binance.com:9443");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_lookup() {
        struct TestCase {
            vars: Vec<(&'static str, &'static str)>,
            expected_limit: usize,
            expected_rest_url: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0: nothing set falls back to defaults
                vars: vec![],
                expected_limit: 1000,
                expected_rest_url: DEFAULT_REST_URL,
            },
            TestCase {
                // TC1: values set are used
                vars: vec![
                    ("TRADES_COUNT_LIMIT", "250"),
                    ("BINANCE_REST_URL", "http://127.0.0.1:9000"),
                ],
                expected_limit: 250,
                expected_rest_url: "http://127.0.0.1:9000",
            },
            TestCase {
                // TC2: unparsable limit falls back to default
                vars: vec![("TRADES_COUNT_LIMIT", "lots")],
                expected_limit: 1000,
                expected_rest_url: DEFAULT_REST_URL,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let vars = test
                .vars
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect::<HashMap<_, _>>();

            let actual = FeedConfig::from_lookup(|key| vars.get(key).cloned());

            assert_eq!(actual.trades_count_limit, test.expected_limit, "TC{} failed", index);
            assert_eq!(actual.rest_url, test.expected_rest_url, "TC{} failed", index);
        }
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let config = FeedConfig::default().with_trades_count_limit(0);
        assert!(matches!(config.validate(), Err(FeedError::Config(_))));
    }
}
