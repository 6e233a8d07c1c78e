use crate::trade::CurrencyPair;
use thiserror::Error;
use trade_feed_buffer::BufferError;

/// All errors generated in `trade-feed`.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FeedError {
    #[error("invalid currency pair: {0}")]
    InvalidPair(CurrencyPair),

    #[error("API call failed: {0}")]
    ApiCall(String),

    #[error("trade buffer: {0}")]
    Buffer(#[from] BufferError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl FeedError {
    /// Determine if an error was caused by cooperative cancellation rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FeedError::Cancelled)
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(value: reqwest::Error) -> Self {
        Self::ApiCall(value.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::ApiCall(format!("WebSocket error: {value}"))
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(value: serde_json::Error) -> Self {
        Self::ApiCall(format!("failed to deserialise response: {value}"))
    }
}

impl From<url::ParseError> for FeedError {
    fn from(value: url::ParseError) -> Self {
        Self::Config(format!("invalid url: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_error_is_cancellation() {
        struct TestCase {
            input: FeedError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: is cancellation w/ FeedError::Cancelled
                input: FeedError::Cancelled,
                expected: true,
            },
            TestCase {
                // TC1: is not cancellation w/ FeedError::ApiCall
                input: FeedError::ApiCall("-1121: Invalid symbol.".to_string()),
                expected: false,
            },
            TestCase {
                // TC2: is not cancellation w/ FeedError::InvalidPair
                input: FeedError::InvalidPair(CurrencyPair::new("btc", "btc")),
                expected: false,
            },
            TestCase {
                // TC3: is not cancellation w/ FeedError::Buffer
                input: FeedError::from(BufferError::Empty),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_cancellation();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_feed_error_display() {
        assert_eq!(
            FeedError::InvalidPair(CurrencyPair::new("FOO", "BAR")).to_string(),
            "invalid currency pair: FOO/BAR"
        );
        assert_eq!(
            FeedError::from(BufferError::Empty).to_string(),
            "trade buffer: buffer is empty"
        );
    }
}
