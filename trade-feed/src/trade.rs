use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Normalised public trade. Created from an exchange record and never mutated.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
pub struct Trade {
    /// True if the taker bought, ie/ the buyer was not the maker.
    pub is_buy: bool,
    pub price: Decimal,
    pub amount: Decimal,
    pub time: DateTime<Utc>,
}

impl Trade {
    pub fn side_str(&self) -> &'static str {
        if self.is_buy { "Buy" } else { "Sell" }
    }
}

/// Pair of currency names, eg/ `BTC` & `USDT`. Ordering is as entered by the user; symbol
/// resolution accepts either ordering.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default, Display, Deserialize, Serialize)]
#[display("{base}/{quote}")]
pub struct CurrencyPair {
    pub base: SmolStr,
    pub quote: SmolStr,
}

impl CurrencyPair {
    pub fn new<S>(base: S, quote: S) -> Self
    where
        S: Into<SmolStr>,
    {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }

    /// Both names present and distinct.
    pub fn is_well_formed(&self) -> bool {
        !self.base.is_empty() && !self.quote.is_empty() && self.base != self.quote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_pair_is_well_formed() {
        struct TestCase {
            input: CurrencyPair,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: distinct non-empty names
                input: CurrencyPair::new("BTC", "USDT"),
                expected: true,
            },
            TestCase {
                // TC1: empty base
                input: CurrencyPair::new("", "USDT"),
                expected: false,
            },
            TestCase {
                // TC2: empty quote
                input: CurrencyPair::new("BTC", ""),
                expected: false,
            },
            TestCase {
                // TC3: identical names
                input: CurrencyPair::new("BTC", "BTC"),
                expected: false,
            },
            TestCase {
                // TC4: default pair
                input: CurrencyPair::default(),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.input.is_well_formed(), test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_currency_pair_reversed_and_display() {
        let pair = CurrencyPair::new("ETH", "BTC");
        assert_eq!(pair.reversed(), CurrencyPair::new("BTC", "ETH"));
        assert_eq!(pair.to_string(), "ETH/BTC");
    }
}
