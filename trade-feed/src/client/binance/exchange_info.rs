use crate::symbol::SymbolListing;
use serde::{Deserialize, Serialize};

/// Subset of the Binance `exchangeInfo` response needed to resolve currency pairs.
///
/// See docs: <https://developers.binance.com/docs/binance-spot-api-docs/rest-api/general-endpoints#exchange-information>
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct BinanceExchangeInfo {
    pub symbols: Vec<BinanceSymbolInfo>,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct BinanceSymbolInfo {
    pub symbol: String,
    #[serde(rename = "baseAsset")]
    pub base_asset: String,
    #[serde(rename = "quoteAsset")]
    pub quote_asset: String,
}

impl From<BinanceSymbolInfo> for SymbolListing {
    fn from(info: BinanceSymbolInfo) -> Self {
        SymbolListing::new(info.symbol, &info.base_asset, &info.quote_asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binance_exchange_info_into_listings() {
        let input = r#"
            {
                "timezone": "UTC",
                "serverTime": 1565246363776,
                "symbols": [
                    {
                        "symbol": "ETHBTC",
                        "status": "TRADING",
                        "baseAsset": "ETH",
                        "baseAssetPrecision": 8,
                        "quoteAsset": "BTC",
                        "quotePrecision": 8
                    }
                ]
            }
        "#;

        let actual = serde_json::from_str::<BinanceExchangeInfo>(input)
            .unwrap()
            .symbols
            .into_iter()
            .map(SymbolListing::from)
            .collect::<Vec<_>>();

        assert_eq!(actual, vec![SymbolListing::new("ETHBTC", "ETH", "BTC")]);
    }
}
