use crate::{error::FeedError, trade::CurrencyPair};
use async_trait::async_trait;
use fnv::FnvHashMap;
use smol_str::SmolStr;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Maps a [`CurrencyPair`] to the tradable symbol of a market.
#[async_trait]
pub trait SymbolResolver: Send + Sync {
    /// Fails with [`FeedError::InvalidPair`] if neither ordering of the pair is listed.
    async fn get_symbol(&self, pair: &CurrencyPair) -> Result<String, FeedError>;
}

/// Source of the markets listed by an exchange.
#[async_trait]
pub trait SymbolSource: Send + Sync {
    async fn fetch_symbol_listings(&self) -> Result<Vec<SymbolListing>, FeedError>;
}

/// One listed market, eg/ `BTCUSDT` trading `BTC` against `USDT`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct SymbolListing {
    pub symbol: String,
    pub base: SmolStr,
    pub quote: SmolStr,
}

impl SymbolListing {
    pub fn new<S>(symbol: S, base: &str, quote: &str) -> Self
    where
        S: Into<String>,
    {
        Self {
            symbol: symbol.into(),
            base: SmolStr::new(base),
            quote: SmolStr::new(quote),
        }
    }
}

/// `(base, quote) -> symbol` lookup table. Currency names are matched case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: FnvHashMap<(SmolStr, SmolStr), String>,
}

impl SymbolTable {
    pub fn insert(&mut self, listing: SymbolListing) {
        self.symbols.insert(
            (normalise(&listing.base), normalise(&listing.quote)),
            listing.symbol,
        );
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Look up `(base, quote)`, then `(quote, base)`.
    pub fn resolve(&self, pair: &CurrencyPair) -> Result<String, FeedError> {
        self.get(pair)
            .or_else(|| self.get(&pair.reversed()))
            .cloned()
            .ok_or_else(|| FeedError::InvalidPair(pair.clone()))
    }

    fn get(&self, pair: &CurrencyPair) -> Option<&String> {
        self.symbols.get(&(normalise(&pair.base), normalise(&pair.quote)))
    }
}

impl FromIterator<SymbolListing> for SymbolTable {
    fn from_iter<Iter>(iter: Iter) -> Self
    where
        Iter: IntoIterator<Item = SymbolListing>,
    {
        let mut table = Self::default();
        for listing in iter {
            table.insert(listing);
        }
        table
    }
}

#[async_trait]
impl SymbolResolver for SymbolTable {
    async fn get_symbol(&self, pair: &CurrencyPair) -> Result<String, FeedError> {
        self.resolve(pair)
    }
}

/// [`SymbolResolver`] that loads the [`SymbolTable`] from a [`SymbolSource`] on first use.
///
/// A failed load is not cached; the next lookup tries again.
#[derive(Debug)]
pub struct LazySymbolResolver<Source> {
    source: Source,
    table: OnceCell<SymbolTable>,
}

impl<Source> LazySymbolResolver<Source> {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            table: OnceCell::new(),
        }
    }
}

#[async_trait]
impl<Source> SymbolResolver for LazySymbolResolver<Source>
where
    Source: SymbolSource,
{
    async fn get_symbol(&self, pair: &CurrencyPair) -> Result<String, FeedError> {
        let table = self
            .table
            .get_or_try_init(|| async {
                let listings = self.source.fetch_symbol_listings().await?;
                let table = listings.into_iter().collect::<SymbolTable>();
                info!(symbols = table.len(), "loaded market symbol listings");
                Ok::<_, FeedError>(table)
            })
            .await?;

        let symbol = table.resolve(pair)?;
        debug!(%pair, %symbol, "resolved currency pair");
        Ok(symbol)
    }
}

fn normalise(name: &str) -> SmolStr {
    SmolStr::new(name.trim().to_ascii_uppercase())
}
