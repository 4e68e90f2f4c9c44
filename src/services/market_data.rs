//! Cached facade over the two public market-data APIs.

use crate::analytics::normalize_table;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::Cache;
use crate::sources::{find_coin, CoinGeckoClient, YahooFinanceClient};
use crate::types::Candle;
use std::time::Duration;
use tracing::warn;

/// Fetches spot prices and daily OHLCV history with TTL memoization.
pub struct MarketDataService {
    coingecko: CoinGeckoClient,
    yahoo: YahooFinanceClient,
    price_cache: Cache<f64>,
    history_cache: Cache<Vec<Candle>>,
}

impl MarketDataService {
    pub fn new(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.http_timeout_secs);
        Self {
            coingecko: CoinGeckoClient::new(config.coingecko_api_key.clone(), timeout),
            yahoo: YahooFinanceClient::new(timeout),
            price_cache: Cache::new(Duration::from_secs(config.price_cache_ttl_secs)),
            history_cache: Cache::new(Duration::from_secs(config.history_cache_ttl_secs)),
        }
    }

    /// Current USD spot price for a symbol. Fetch failures are soft:
    /// they are logged and produce `None`, which the dashboard shows
    /// as a "no data" state.
    pub async fn spot_price(&self, symbol: &str) -> Result<Option<f64>> {
        let coin = find_coin(symbol)
            .ok_or_else(|| AppError::NotFound(format!("unknown symbol '{}'", symbol)))?;

        let key = format!("price:{}", coin.symbol);
        if let Some(price) = self.price_cache.get(&key) {
            return Ok(Some(price));
        }

        match self.coingecko.spot_price(coin.coingecko_id).await {
            Ok(price) => {
                self.price_cache.set(key, price);
                Ok(Some(price))
            }
            Err(e) => {
                warn!("Spot price fetch failed for {}: {}", symbol, e);
                Ok(None)
            }
        }
    }

    /// Daily candles for a symbol over a Yahoo range string. The raw
    /// ticker-suffixed table is normalized to canonical columns before
    /// caching; a table that cannot be normalized is a source-data
    /// error that halts the pipeline.
    pub async fn daily_history(&self, symbol: &str, range: &str) -> Result<Vec<Candle>> {
        let coin = find_coin(symbol)
            .ok_or_else(|| AppError::NotFound(format!("unknown symbol '{}'", symbol)))?;

        let key = format!("history:{}:{}", coin.symbol, range);
        if let Some(candles) = self.history_cache.get(&key) {
            return Ok(candles);
        }

        let raw = self.yahoo.daily_history(coin.yahoo_ticker, range).await?;
        let normalized = normalize_table(&raw)?;
        if normalized.candles.is_empty() {
            return Err(AppError::SourceData(format!(
                "no usable history rows for {}",
                symbol
            )));
        }

        self.history_cache.set(key, normalized.candles.clone());
        Ok(normalized.candles)
    }

    /// Drop expired cache entries; called from the periodic sweeper.
    pub fn sweep_caches(&self) {
        self.price_cache.cleanup();
        self.history_cache.cleanup();
    }
}
