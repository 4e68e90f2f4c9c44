use std::env;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// CoinGecko API key (optional, for higher rate limits).
    pub coingecko_api_key: Option<String>,
    /// RSS feed URL for news sentiment.
    pub news_feed_url: String,
    /// Directory holding forecasting model checkpoints.
    pub checkpoint_dir: String,
    /// Timeout for outbound market-data and news requests, in seconds.
    pub http_timeout_secs: u64,
    /// TTL for cached spot prices, in seconds.
    pub price_cache_ttl_secs: u64,
    /// TTL for cached OHLCV history and news, in seconds.
    pub history_cache_ttl_secs: u64,
}

impl Config {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            coingecko_api_key: env::var("COINGECKO_API_KEY").ok().filter(|s| !s.is_empty()),
            news_feed_url: env::var("NEWS_FEED_URL")
                .unwrap_or_else(|_| "https://feeds.bbci.co.uk/news/world/rss.xml".to_string()),
            checkpoint_dir: env::var("CHECKPOINT_DIR").unwrap_or_else(|_| "checkpoints".to_string()),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            price_cache_ttl_secs: env::var("PRICE_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            history_cache_ttl_secs: env::var("HISTORY_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
