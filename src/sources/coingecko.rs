//! CoinGecko REST client for spot prices.

use crate::error::{AppError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Deserialize)]
struct CoinGeckoPrice {
    usd: Option<f64>,
}

/// CoinGecko REST client.
#[derive(Clone)]
pub struct CoinGeckoClient {
    client: Client,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    /// Create a new client with the given request timeout.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("coinlens/0.1 (cryptocurrency analytics dashboard)")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// Fetch the current USD price for a CoinGecko coin id.
    pub async fn spot_price(&self, coin_id: &str) -> Result<f64> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            COINGECKO_API_URL, coin_id
        );

        debug!("Fetching CoinGecko spot price for {}", coin_id);

        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(ref key) = self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("CoinGecko request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "CoinGecko API error: {}",
                response.status()
            )));
        }

        let prices: HashMap<String, CoinGeckoPrice> = response
            .json()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Failed to parse CoinGecko response: {}", e)))?;

        prices
            .get(coin_id)
            .and_then(|p| p.usd)
            .ok_or_else(|| AppError::ExternalApi(format!("No USD price for {}", coin_id)))
    }
}
