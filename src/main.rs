use coinlens::config::Config;
use coinlens::forecast::{CheckpointStore, ForecastConfig, ForecastEngine};
use coinlens::services::{MarketDataService, NewsService};
use coinlens::{api, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coinlens=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env());
    info!("Starting coinlens server on {}:{}", config.host, config.port);

    let market = Arc::new(MarketDataService::new(&config));
    let news = Arc::new(NewsService::new(
        config.news_feed_url.clone(),
        Duration::from_secs(config.http_timeout_secs),
        Duration::from_secs(config.history_cache_ttl_secs),
    ));
    let forecaster = Arc::new(ForecastEngine::new(
        ForecastConfig::default(),
        CheckpointStore::new(&config.checkpoint_dir),
    ));

    let state = AppState {
        config: config.clone(),
        market: market.clone(),
        news: news.clone(),
        forecaster,
    };

    // Periodic sweep of expired cache entries
    {
        let market = market.clone();
        let news = news.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(120)).await;
                market.sweep_caches();
                news.sweep_cache();
            }
        });
    }

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = api::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("coinlens server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
