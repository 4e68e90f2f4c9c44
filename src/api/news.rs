use crate::types::Headline;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewsResponse {
    headlines: Vec<ScoredHeadline>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoredHeadline {
    #[serde(flatten)]
    headline: Headline,
    tone: &'static str,
}

async fn news(State(state): State<AppState>) -> Json<NewsResponse> {
    let headlines = state
        .news
        .headlines()
        .await
        .into_iter()
        .map(|headline| ScoredHeadline {
            tone: headline.tone(),
            headline,
        })
        .collect();
    Json(NewsResponse { headlines })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(news))
}
