use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A per-day sentiment score in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySentiment {
    pub date: NaiveDate,
    pub score: f64,
}

/// A scored news headline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Headline {
    pub title: String,
    pub link: String,
    /// Publication date, when the feed supplied one.
    pub published: Option<NaiveDate>,
    /// Compound lexicon score in [-1, 1].
    pub sentiment: f64,
}

impl Headline {
    /// Coarse display label for the headline's tone.
    pub fn tone(&self) -> &'static str {
        if self.sentiment > 0.1 {
            "positive"
        } else if self.sentiment < -0.1 {
            "negative"
        } else {
            "neutral"
        }
    }
}
