//! News headline retrieval and lexicon sentiment scoring.
//!
//! Headlines come from a configurable RSS feed. Each title is scored
//! with a small financial lexicon to a compound value in [-1, 1], and
//! per-day mean scores feed the sentiment merger. Feed failures are
//! soft: the dashboard shows an empty news list.

use crate::services::Cache;
use crate::types::{DailySentiment, Headline};
use chrono::DateTime;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Headlines taken from the top of the feed.
const MAX_HEADLINES: usize = 10;

/// How strongly a single lexicon hit moves a short headline.
const LEXICON_GAIN: f64 = 4.0;

const POSITIVE_WORDS: &[&str] = &[
    "surge", "surges", "rally", "rallies", "gain", "gains", "rise", "rises", "soar", "soars",
    "record", "growth", "boom", "bullish", "recovery", "rebound", "jump", "jumps", "up",
    "strong", "optimism", "breakthrough", "win", "wins", "approval", "adopt", "adoption",
];

const NEGATIVE_WORDS: &[&str] = &[
    "crash", "crashes", "plunge", "plunges", "fall", "falls", "drop", "drops", "slump",
    "slumps", "loss", "losses", "fear", "fears", "bearish", "fraud", "hack", "hacked", "ban",
    "bans", "crisis", "collapse", "down", "weak", "warning", "lawsuit", "selloff", "decline",
];

/// Fetches and scores news headlines.
pub struct NewsService {
    client: Client,
    feed_url: String,
    cache: Cache<Vec<Headline>>,
}

impl NewsService {
    pub fn new(feed_url: String, timeout: Duration, cache_ttl: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("coinlens/0.1 (cryptocurrency analytics dashboard)")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            feed_url,
            cache: Cache::new(cache_ttl),
        }
    }

    /// Latest scored headlines. Any fetch or parse failure yields an
    /// empty list rather than an error.
    pub async fn headlines(&self) -> Vec<Headline> {
        if let Some(cached) = self.cache.get("headlines") {
            return cached;
        }

        let headlines = match self.fetch_feed().await {
            Ok(items) => items,
            Err(e) => {
                warn!("News feed fetch failed: {}", e);
                Vec::new()
            }
        };

        if !headlines.is_empty() {
            self.cache.set("headlines".to_string(), headlines.clone());
        }
        headlines
    }

    /// Per-day mean sentiment across the current headlines, for the
    /// sentiment merger. Headlines without a parseable date are
    /// excluded.
    pub async fn daily_sentiment(&self) -> Vec<DailySentiment> {
        let headlines = self.headlines().await;

        let mut by_date: BTreeMap<chrono::NaiveDate, (f64, usize)> = BTreeMap::new();
        for headline in &headlines {
            if let Some(date) = headline.published {
                let entry = by_date.entry(date).or_insert((0.0, 0));
                entry.0 += headline.sentiment;
                entry.1 += 1;
            }
        }

        by_date
            .into_iter()
            .map(|(date, (sum, count))| DailySentiment {
                date,
                score: sum / count as f64,
            })
            .collect()
    }

    /// Drop expired cache entries; called from the periodic sweeper.
    pub fn sweep_cache(&self) {
        self.cache.cleanup();
    }

    async fn fetch_feed(&self) -> anyhow::Result<Vec<Headline>> {
        debug!("Fetching news feed {}", self.feed_url);
        let body = self
            .client
            .get(&self.feed_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_feed(&body))
    }
}

/// Extract and score the leading items of an RSS feed. The feed shape
/// is fixed (`<item>` blocks with title/link/pubDate), so a small
/// string scanner is enough.
fn parse_feed(xml: &str) -> Vec<Headline> {
    rss_items(xml)
        .into_iter()
        .take(MAX_HEADLINES)
        .map(|item| {
            let title = tag_text(item, "title").unwrap_or_default();
            let link = tag_text(item, "link").unwrap_or_default();
            let published = tag_text(item, "pubDate")
                .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())
                .map(|dt| dt.date_naive());
            let sentiment = score_text(&title);
            Headline {
                title,
                link,
                published,
                sentiment,
            }
        })
        .filter(|h| !h.title.is_empty())
        .collect()
}

/// Slice out each `<item>...</item>` block.
fn rss_items(xml: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<item>") {
        let after = &rest[start + "<item>".len()..];
        let Some(end) = after.find("</item>") else {
            break;
        };
        items.push(&after[..end]);
        rest = &after[end + "</item>".len()..];
    }
    items
}

/// Inner text of the first occurrence of a tag, CDATA unwrapped.
fn tag_text<'a>(block: &'a str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = block.find(&open)? + open.len();
    let end = block[start..].find(&close)? + start;
    let inner = block[start..end].trim();

    let inner = inner
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(inner);
    Some(inner.trim().to_string())
}

/// Compound lexicon score for a piece of text, in [-1, 1].
pub fn score_text(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return 0.0;
    }

    let positive = words.iter().filter(|w| POSITIVE_WORDS.contains(w)).count();
    let negative = words.iter().filter(|w| NEGATIVE_WORDS.contains(w)).count();

    let net = (positive as f64 - negative as f64) / words.len() as f64;
    (net * LEXICON_GAIN).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>World News</title>
    <item>
      <title>Bitcoin surges to record high on strong adoption</title>
      <link>https://example.com/a</link>
      <pubDate>Mon, 05 Aug 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title><![CDATA[Markets crash as fraud fears spread]]></title>
      <link>https://example.com/b</link>
      <pubDate>Tue, 06 Aug 2024 09:30:00 GMT</pubDate>
    </item>
    <item>
      <title>Central bank holds rates steady</title>
      <link>https://example.com/c</link>
      <pubDate>Tue, 06 Aug 2024 11:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_extracts_items() {
        let headlines = parse_feed(SAMPLE_FEED);
        assert_eq!(headlines.len(), 3);
        assert_eq!(
            headlines[0].title,
            "Bitcoin surges to record high on strong adoption"
        );
        assert_eq!(headlines[0].link, "https://example.com/a");
        assert_eq!(
            headlines[0].published,
            Some(chrono::NaiveDate::from_ymd_opt(2024, 8, 5).unwrap())
        );
    }

    #[test]
    fn test_cdata_titles_are_unwrapped() {
        let headlines = parse_feed(SAMPLE_FEED);
        assert_eq!(headlines[1].title, "Markets crash as fraud fears spread");
    }

    #[test]
    fn test_scores_follow_lexicon() {
        let headlines = parse_feed(SAMPLE_FEED);
        assert!(headlines[0].sentiment > 0.0);
        assert!(headlines[1].sentiment < 0.0);
        assert_eq!(headlines[2].sentiment, 0.0);
    }

    #[test]
    fn test_score_bounds() {
        assert_eq!(score_text(""), 0.0);
        let euphoric = "surge rally gain soar boom";
        assert_eq!(score_text(euphoric), 1.0);
        let grim = "crash plunge slump collapse crisis";
        assert_eq!(score_text(grim), -1.0);
    }

    #[test]
    fn test_malformed_feed_yields_nothing() {
        assert!(parse_feed("<rss><channel><item><title>half open").is_empty());
        assert!(parse_feed("not xml at all").is_empty());
    }

    #[test]
    fn test_daily_sentiment_groups_by_date() {
        // score the sample synchronously through the parser
        let headlines = parse_feed(SAMPLE_FEED);
        let mut by_date: BTreeMap<chrono::NaiveDate, (f64, usize)> = BTreeMap::new();
        for h in &headlines {
            let entry = by_date.entry(h.published.unwrap()).or_insert((0.0, 0));
            entry.0 += h.sentiment;
            entry.1 += 1;
        }
        assert_eq!(by_date.len(), 2);
        let aug6 = by_date
            .get(&chrono::NaiveDate::from_ymd_opt(2024, 8, 6).unwrap())
            .unwrap();
        assert_eq!(aug6.1, 2);
    }
}
