use serde::{Deserialize, Serialize};

/// Classification of a single indicator's latest value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorSignal {
    Buy,
    Sell,
    Neutral,
}

impl IndicatorSignal {
    /// Get display label for this signal.
    pub fn label(&self) -> &'static str {
        match self {
            IndicatorSignal::Buy => "Buy",
            IndicatorSignal::Sell => "Sell",
            IndicatorSignal::Neutral => "Neutral",
        }
    }
}

/// Composite signal from the majority vote across indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeSignal {
    StrongBuy,
    StrongSell,
    Neutral,
}

impl CompositeSignal {
    /// Get display label for this signal.
    pub fn label(&self) -> &'static str {
        match self {
            CompositeSignal::StrongBuy => "Strong Buy",
            CompositeSignal::StrongSell => "Strong Sell",
            CompositeSignal::Neutral => "Neutral / Watch",
        }
    }
}

/// SMA trend state derived from the last two defined rows.
///
/// This is a textual summary for display; it does not participate in
/// the composite vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendNarrative {
    /// Short SMA crossed above the long SMA on the latest row.
    GoldenCross,
    /// Short SMA crossed below the long SMA on the latest row.
    DeadCross,
    /// Short SMA has been above the long SMA without a fresh cross.
    Uptrend,
    /// Short SMA has been below the long SMA without a fresh cross.
    Downtrend,
}

impl TrendNarrative {
    /// Human-readable trend message.
    pub fn message(&self) -> &'static str {
        match self {
            TrendNarrative::GoldenCross => {
                "Golden cross: the short moving average crossed above the long one, a possible shift to an uptrend"
            }
            TrendNarrative::DeadCross => {
                "Dead cross: the short moving average crossed below the long one, a possible shift to a downtrend"
            }
            TrendNarrative::Uptrend => {
                "The short moving average is holding above the long one; the uptrend is intact"
            }
            TrendNarrative::Downtrend => {
                "The short moving average is holding below the long one; the downtrend is intact"
            }
        }
    }
}

/// Per-indicator classifications of the most recent fully-defined row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalMap {
    pub sma: IndicatorSignal,
    pub rsi: IndicatorSignal,
    pub macd: IndicatorSignal,
    pub stoch: IndicatorSignal,
    pub cci: IndicatorSignal,
}

impl SignalMap {
    /// Count of buy votes.
    pub fn buy_count(&self) -> usize {
        self.votes()
            .iter()
            .filter(|s| **s == IndicatorSignal::Buy)
            .count()
    }

    /// Count of sell votes.
    pub fn sell_count(&self) -> usize {
        self.votes()
            .iter()
            .filter(|s| **s == IndicatorSignal::Sell)
            .count()
    }

    fn votes(&self) -> [IndicatorSignal; 5] {
        [self.sma, self.rsi, self.macd, self.stoch, self.cci]
    }
}

/// Aggregated signal output for a symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalSummary {
    /// Individual indicator classifications.
    pub signals: SignalMap,
    /// Majority-vote composite.
    pub composite: CompositeSignal,
    /// Composite display label.
    pub composite_label: String,
    /// SMA trend narrative, when at least two defined SMA rows exist.
    pub trend: Option<TrendNarrative>,
    /// Trend display message.
    pub trend_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_labels() {
        assert_eq!(IndicatorSignal::Buy.label(), "Buy");
        assert_eq!(CompositeSignal::StrongSell.label(), "Strong Sell");
        assert_eq!(CompositeSignal::Neutral.label(), "Neutral / Watch");
    }

    #[test]
    fn test_signal_map_counts() {
        let map = SignalMap {
            sma: IndicatorSignal::Buy,
            rsi: IndicatorSignal::Sell,
            macd: IndicatorSignal::Buy,
            stoch: IndicatorSignal::Neutral,
            cci: IndicatorSignal::Sell,
        };
        assert_eq!(map.buy_count(), 2);
        assert_eq!(map.sell_count(), 2);
    }

    #[test]
    fn test_trend_messages_are_distinct() {
        let trends = [
            TrendNarrative::GoldenCross,
            TrendNarrative::DeadCross,
            TrendNarrative::Uptrend,
            TrendNarrative::Downtrend,
        ];
        for (i, a) in trends.iter().enumerate() {
            for b in trends.iter().skip(i + 1) {
                assert_ne!(a.message(), b.message());
            }
        }
    }
}
