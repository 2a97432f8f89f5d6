use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::analytics::series::{Trend, Volatility};
use crate::data::types::TimeSeries;
use crate::risk::definitions::RiskCategory;

/// What to do with a definition for which no source produced real data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyMode {
    /// Drop the definition from the cycle's output.
    Strict,
    /// Emit it anyway with its fallback probability and a synthetic series.
    AlwaysEmit,
}

/// Which upstream sources contributed real data to a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    #[serde(rename = "polymarket")]
    Polymarket,
    #[serde(rename = "trends")]
    Trends,
    #[serde(rename = "polymarket+trends")]
    PolymarketTrends,
    #[serde(rename = "fallback")]
    Fallback,
}

impl DataSource {
    pub fn from_flags(market: bool, trends: bool) -> Self {
        match (market, trends) {
            (true, true) => DataSource::PolymarketTrends,
            (true, false) => DataSource::Polymarket,
            (false, true) => DataSource::Trends,
            (false, false) => DataSource::Fallback,
        }
    }

    pub fn is_real(&self) -> bool {
        !matches!(self, DataSource::Fallback)
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Polymarket => write!(f, "polymarket"),
            DataSource::Trends => write!(f, "trends"),
            DataSource::PolymarketTrends => write!(f, "polymarket+trends"),
            DataSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// One normalized risk record. `probability` is in [0, 100] with one decimal,
/// `history` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetric {
    pub id: String,
    pub name: String,
    pub category: RiskCategory,
    pub risk_description: String,
    pub probability: f64,
    pub trend: Trend,
    pub volatility: Volatility,
    pub history: TimeSeries,
    pub data_source: DataSource,
    pub has_real_data: bool,
    /// Title of the matched market event, when one contributed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polymarket_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_loading_verdict: Option<bool>,
}

/// Output of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionData {
    pub metrics: Vec<RiskMetric>,
    pub last_update: DateTime<Utc>,
}

/// Clamp to [0, 100] and keep one decimal.
pub fn normalize_probability(probability: f64) -> f64 {
    if !probability.is_finite() {
        return 0.0;
    }
    (probability.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_probability() {
        assert_eq!(normalize_probability(18.04), 18.0);
        assert_eq!(normalize_probability(55.56), 55.6);
        assert_eq!(normalize_probability(-3.0), 0.0);
        assert_eq!(normalize_probability(100.4), 100.0);
        assert_eq!(normalize_probability(f64::NAN), 0.0);
    }

    #[test]
    fn test_data_source_flags() {
        assert_eq!(DataSource::from_flags(true, true), DataSource::PolymarketTrends);
        assert_eq!(DataSource::from_flags(false, false), DataSource::Fallback);
        assert!(!DataSource::Fallback.is_real());
        assert_eq!(
            serde_json::to_string(&DataSource::PolymarketTrends).unwrap(),
            "\"polymarket+trends\""
        );
    }

    #[test]
    fn test_mode_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: AssemblyMode,
        }
        let w: Wrapper = toml::from_str("mode = \"always_emit\"").unwrap();
        assert_eq!(w.mode, AssemblyMode::AlwaysEmit);
    }
}
