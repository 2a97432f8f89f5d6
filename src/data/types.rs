use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One day of a risk series. `value` lives in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Chronological series of daily points, oldest first.
pub type TimeSeries = Vec<HistoryPoint>;

/// Prediction-market event as returned by the Gamma `/events` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketEvent {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Either a JSON array or a string holding a JSON array.
    #[serde(default)]
    pub outcome_prices: Option<Value>,
    #[serde(default)]
    pub markets: Vec<SubMarket>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubMarket {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub outcome_prices: Option<Value>,
}

/// Query parameters for the bulk event fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    pub active: bool,
    pub closed: bool,
    pub limit: usize,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            active: true,
            closed: false,
            limit: 200,
        }
    }
}

impl EventFilter {
    /// Stable cache key for this filter.
    pub fn cache_key(&self) -> String {
        format!(
            "events:active={}:closed={}:limit={}",
            self.active, self.closed, self.limit
        )
    }
}

/// Search-interest payload for one keyword.
///
/// When `is_real` is false, `history` is a synthesized placeholder and is
/// still guaranteed to be non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsResponse {
    pub keyword: String,
    #[serde(default = "default_current_index")]
    pub current_index: f64,
    #[serde(default)]
    pub history: TimeSeries,
    #[serde(default)]
    pub is_real: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub from_cache: bool,
}

fn default_current_index() -> f64 {
    50.0
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
