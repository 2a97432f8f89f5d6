use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use crate::data::types::{EventFilter, MarketEvent};

const USER_AGENT: &str = "KonzupRadar/1.0";

/// Bulk source of prediction-market events.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self, filter: &EventFilter) -> Result<Vec<MarketEvent>>;
}

pub struct GammaApiClient {
    client: Client,
    base_url: String,
}

impl GammaApiClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client, using defaults");
                Client::new()
            });

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.base_url)
    }
}

#[async_trait]
impl EventSource for GammaApiClient {
    /// Fetch active events from the Polymarket Gamma API
    async fn fetch_events(&self, filter: &EventFilter) -> Result<Vec<MarketEvent>> {
        let url = self.events_url();
        let limit = filter.limit.to_string();

        let response: Value = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(&[
                ("active", if filter.active { "true" } else { "false" }),
                ("closed", if filter.closed { "true" } else { "false" }),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .context("Failed to fetch events")?
            .error_for_status()
            .context("Gamma API returned an error status")?
            .json()
            .await
            .context("Failed to parse events response")?;

        let events = parse_events(response)?;
        info!("📊 Polymarket: Loaded {} events", events.len());
        Ok(events)
    }
}

/// Convert a raw `/events` payload, dropping entries that do not look like
/// events instead of failing the whole batch.
pub fn parse_events(payload: Value) -> Result<Vec<MarketEvent>> {
    let items = match payload {
        Value::Array(items) => items,
        // Some deployments wrap the list in `{ "data": [...] }`
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => anyhow::bail!("Events response is an object without a data array"),
        },
        other => anyhow::bail!("Unexpected events response: {}", type_name(&other)),
    };

    let total = items.len();
    let events: Vec<MarketEvent> = items
        .into_iter()
        .filter_map(|item| {
            serde_json::from_value::<MarketEvent>(item)
                .map_err(|e| debug!(error = %e, "Skipping malformed event"))
                .ok()
        })
        .collect();

    if events.len() < total {
        warn!("Dropped {} malformed events out of {}", total - events.len(), total);
    }

    Ok(events)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
