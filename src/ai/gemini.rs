use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, warn};
use super::{InsightProvider, InsightRequest, Language};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build HTTP client, using defaults");
            Client::new()
        });

        Self {
            client,
            api_key,
            model,
            base_url: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response: GenerateResponse = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to reach Gemini")?
            .error_for_status()
            .context("Gemini returned an error status")?
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        Ok(first_text(response))
    }
}

fn first_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .find_map(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Short advisory for travel-industry readers, in the requested language.
pub fn build_prompt(request: &InsightRequest, language: Language) -> String {
    format!(
        "You are a risk analyst for the travel and tourism industry. \
         Risk: {}. Market-implied probability: {:.1}%. Trend: {}. Volatility: {}. \
         In at most two sentences, give a practical verdict for travel planners. \
         Answer in {} only, as plain text without markdown.",
        request.risk_description,
        request.probability,
        request.trend,
        request.volatility,
        language.display_name()
    )
}

#[async_trait]
impl InsightProvider for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn verdict(&self, request: &InsightRequest, language: Language) -> String {
        match self.generate(build_prompt(request, language)).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => language.pending_text().to_string(),
            Err(e) => {
                error!("Gemini Insight Error: {:#}", e);
                language.unavailable_text().to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::is_unavailable;
    use crate::analytics::series::{Trend, Volatility};

    fn request() -> InsightRequest {
        InsightRequest {
            risk_description: "Jet fuel price spike".to_string(),
            probability: 72.46,
            trend: Trend::Rising,
            volatility: Volatility::High,
        }
    }

    #[test]
    fn test_prompt_carries_metric_and_language() {
        let prompt = build_prompt(&request(), Language::Es);
        assert!(prompt.contains("Jet fuel price spike"));
        assert!(prompt.contains("72.5%"));
        assert!(prompt.contains("Trend: rising"));
        assert!(prompt.contains("Volatility: high"));
        assert!(prompt.contains("Spanish"));
    }

    #[test]
    fn test_first_text_joins_parts() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": " Book flexible "}, {"text": "fares. "}]}}]}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(first_text(response), "Book flexible fares.");

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(first_text(empty), "");
    }

    #[tokio::test]
    async fn test_unreachable_service_returns_sentinel() {
        let client = GeminiClient::new("key".to_string(), "gemini-2.0-flash".to_string(), Duration::from_secs(2))
            .with_base_url("http://127.0.0.1:9");

        let text = client.verdict(&request(), Language::Pt).await;
        assert_eq!(text, Language::Pt.unavailable_text());
        assert!(is_unavailable(&text));
    }
}
