//! Best-effort LLM commentary ("verdicts") on individual risk metrics.

pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::analytics::series::{Trend, Volatility};
use crate::risk::types::RiskMetric;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Pt,
    En,
    Es,
}

const LANGUAGES: [Language; 3] = [Language::Pt, Language::En, Language::Es];

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::En => "en",
            Language::Es => "es",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Pt => "Brazilian Portuguese",
            Language::En => "English",
            Language::Es => "Spanish",
        }
    }

    /// Returned when the commentary service cannot be reached.
    pub fn unavailable_text(&self) -> &'static str {
        match self {
            Language::Pt => "Conexão AI em modo de espera. Monitore indicadores técnicos.",
            Language::En => "AI connection on standby. Monitor technical indicators.",
            Language::Es => "Conexión IA en modo de espera. Monitoree los indicadores técnicos.",
        }
    }

    /// Returned when the service answered without any text.
    pub fn pending_text(&self) -> &'static str {
        match self {
            Language::Pt => "Análise em processamento...",
            Language::En => "Analysis in progress...",
            Language::Es => "Análisis en proceso...",
        }
    }
}

/// Whether `text` is one of the placeholder strings rather than real commentary.
pub fn is_unavailable(text: &str) -> bool {
    let text = text.trim();
    text.is_empty()
        || LANGUAGES
            .iter()
            .any(|lang| text.contains(lang.unavailable_text()) || text.contains(lang.pending_text()))
}

/// The slice of a metric the commentary model gets to see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRequest {
    pub risk_description: String,
    pub probability: f64,
    pub trend: Trend,
    pub volatility: Volatility,
}

impl From<&RiskMetric> for InsightRequest {
    fn from(metric: &RiskMetric) -> Self {
        Self {
            risk_description: metric.risk_description.clone(),
            probability: metric.probability,
            trend: metric.trend,
            volatility: metric.volatility,
        }
    }
}

/// Commentary provider. Never fails: problems come back as the language's
/// sentinel text, which [`is_unavailable`] recognises.
#[async_trait]
pub trait InsightProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    async fn verdict(&self, request: &InsightRequest, language: Language) -> String;
}
