use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskCategory {
    AirCost,
    Geopolitics,
    GlobalHealth,
    Currency,
    Climate,
    Infrastructure,
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RiskCategory::AirCost => "air-cost",
            RiskCategory::Geopolitics => "geopolitics",
            RiskCategory::GlobalHealth => "global-health",
            RiskCategory::Currency => "currency",
            RiskCategory::Climate => "climate",
            RiskCategory::Infrastructure => "infrastructure",
        };
        write!(f, "{}", name)
    }
}

/// One monitored risk topic and where to find its data.
///
/// Loaded from the `[[risks]]` table at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RiskDefinition {
    pub id: String,
    pub name: String,
    pub category: RiskCategory,
    pub risk_description: String,
    /// Terms that must all appear in a market event's title or description.
    pub keywords: Vec<String>,
    /// Query sent to the search-interest backend.
    pub search_query: String,
    /// Set when the market's "yes" outcome is the benign one
    /// (e.g. "inflation stays below 5.5%"), so risk = 100 - yes.
    #[serde(default)]
    pub invert_probability: bool,
    /// Probability emitted in always-emit mode when no source has data.
    #[serde(default = "default_fallback_probability")]
    pub fallback_probability: f64,
}

fn default_fallback_probability() -> f64 {
    50.0
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DefinitionError {
    #[error("risk definition table is empty")]
    Empty,

    #[error("duplicate risk id: {0}")]
    DuplicateId(String),

    #[error("risk {0} has an empty id or name")]
    MissingIdentity(String),

    #[error("risk {0} has no keywords")]
    NoKeywords(String),

    #[error("risk {0} has a blank keyword")]
    BlankKeyword(String),

    #[error("risk {0} has a blank search query")]
    BlankSearchQuery(String),

    #[error("risk {id} fallback probability {value} outside [0, 100]")]
    FallbackOutOfRange { id: String, value: f64 },
}

/// Check the whole table once at load time.
pub fn validate_definitions(definitions: &[RiskDefinition]) -> Result<(), DefinitionError> {
    if definitions.is_empty() {
        return Err(DefinitionError::Empty);
    }

    let mut seen = HashSet::new();
    for def in definitions {
        if def.id.trim().is_empty() || def.name.trim().is_empty() {
            return Err(DefinitionError::MissingIdentity(def.id.clone()));
        }
        if !seen.insert(def.id.as_str()) {
            return Err(DefinitionError::DuplicateId(def.id.clone()));
        }
        if def.keywords.is_empty() {
            return Err(DefinitionError::NoKeywords(def.id.clone()));
        }
        if def.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(DefinitionError::BlankKeyword(def.id.clone()));
        }
        if def.search_query.trim().is_empty() {
            return Err(DefinitionError::BlankSearchQuery(def.id.clone()));
        }
        if !def.fallback_probability.is_finite()
            || !(0.0..=100.0).contains(&def.fallback_probability)
        {
            return Err(DefinitionError::FallbackOutOfRange {
                id: def.id.clone(),
                value: def.fallback_probability,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn sample_definition(id: &str, keywords: &[&str]) -> RiskDefinition {
    RiskDefinition {
        id: id.to_string(),
        name: format!("{} name", id),
        category: RiskCategory::Geopolitics,
        risk_description: format!("{} description", id),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        search_query: format!("{} query", id),
        invert_probability: false,
        fallback_probability: 50.0,
    }
}
