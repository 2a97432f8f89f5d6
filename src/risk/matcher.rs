use serde::Deserialize;
use crate::data::types::MarketEvent;

/// How keyword sets are matched against event text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Every keyword must appear. Avoids false positives on generic terms.
    #[default]
    All,
    /// Any single keyword is enough. Strictly looser.
    Any,
}

/// Return the first event whose lowercased title + description contains the
/// keywords. No match is an ordinary outcome.
pub fn find_matching_event<'a>(
    events: &'a [MarketEvent],
    keywords: &[String],
    mode: MatchMode,
) -> Option<&'a MarketEvent> {
    if keywords.is_empty() {
        return None;
    }

    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    events.iter().find(|event| {
        let search_text = format!(
            "{} {}",
            event.title.to_lowercase(),
            event.description.as_deref().unwrap_or_default().to_lowercase()
        );

        match mode {
            MatchMode::All => keywords.iter().all(|kw| search_text.contains(kw.as_str())),
            MatchMode::Any => keywords.iter().any(|kw| search_text.contains(kw.as_str())),
        }
    })
}

#[cfg(test)]
pub(crate) fn event(id: &str, title: &str, description: Option<&str>) -> MarketEvent {
    MarketEvent {
        id: id.to_string(),
        title: title.to_string(),
        description: description.map(str::to_string),
        outcome_prices: None,
        markets: Vec::new(),
    }
}
