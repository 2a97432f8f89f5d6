use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use crate::analytics::history::{self, DEFAULT_POINTS, FALLBACK_VOLATILITY, GAP_FILL_VOLATILITY};
use crate::analytics::series::{determine_trend, determine_volatility, validate_series};
use crate::data::events::EventFeed;
use crate::data::trends::SearchInterestSource;
use crate::data::types::{MarketEvent, TimeSeries};
use crate::risk::definitions::RiskDefinition;
use crate::risk::matcher::{find_matching_event, MatchMode};
use crate::risk::probability::{apply_inversion, extract_probability};
use crate::risk::types::{normalize_probability, AssemblyMode, DataSource, PredictionData, RiskMetric};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerConfig {
    pub mode: AssemblyMode,
    pub match_mode: MatchMode,
    /// Fixes the synthetic-history random source. `None` draws from entropy.
    pub rng_seed: Option<u64>,
}

impl AssemblerConfig {
    pub fn new(mode: AssemblyMode) -> Self {
        Self {
            mode,
            match_mode: MatchMode::All,
            rng_seed: None,
        }
    }
}

/// Real data gathered for one definition before policy is applied.
#[derive(Debug, Default)]
struct Evidence {
    /// Already sign-corrected.
    market_probability: Option<f64>,
    market_title: Option<String>,
    trends_history: Option<TimeSeries>,
    trends_index: Option<f64>,
}

/// Turns the risk-definition table into one [`PredictionData`] per cycle.
pub struct MetricAssembler {
    definitions: Vec<RiskDefinition>,
    events: EventFeed,
    trends: Arc<dyn SearchInterestSource>,
    config: AssemblerConfig,
    cycles: AtomicU64,
}

impl MetricAssembler {
    pub fn new(
        definitions: Vec<RiskDefinition>,
        events: EventFeed,
        trends: Arc<dyn SearchInterestSource>,
        config: AssemblerConfig,
    ) -> Self {
        Self {
            definitions,
            events,
            trends,
            config,
            cycles: AtomicU64::new(0),
        }
    }

    pub fn mode(&self) -> AssemblyMode {
        self.config.mode
    }

    pub fn definitions(&self) -> &[RiskDefinition] {
        &self.definitions
    }

    /// Run one refresh cycle.
    ///
    /// The event list is loaded once and shared; definitions are then
    /// processed concurrently and independently. Output keeps declaration
    /// order. No failure aborts the cycle: the worst case is an empty list.
    pub async fn fetch_risk_metrics(&self) -> PredictionData {
        info!("🔍 Konzup Radar: Fetching risk metrics ({:?} mode)...", self.config.mode);

        let events = self.events.load().await;
        info!("📊 Processing {} Polymarket events", events.len());

        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed);
        let today = history::today();

        let pending = self
            .definitions
            .iter()
            .enumerate()
            .map(|(index, def)| self.assemble_one(def, &events, self.rng_for(cycle, index), today));

        let metrics: Vec<RiskMetric> = join_all(pending).await.into_iter().flatten().collect();

        let real = metrics.iter().filter(|m| m.has_real_data).count();
        info!(
            "📊 Konzup Radar: {} metrics loaded ({} with real data)",
            metrics.len(),
            real
        );

        PredictionData {
            metrics,
            last_update: Utc::now(),
        }
    }

    fn rng_for(&self, cycle: u64, index: usize) -> StdRng {
        match self.config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(
                seed.wrapping_add(cycle.wrapping_mul(1_000_003))
                    .wrapping_add(index as u64),
            ),
            None => StdRng::from_entropy(),
        }
    }

    async fn assemble_one(
        &self,
        def: &RiskDefinition,
        events: &[MarketEvent],
        mut rng: StdRng,
        today: NaiveDate,
    ) -> Option<RiskMetric> {
        let evidence = self.collect_evidence(def, events).await;
        self.build_metric(def, evidence, &mut rng, today)
    }

    async fn collect_evidence(
        &self,
        def: &RiskDefinition,
        events: &[MarketEvent],
    ) -> Evidence {
        let mut evidence = Evidence::default();

        // 1. Prediction market
        if let Some(event) = find_matching_event(events, &def.keywords, self.config.match_mode) {
            if let Some(raw) = extract_probability(event) {
                let probability = apply_inversion(raw, def.invert_probability);
                info!(
                    "✅ Polymarket [{}]: \"{}\" → {:.1}%",
                    def.id, event.title, probability
                );
                evidence.market_probability = Some(probability);
                evidence.market_title = Some(event.title.clone());
            }
        }

        // 2. Search interest
        let trends = self.trends.interest(&def.search_query).await;
        if trends.is_real && !trends.history.is_empty() {
            if let Err(e) = validate_series(&trends.history) {
                warn!("⚠️ Trends [{}]: discarding malformed series: {}", def.id, e);
                return evidence;
            }
            info!(
                "✅ Trends [{}]: \"{}\" → index {}",
                def.id, def.search_query, trends.current_index
            );
            evidence.trends_index = Some(trends.current_index);
            evidence.trends_history = Some(trends.history);
        }

        evidence
    }

    fn build_metric(
        &self,
        def: &RiskDefinition,
        evidence: Evidence,
        rng: &mut StdRng,
        today: NaiveDate,
    ) -> Option<RiskMetric> {
        let source = DataSource::from_flags(
            evidence.market_probability.is_some(),
            evidence.trends_history.is_some(),
        );

        if !source.is_real() && self.config.mode == AssemblyMode::Strict {
            info!("⚠️ Skipping [{}]: No real data available", def.id);
            return None;
        }

        // Market price wins; the trends index only stands in when it is missing.
        let probability = normalize_probability(
            evidence
                .market_probability
                .or(evidence.trends_index)
                .unwrap_or(def.fallback_probability),
        );

        let history = evidence.trends_history.unwrap_or_else(|| {
            let volatility = if source.is_real() {
                GAP_FILL_VOLATILITY
            } else {
                FALLBACK_VOLATILITY
            };
            history::synthesize_history(rng, probability, volatility, DEFAULT_POINTS, today)
        });

        Some(RiskMetric {
            id: def.id.clone(),
            name: def.name.clone(),
            category: def.category,
            risk_description: def.risk_description.clone(),
            probability,
            trend: determine_trend(&history),
            volatility: determine_volatility(&history),
            history,
            data_source: source,
            has_real_data: source.is_real(),
            polymarket_source: evidence.market_title,
            verdict: None,
            is_loading_verdict: None,
        })
    }
}
