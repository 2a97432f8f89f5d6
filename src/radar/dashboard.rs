use tokio::sync::RwLock;
use tracing::debug;
use crate::ai::is_unavailable;
use crate::risk::types::PredictionData;

/// Latest published cycle. Readers see one whole cycle at a time; only the
/// per-metric verdict fields change after publication.
#[derive(Default)]
pub struct Dashboard {
    inner: RwLock<Snapshot>,
}

#[derive(Default)]
struct Snapshot {
    generation: u64,
    data: Option<PredictionData>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot and return its generation.
    pub async fn publish(&self, mut data: PredictionData, pending_verdicts: bool) -> u64 {
        for metric in &mut data.metrics {
            metric.verdict = None;
            metric.is_loading_verdict = pending_verdicts.then_some(true);
        }

        let mut snapshot = self.inner.write().await;
        snapshot.generation += 1;
        snapshot.data = Some(data);
        snapshot.generation
    }

    /// Resolve one metric's verdict. Returns false when the verdict belongs
    /// to a superseded cycle or an unknown metric.
    pub async fn attach_verdict(&self, generation: u64, metric_id: &str, text: String) -> bool {
        let mut snapshot = self.inner.write().await;
        if snapshot.generation != generation {
            debug!(metric_id, generation, "Discarding verdict from superseded cycle");
            return false;
        }

        let Some(metric) = snapshot
            .data
            .as_mut()
            .and_then(|d| d.metrics.iter_mut().find(|m| m.id == metric_id))
        else {
            return false;
        };

        metric.is_loading_verdict = Some(false);
        metric.verdict = if is_unavailable(&text) { None } else { Some(text) };
        true
    }

    pub async fn current(&self) -> Option<PredictionData> {
        self.inner.read().await.data.clone()
    }

    pub async fn generation(&self) -> u64 {
        self.inner.read().await.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Language;
    use crate::analytics::series::{Trend, Volatility};
    use crate::data::types::HistoryPoint;
    use crate::risk::definitions::RiskCategory;
    use crate::risk::types::{DataSource, RiskMetric};
    use chrono::{NaiveDate, Utc};

    fn metric(id: &str) -> RiskMetric {
        RiskMetric {
            id: id.to_string(),
            name: id.to_string(),
            category: RiskCategory::Climate,
            risk_description: "Extreme weather".to_string(),
            probability: 12.5,
            trend: Trend::Stable,
            volatility: Volatility::Low,
            history: vec![HistoryPoint {
                date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                value: 12.5,
            }],
            data_source: DataSource::Polymarket,
            has_real_data: true,
            polymarket_source: None,
            verdict: None,
            is_loading_verdict: None,
        }
    }

    fn data(ids: &[&str]) -> PredictionData {
        PredictionData {
            metrics: ids.iter().map(|id| metric(id)).collect(),
            last_update: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_marks_pending() {
        let dashboard = Dashboard::new();
        assert!(dashboard.current().await.is_none());

        let generation = dashboard.publish(data(&["a", "b"]), true).await;
        assert_eq!(generation, 1);

        let current = dashboard.current().await.unwrap();
        assert!(current.metrics.iter().all(|m| m.is_loading_verdict == Some(true)));

        dashboard.publish(data(&["a"]), false).await;
        let current = dashboard.current().await.unwrap();
        assert_eq!(current.metrics.len(), 1);
        assert_eq!(current.metrics[0].is_loading_verdict, None);
    }

    #[tokio::test]
    async fn test_attach_verdict_resolves_single_metric() {
        let dashboard = Dashboard::new();
        let generation = dashboard.publish(data(&["a", "b"]), true).await;

        assert!(dashboard.attach_verdict(generation, "b", "Book refundable fares.".to_string()).await);

        let current = dashboard.current().await.unwrap();
        assert_eq!(current.metrics[0].is_loading_verdict, Some(true));
        assert_eq!(current.metrics[1].is_loading_verdict, Some(false));
        assert_eq!(current.metrics[1].verdict.as_deref(), Some("Book refundable fares."));
    }

    #[tokio::test]
    async fn test_sentinel_verdict_resolves_without_text() {
        let dashboard = Dashboard::new();
        let generation = dashboard.publish(data(&["a"]), true).await;

        dashboard
            .attach_verdict(generation, "a", Language::Pt.unavailable_text().to_string())
            .await;

        let current = dashboard.current().await.unwrap();
        assert_eq!(current.metrics[0].is_loading_verdict, Some(false));
        assert!(current.metrics[0].verdict.is_none());
    }

    #[tokio::test]
    async fn test_stale_generation_is_discarded() {
        let dashboard = Dashboard::new();
        let old = dashboard.publish(data(&["a"]), true).await;
        let new = dashboard.publish(data(&["a"]), true).await;

        assert!(!dashboard.attach_verdict(old, "a", "late".to_string()).await);
        assert!(!dashboard.attach_verdict(new, "missing", "x".to_string()).await);

        let current = dashboard.current().await.unwrap();
        assert!(current.metrics[0].verdict.is_none());
        assert_eq!(dashboard.generation().await, new);
    }
}
