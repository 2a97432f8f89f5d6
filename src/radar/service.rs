use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};
use crate::ai::{InsightProvider, InsightRequest, Language};
use crate::monitoring::logger::CsvLogger;
use crate::radar::dashboard::Dashboard;
use crate::risk::assembler::MetricAssembler;

/// Refresh-driven front of the engine: runs cycles, publishes them, and
/// enriches the published metrics with verdicts.
pub struct RadarService {
    assembler: MetricAssembler,
    dashboard: Dashboard,
    insight: Option<Arc<dyn InsightProvider>>,
    language: Language,
    csv_logger: Option<CsvLogger>,
}

impl RadarService {
    pub fn new(
        assembler: MetricAssembler,
        insight: Option<Arc<dyn InsightProvider>>,
        language: Language,
        csv_logger: Option<CsvLogger>,
    ) -> Self {
        Self {
            assembler,
            dashboard: Dashboard::new(),
            insight,
            language,
            csv_logger,
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Run one cycle and publish it. Returns the published generation.
    pub async fn refresh(&self) -> u64 {
        let data = self.assembler.fetch_risk_metrics().await;

        if let Some(logger) = &self.csv_logger {
            let logged = logger.log_cycle(&data).and_then(|_| {
                logger.log_event(&format!(
                    "{:?} mode, {} of {} risks emitted",
                    self.assembler.mode(),
                    data.metrics.len(),
                    self.assembler.definitions().len()
                ))
            });
            if let Err(e) = logged {
                warn!("Failed to write CSV log: {:#}", e);
            }
        }

        self.dashboard.publish(data, self.insight.is_some()).await
    }

    /// Request a verdict for every metric of `generation`, attaching each one
    /// as soon as it arrives. Returns how many metrics were resolved.
    pub async fn enrich(&self, generation: u64) -> usize {
        let Some(insight) = &self.insight else {
            return 0;
        };
        let Some(data) = self.dashboard.current().await else {
            return 0;
        };
        if self.dashboard.generation().await != generation {
            return 0;
        }

        info!(
            "Requesting {} verdicts from {} ({})",
            data.metrics.len(),
            insight.name(),
            self.language.code()
        );

        let pending = data.metrics.iter().map(|metric| async move {
            let request = InsightRequest::from(metric);
            let text = insight.verdict(&request, self.language).await;
            self.dashboard.attach_verdict(generation, &metric.id, text).await
        });

        join_all(pending).await.into_iter().filter(|attached| *attached).count()
    }
}
