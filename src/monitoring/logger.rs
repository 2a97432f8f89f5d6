use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use crate::risk::types::PredictionData;

const HEADER: &str = "timestamp,metric_id,category,probability,trend,volatility,data_source,history_points";

/// Append-only CSV audit trail of emitted metrics.
pub struct CsvLogger {
    log_path: String,
}

impl CsvLogger {
    pub fn new(log_path: String) -> Result<Self> {
        // Create CSV file with headers if it doesn't exist
        if !std::path::Path::new(&log_path).exists() {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&log_path)
                .with_context(|| format!("Failed to create CSV log: {}", log_path))?;

            writeln!(file, "{}", HEADER)?;
        }

        Ok(Self { log_path })
    }

    /// One row per metric of a refresh cycle
    pub fn log_cycle(&self, data: &PredictionData) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.log_path)?;
        let timestamp = data.last_update.to_rfc3339();

        for metric in &data.metrics {
            writeln!(
                file,
                "{},{},{},{:.1},{},{},{},{}",
                timestamp,
                metric.id,
                metric.category,
                metric.probability,
                metric.trend,
                metric.volatility,
                metric.data_source,
                metric.history.len()
            )?;
        }

        Ok(())
    }

    /// Log a cycle-level note
    pub fn log_event(&self, event: &str) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.log_path)?;

        writeln!(
            file,
            "{},EVENT,{},,,,,",
            Utc::now().to_rfc3339(),
            event.replace(',', ";")
        )?;

        Ok(())
    }
}
