mod ai;
mod analytics;
mod config;
mod data;
mod monitoring;
mod radar;
mod risk;

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use ai::gemini::GeminiClient;
use ai::InsightProvider;
use config::{Config, EnvConfig, TrendsBackend};
use data::events::EventFeed;
use data::gamma_api::GammaApiClient;
use data::trends::{ProxyTrendsClient, ScriptTrendsClient, SearchInterestSource};
use monitoring::logger::CsvLogger;
use radar::service::RadarService;
use risk::assembler::MetricAssembler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("🚀 Konzup Radar starting...");

    // Load configuration
    let env_config = EnvConfig::load()?;
    tracing::info!("Loading configuration from {}", env_config.config_path);
    let mut config = Config::load(&env_config.config_path)?;
    config.apply_env(&env_config);

    tracing::info!("Assembly mode: {:?}", config.system.assembly_mode);
    tracing::info!("Match mode: {:?}", config.system.match_mode);
    tracing::info!("Trends backend: {:?}", config.trends.backend);
    tracing::info!("Risk definitions: {}", config.risks.len());

    let service = build_service(config, &env_config)?;

    refresh_and_print(&service).await?;

    tracing::info!("✅ Radar ready. Press Enter to refresh, Ctrl-C to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(_) => refresh_and_print(&service).await?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("Shutting down...");
    Ok(())
}

fn build_service(config: Config, env_config: &EnvConfig) -> Result<RadarService> {
    let gamma = Arc::new(GammaApiClient::new(
        config.sources.gamma_url.clone(),
        config.sources.timeout(),
    ));
    let events = EventFeed::new(gamma, config.sources.event_filter(), config.sources.cache_ttl());

    let trends: Arc<dyn SearchInterestSource> = match config.trends.backend {
        TrendsBackend::Script => Arc::new(ScriptTrendsClient::new(
            config.trends.program.clone(),
            config.trends.args.clone(),
            config.trends.timeout(),
            config.trends.cache_ttl(),
        )),
        TrendsBackend::Proxy => Arc::new(ProxyTrendsClient::new(
            config.trends.proxy_url.clone(),
            config.trends.timeout(),
        )),
    };

    let insight: Option<Arc<dyn InsightProvider>> = match (&env_config.gemini_api_key, config.ai.enabled) {
        (Some(key), true) => Some(Arc::new(GeminiClient::new(
            key.clone(),
            config.ai.model.clone(),
            std::time::Duration::from_secs(config.ai.timeout_secs),
        ))),
        (None, true) => {
            tracing::warn!("AI verdicts enabled but GEMINI_API_KEY is not set; skipping");
            None
        }
        _ => None,
    };

    let csv_logger = if config.monitoring.csv_logging {
        Some(CsvLogger::new(config.monitoring.csv_log_path.clone())?)
    } else {
        None
    };

    let assembler_config = config.assembler_config();
    let assembler = MetricAssembler::new(config.risks, events, trends, assembler_config);

    Ok(RadarService::new(assembler, insight, config.ai.language, csv_logger))
}

/// One manual refresh: publish, print, then enrich with verdicts and print again.
async fn refresh_and_print(service: &RadarService) -> Result<()> {
    let generation = service.refresh().await;
    print_snapshot(service).await?;

    if service.enrich(generation).await > 0 {
        print_snapshot(service).await?;
    }
    Ok(())
}

async fn print_snapshot(service: &RadarService) -> Result<()> {
    if let Some(data) = service.dashboard().current().await {
        println!("{}", serde_json::to_string_pretty(&data)?);
    }
    Ok(())
}
