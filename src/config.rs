use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use crate::ai::Language;
use crate::data::types::EventFilter;
use crate::risk::assembler::AssemblerConfig;
use crate::risk::definitions::{validate_definitions, RiskDefinition};
use crate::risk::matcher::MatchMode;
use crate::risk::types::AssemblyMode;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub trends: TrendsConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    pub risks: Vec<RiskDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    pub assembly_mode: AssemblyMode,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_gamma_url")]
    pub gamma_url: String,
    #[serde(default = "default_market_timeout")]
    pub market_timeout_secs: u64,
    #[serde(default = "default_event_limit")]
    pub event_limit: usize,
    #[serde(default = "default_true")]
    pub active_only: bool,
    #[serde(default)]
    pub include_closed: bool,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendsBackend {
    /// Run a local fetcher program per keyword.
    Script,
    /// Call an HTTP shim exposing `/api/trends/{keyword}`.
    Proxy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendsConfig {
    #[serde(default = "default_trends_backend")]
    pub backend: TrendsBackend,
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_program_args")]
    pub args: Vec<String>,
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,
    /// Defaults to 30s for the script backend, 35s for the proxy.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub csv_logging: bool,
    #[serde(default = "default_csv_path")]
    pub csv_log_path: String,
}

fn default_gamma_url() -> String { "https://gamma-api.polymarket.com".to_string() }
fn default_market_timeout() -> u64 { 20 }
fn default_event_limit() -> usize { 200 }
fn default_true() -> bool { true }
fn default_cache_ttl() -> u64 { 300 }
fn default_trends_backend() -> TrendsBackend { TrendsBackend::Script }
fn default_program() -> String { "python3".to_string() }
fn default_program_args() -> Vec<String> { vec!["scripts/googleTrends.py".to_string()] }
fn default_proxy_url() -> String { "http://localhost:3001".to_string() }
fn default_model() -> String { "gemini-2.0-flash".to_string() }
fn default_ai_timeout() -> u64 { 30 }
fn default_csv_path() -> String { "radar_metrics.csv".to_string() }

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            gamma_url: default_gamma_url(),
            market_timeout_secs: default_market_timeout(),
            event_limit: default_event_limit(),
            active_only: true,
            include_closed: false,
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            backend: default_trends_backend(),
            program: default_program(),
            args: default_program_args(),
            proxy_url: default_proxy_url(),
            timeout_secs: None,
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_model(),
            language: Language::default(),
            timeout_secs: default_ai_timeout(),
        }
    }
}

impl SourcesConfig {
    pub fn event_filter(&self) -> EventFilter {
        EventFilter {
            active: self.active_only,
            closed: self.include_closed,
            limit: self.event_limit,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.market_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl TrendsConfig {
    pub fn timeout(&self) -> Duration {
        let default = match self.backend {
            TrendsBackend::Script => 30,
            TrendsBackend::Proxy => 35,
        };
        Duration::from_secs(self.timeout_secs.unwrap_or(default))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub config_path: String,
    pub gemini_api_key: Option<String>,
    pub polymarket_gamma_url: Option<String>,
    pub trends_proxy_url: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_definitions(&self.risks).context("Invalid risk definition table")?;
        anyhow::ensure!(self.sources.event_limit > 0, "sources.event_limit must be positive");
        anyhow::ensure!(
            self.trends.backend != TrendsBackend::Script || !self.trends.program.trim().is_empty(),
            "trends.program must be set for the script backend"
        );
        Ok(())
    }

    pub fn assembler_config(&self) -> AssemblerConfig {
        AssemblerConfig {
            match_mode: self.system.match_mode,
            rng_seed: self.system.rng_seed,
            ..AssemblerConfig::new(self.system.assembly_mode)
        }
    }

    /// Fold environment overrides into the file configuration.
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(url) = &env.polymarket_gamma_url {
            self.sources.gamma_url = url.clone();
        }
        if let Some(url) = &env.trends_proxy_url {
            self.trends.proxy_url = url.clone();
        }
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            config_path: std::env::var("RADAR_CONFIG").unwrap_or_else(|_| "config.toml".to_string()),
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            polymarket_gamma_url: std::env::var("POLYMARKET_GAMMA_URL").ok(),
            trends_proxy_url: std::env::var("TRENDS_PROXY_URL").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [system]
        assembly_mode = "strict"

        [[risks]]
        id = "us-recession"
        name = "US Recession"
        category = "geopolitics"
        risk_description = "US recession risk"
        keywords = ["negative", "gdp", "growth"]
        search_query = "US recession 2025"
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::parse(MINIMAL).unwrap();

        assert_eq!(config.system.assembly_mode, AssemblyMode::Strict);
        assert_eq!(config.system.match_mode, MatchMode::All);
        assert_eq!(config.sources.gamma_url, "https://gamma-api.polymarket.com");
        assert_eq!(config.sources.event_filter(), EventFilter::default());
        assert_eq!(config.sources.timeout(), Duration::from_secs(20));
        assert_eq!(config.trends.backend, TrendsBackend::Script);
        assert_eq!(config.trends.timeout(), Duration::from_secs(30));
        assert_eq!(config.trends.cache_ttl(), Duration::from_secs(300));
        assert!(!config.ai.enabled);
        assert_eq!(config.ai.language, Language::Pt);
        assert!(!config.monitoring.csv_logging);
        assert_eq!(config.risks.len(), 1);
    }

    #[test]
    fn test_full_config_overrides() {
        let contents = r#"
            [system]
            assembly_mode = "always_emit"
            match_mode = "any"
            rng_seed = 7

            [sources]
            event_limit = 50
            market_timeout_secs = 15

            [trends]
            backend = "proxy"
            proxy_url = "http://trends.internal:3001"

            [ai]
            enabled = true
            language = "en"

            [monitoring]
            csv_logging = true
            csv_log_path = "/tmp/radar.csv"

            [[risks]]
            id = "brazil-inflation"
            name = "Brazil Inflation"
            category = "currency"
            risk_description = "Inflationary pressure in Brazil"
            keywords = ["brazil", "inflation", "below"]
            search_query = "inflacao brasil turismo"
            invert_probability = true
            fallback_probability = 20.0
        "#;

        let config = Config::parse(contents).unwrap();
        let assembler = config.assembler_config();
        assert_eq!(assembler.mode, AssemblyMode::AlwaysEmit);
        assert_eq!(assembler.match_mode, MatchMode::Any);
        assert_eq!(assembler.rng_seed, Some(7));
        assert_eq!(config.sources.event_filter().limit, 50);
        assert_eq!(config.trends.backend, TrendsBackend::Proxy);
        assert_eq!(config.trends.timeout(), Duration::from_secs(35));
        assert_eq!(config.ai.language, Language::En);
        assert!(config.risks[0].invert_probability);
    }

    #[test]
    fn test_invalid_table_is_rejected() {
        let duplicated = format!("{}\n{}", MINIMAL, &MINIMAL[MINIMAL.find("[[risks]]").unwrap()..]);
        let err = Config::parse(&duplicated).unwrap_err();
        assert!(format!("{:#}", err).contains("duplicate risk id"));
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let contents = MINIMAL.replace("\"strict\"", "\"sometimes\"");
        assert!(Config::parse(&contents).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::parse(MINIMAL).unwrap();
        config.apply_env(&EnvConfig {
            config_path: "config.toml".to_string(),
            gemini_api_key: None,
            polymarket_gamma_url: Some("http://localhost:3001/api/polymarket".to_string()),
            trends_proxy_url: None,
        });
        assert_eq!(config.sources.gamma_url, "http://localhost:3001/api/polymarket");
        assert_eq!(config.trends.proxy_url, "http://localhost:3001");
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml")).unwrap();
        assert_eq!(config.risks.len(), 8);
    }
}
