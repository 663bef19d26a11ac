use analysis_core::Thresholds;
use anyhow::{Context, Result};
use market_data_client::{binance, fred, yahoo};
use std::env;
use std::str::FromStr;

/// Provider endpoints, rate budgets and analysis defaults.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub fred_api_key: Option<String>,
    pub yahoo_base_url: String,
    pub yahoo_chart_url: String,
    pub binance_base_url: String,
    pub fred_base_url: String,

    // Requests per minute
    pub yahoo_rate_limit: usize,
    pub binance_rate_limit: usize,
    pub fred_rate_limit: usize,

    /// Used when the 10-year Treasury yield is unavailable
    pub default_risk_free_rate: f64,
    pub benchmark_symbol: String,
    pub cache_ttl_secs: i64,
    pub thresholds: Thresholds,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            fred_api_key: None,
            yahoo_base_url: yahoo::DEFAULT_SUMMARY_URL.to_string(),
            yahoo_chart_url: yahoo::DEFAULT_CHART_URL.to_string(),
            binance_base_url: binance::DEFAULT_BASE_URL.to_string(),
            fred_base_url: fred::DEFAULT_BASE_URL.to_string(),
            yahoo_rate_limit: 60,
            binance_rate_limit: 1200,
            fred_rate_limit: 120,
            default_risk_free_rate: 0.045,
            benchmark_symbol: "SPY".to_string(),
            cache_ttl_secs: 300,
            thresholds: Thresholds::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let thresholds = match env::var("THRESHOLDS_PATH") {
            Ok(path) if !path.is_empty() => Thresholds::from_json_file(&path)
                .with_context(|| format!("failed to load thresholds from {}", path))?,
            _ => defaults.thresholds,
        };

        let config = Self {
            fred_api_key: env::var("FRED_API_KEY").ok().filter(|k| !k.is_empty()),
            yahoo_base_url: env::var("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
            yahoo_chart_url: env::var("YAHOO_CHART_URL").unwrap_or(defaults.yahoo_chart_url),
            binance_base_url: env::var("BINANCE_BASE_URL").unwrap_or(defaults.binance_base_url),
            fred_base_url: env::var("FRED_BASE_URL").unwrap_or(defaults.fred_base_url),

            yahoo_rate_limit: parse_var("YAHOO_RATE_LIMIT", defaults.yahoo_rate_limit)?,
            binance_rate_limit: parse_var("BINANCE_RATE_LIMIT", defaults.binance_rate_limit)?,
            fred_rate_limit: parse_var("FRED_RATE_LIMIT", defaults.fred_rate_limit)?,

            default_risk_free_rate: parse_var("DEFAULT_RISK_FREE_RATE", defaults.default_risk_free_rate)?,
            benchmark_symbol: env::var("BENCHMARK_SYMBOL").unwrap_or(defaults.benchmark_symbol),
            cache_ttl_secs: parse_var("CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            thresholds,
        };

        Ok(config)
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
