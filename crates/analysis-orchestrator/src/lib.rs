use analysis_core::{
    AnalysisError, AnalysisSection, AssetClass, Candle, CompleteAnalysis, Fundamentals, Interval,
    YieldCurve,
};
use chrono::{DateTime, Utc};
use std::borrow::Borrow;
use std::hash::Hash;
use dashmap::DashMap;
use fundamental_analysis::FundamentalAnalysisEngine;
use market_data_client::{BinanceClient, FredClient, YahooClient};
use risk_analysis::RiskAnalysisEngine;
use sentiment_analysis::SentimentAnalysisEngine;
use technical_analysis::TechnicalAnalysisEngine;

pub mod compose;
pub mod config;
pub mod report;
pub mod watchlist;

pub use compose::{compose, section_weight, ReportInputs};
pub use config::DashboardConfig;
pub use report::render_text;
pub use watchlist::{Watchlist, WatchlistEntry, WatchlistFailure, WatchlistResult};

const CURVE_CACHE_KEY: &str = "treasury";

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

pub struct AnalysisOrchestrator {
    yahoo: YahooClient,
    binance: BinanceClient,
    fred: FredClient,
    technical_analyzer: TechnicalAnalysisEngine,
    fundamental_analyzer: FundamentalAnalysisEngine,
    risk_analyzer: RiskAnalysisEngine,
    sentiment_analyzer: SentimentAnalysisEngine,
    config: DashboardConfig,
    /// Candles per (provider, symbol, interval, span)
    candles_cache: DashMap<String, CacheEntry<Vec<Candle>>>,
    fundamentals_cache: DashMap<String, CacheEntry<Fundamentals>>,
    curve_cache: DashMap<&'static str, CacheEntry<YieldCurve>>,
}

impl AnalysisOrchestrator {
    pub fn new(config: DashboardConfig) -> Self {
        let thresholds = config.thresholds.clone();

        Self {
            yahoo: YahooClient::new(&config.yahoo_base_url, &config.yahoo_chart_url, config.yahoo_rate_limit),
            binance: BinanceClient::new(&config.binance_base_url, config.binance_rate_limit),
            fred: FredClient::new(&config.fred_base_url, config.fred_api_key.clone(), config.fred_rate_limit),
            technical_analyzer: TechnicalAnalysisEngine::new(thresholds.technical.clone()),
            fundamental_analyzer: FundamentalAnalysisEngine::new(thresholds.clone()),
            risk_analyzer: RiskAnalysisEngine::new(thresholds.risk.clone()),
            sentiment_analyzer: SentimentAnalysisEngine::new(thresholds.sentiment),
            config,
            candles_cache: DashMap::new(),
            fundamentals_cache: DashMap::new(),
            curve_cache: DashMap::new(),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    fn is_fresh(&self, cached_at: DateTime<Utc>) -> bool {
        (Utc::now() - cached_at).num_seconds() < self.config.cache_ttl_secs
    }

    /// Fresh cached value, evicting the entry once it has expired.
    fn cached<K, Q, T>(&self, cache: &DashMap<K, CacheEntry<T>>, key: &Q) -> Option<T>
    where
        K: Eq + Hash + Borrow<Q>,
        Q: Eq + Hash + ?Sized,
        T: Clone,
    {
        let hit = cache
            .get(key)
            .and_then(|entry| self.is_fresh(entry.cached_at).then(|| entry.data.clone()));
        if hit.is_none() {
            cache.remove_if(key, |_, entry| !self.is_fresh(entry.cached_at));
        }
        hit
    }

    fn store_candles(&self, key: String, candles: &[Candle]) {
        self.candles_cache.insert(
            key,
            CacheEntry {
                data: candles.to_vec(),
                cached_at: Utc::now(),
            },
        );
    }

    /// Equity candles from the quote provider, cached per symbol, interval and range.
    pub async fn get_candles(&self, symbol: &str, interval: Interval, range: &str) -> Result<Vec<Candle>, AnalysisError> {
        let key = format!("yahoo:{}:{:?}:{}", symbol, interval, range);
        if let Some(candles) = self.cached(&self.candles_cache, key.as_str()) {
            return Ok(candles);
        }
        let candles = self.yahoo.get_candles(symbol, interval, range).await?;
        self.store_candles(key, &candles);
        Ok(candles)
    }

    pub async fn get_crypto_candles(&self, pair: &str, interval: Interval, limit: u32) -> Result<Vec<Candle>, AnalysisError> {
        let key = format!("binance:{}:{:?}:{}", pair, interval, limit);
        if let Some(candles) = self.cached(&self.candles_cache, key.as_str()) {
            return Ok(candles);
        }
        let candles = self.binance.get_candles(pair, interval, limit).await?;
        self.store_candles(key, &candles);
        Ok(candles)
    }

    pub async fn get_fundamentals(&self, symbol: &str) -> Result<Fundamentals, AnalysisError> {
        if let Some(data) = self.cached(&self.fundamentals_cache, symbol) {
            return Ok(data);
        }
        let fundamentals = self.yahoo.get_fundamentals(symbol).await?;
        self.fundamentals_cache.insert(
            symbol.to_string(),
            CacheEntry {
                data: fundamentals.clone(),
                cached_at: Utc::now(),
            },
        );
        Ok(fundamentals)
    }

    pub async fn get_yield_curve(&self) -> Result<YieldCurve, AnalysisError> {
        if let Some(data) = self.cached(&self.curve_cache, CURVE_CACHE_KEY) {
            return Ok(data);
        }
        let curve = self.fred.get_yield_curve().await?;
        self.curve_cache.insert(
            CURVE_CACHE_KEY,
            CacheEntry {
                data: curve.clone(),
                cached_at: Utc::now(),
            },
        );
        Ok(curve)
    }

    /// 10-year Treasury yield as a fraction, else the configured default.
    pub fn risk_free_rate(&self, curve: Option<&YieldCurve>) -> f64 {
        curve
            .and_then(|c| c.ten_year())
            .map(|pct| pct / 100.0)
            .unwrap_or(self.config.default_risk_free_rate)
    }

    /// Full equity report: every section the fetched data supports.
    pub async fn analyze_equity(&self, symbol: &str) -> Result<CompleteAnalysis, AnalysisError> {
        let symbol = symbol.trim().to_uppercase();
        tracing::info!("Starting equity analysis for {}", symbol);

        let (quote_result, candles_result, fundamentals_result, benchmark_result, curve_result) = tokio::join!(
            self.yahoo.get_quote(&symbol),
            self.get_candles(&symbol, Interval::Daily, "1y"),
            self.get_fundamentals(&symbol),
            self.get_candles(&self.config.benchmark_symbol, Interval::Daily, "1y"),
            self.get_yield_curve(),
        );

        let quote = quote_result
            .map_err(|e| tracing::warn!("Quote unavailable for {}: {}", symbol, e))
            .ok();
        let benchmark = benchmark_result
            .map_err(|e| tracing::warn!("Benchmark {} unavailable: {}", self.config.benchmark_symbol, e))
            .ok();
        let curve = curve_result
            .map_err(|e| tracing::warn!("Yield curve unavailable: {}", e))
            .ok();
        let risk_free_rate = self.risk_free_rate(curve.as_ref());

        let (candles, fundamentals) = match (candles_result, fundamentals_result) {
            (Err(candle_err), Err(fund_err)) => {
                tracing::warn!("Fundamentals unavailable for {}: {}", symbol, fund_err);
                return Err(candle_err);
            }
            (c, f) => (
                c.map_err(|e| tracing::warn!("Candles unavailable for {}: {}", symbol, e)).ok(),
                f.map_err(|e| tracing::warn!("Fundamentals unavailable for {}: {}", symbol, e)).ok(),
            ),
        };

        let mut sections = Vec::new();

        if let Some(f) = &fundamentals {
            match self.fundamental_analyzer.analyze_all(&symbol, f, risk_free_rate) {
                Ok(fundamental_sections) => sections.extend(fundamental_sections),
                Err(e) => tracing::warn!("Fundamental analysis failed for {}: {}", symbol, e),
            }
        }

        push_section(
            &mut sections,
            "Risk",
            &symbol,
            self.risk_analyzer.analyze_with_interval(
                &symbol,
                candles.as_deref().unwrap_or_default(),
                benchmark.as_deref(),
                fundamentals.as_ref(),
                risk_free_rate,
                Interval::Daily,
                AssetClass::Equity,
            ),
        );

        if let Some(f) = &fundamentals {
            push_section(
                &mut sections,
                "Sentiment",
                &symbol,
                self.sentiment_analyzer.analyze_sync(&symbol, f, candles.as_deref()),
            );
        }

        if let Some(c) = &candles {
            push_section(&mut sections, "Technical", &symbol, self.technical_analyzer.analyze_candles(c));
        }

        if sections.is_empty() {
            return Err(AnalysisError::InsufficientData(format!(
                "no analysis could be produced for {}",
                symbol
            )));
        }

        let name = fundamentals.as_ref().and_then(|f| f.long_name.clone());
        Ok(compose(ReportInputs {
            symbol,
            name,
            asset_class: AssetClass::Equity,
            quote,
            sections,
            yield_curve: curve,
            risk_free_rate,
            generated_at: Utc::now(),
        }))
    }

    /// Crypto report: technical and price-risk sections from the exchange series.
    pub async fn analyze_crypto(&self, pair: &str, interval: Interval) -> Result<CompleteAnalysis, AnalysisError> {
        let pair = pair.trim().to_uppercase();
        tracing::info!("Starting crypto analysis for {} ({:?})", pair, interval);

        let limit = match interval {
            Interval::Hourly => 500,
            Interval::Daily => 365,
            Interval::Weekly => 200,
        };
        let (ticker_result, candles_result) = tokio::join!(
            self.binance.get_ticker(&pair),
            self.get_crypto_candles(&pair, interval, limit),
        );

        let candles = candles_result?;
        let quote = ticker_result
            .map_err(|e| tracing::warn!("Ticker unavailable for {}: {}", pair, e))
            .ok();
        let risk_free_rate = self.config.default_risk_free_rate;

        let mut sections = Vec::new();
        push_section(&mut sections, "Technical", &pair, self.technical_analyzer.analyze_candles(&candles));
        push_section(
            &mut sections,
            "Risk",
            &pair,
            self.risk_analyzer.analyze_with_interval(
                &pair,
                &candles,
                None,
                None,
                risk_free_rate,
                interval,
                AssetClass::Crypto,
            ),
        );

        if sections.is_empty() {
            return Err(AnalysisError::InsufficientData(format!(
                "{} returned only {} candles",
                pair,
                candles.len()
            )));
        }

        Ok(compose(ReportInputs {
            symbol: pair,
            name: None,
            asset_class: AssetClass::Crypto,
            quote,
            sections,
            yield_curve: None,
            risk_free_rate,
            generated_at: Utc::now(),
        }))
    }

    /// Technical section alone for an equity.
    pub async fn analyze_technicals(&self, symbol: &str, interval: Interval) -> Result<AnalysisSection, AnalysisError> {
        let range = match interval {
            Interval::Hourly => "3mo",
            Interval::Daily => "1y",
            Interval::Weekly => "5y",
        };
        let candles = self.get_candles(&symbol.trim().to_uppercase(), interval, range).await?;
        self.technical_analyzer.analyze_candles(&candles)
    }
}

fn push_section(
    sections: &mut Vec<AnalysisSection>,
    label: &str,
    symbol: &str,
    result: Result<AnalysisSection, AnalysisError>,
) {
    match result {
        Ok(section) => sections.push(section),
        Err(e) => tracing::warn!("{} analysis failed for {}: {}", label, symbol, e),
    }
}
