use async_trait::async_trait;
use crate::{AnalysisError, AnalysisSection, Candle, Fundamentals};

/// Trait for technical analysis engines
#[async_trait]
pub trait TechnicalAnalyzer: Send + Sync {
    async fn analyze(&self, symbol: &str, candles: &[Candle]) -> Result<AnalysisSection, AnalysisError>;
}

/// Trait for fundamental analysis engines (valuation, growth, quality)
#[async_trait]
pub trait FundamentalAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        symbol: &str,
        fundamentals: &Fundamentals,
        risk_free_rate: f64,
    ) -> Result<Vec<AnalysisSection>, AnalysisError>;
}

/// Trait for risk analysis engines
#[async_trait]
pub trait RiskAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        symbol: &str,
        candles: &[Candle],
        benchmark: Option<&[Candle]>,
        fundamentals: Option<&Fundamentals>,
        risk_free_rate: f64,
    ) -> Result<AnalysisSection, AnalysisError>;
}

/// Trait for sentiment analysis engines
#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        symbol: &str,
        fundamentals: &Fundamentals,
        candles: Option<&[Candle]>,
    ) -> Result<AnalysisSection, AnalysisError>;
}
