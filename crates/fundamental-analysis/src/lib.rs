pub mod ratios;
mod growth;
mod quality;
mod valuation;

use analysis_core::{AnalysisError, AnalysisSection, FundamentalAnalyzer, Fundamentals, Thresholds};
use async_trait::async_trait;
use tracing::{debug, info};

pub use ratios::MoatAssessment;

/// Signal count tier blended with field completeness, capped at 0.95.
pub(crate) fn confidence(signal_count: usize, fields_present: u32, total_fields: u32) -> f64 {
    let signal_confidence = if signal_count >= 5 {
        0.8
    } else if signal_count >= 3 {
        0.6
    } else {
        0.4
    };
    let data_completeness = fields_present.min(total_fields) as f64 / total_fields as f64;
    (signal_confidence * 0.6 + data_completeness * 0.4).min(0.95)
}

/// Valuation, growth and quality sections from a fundamentals payload.
pub struct FundamentalAnalysisEngine {
    thresholds: Thresholds,
}

impl FundamentalAnalysisEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn analyze_valuation(&self, symbol: &str, f: &Fundamentals, risk_free_rate: f64) -> AnalysisSection {
        let section = valuation::analyze_valuation(
            f,
            risk_free_rate,
            &self.thresholds.valuation,
            &self.thresholds.quality,
        );
        debug!(symbol, score = section.score, "valuation analyzed");
        section
    }

    pub fn analyze_growth(&self, symbol: &str, f: &Fundamentals) -> AnalysisSection {
        let section = growth::analyze_growth(f, &self.thresholds.growth, &self.thresholds.valuation);
        debug!(symbol, score = section.score, "growth analyzed");
        section
    }

    pub fn analyze_quality(&self, symbol: &str, f: &Fundamentals, risk_free_rate: f64) -> AnalysisSection {
        let section = quality::analyze_quality(f, risk_free_rate, &self.thresholds.quality);
        debug!(symbol, score = section.score, "quality analyzed");
        section
    }

    pub fn moat(&self, f: &Fundamentals, risk_free_rate: f64) -> MoatAssessment {
        ratios::moat_score(f, risk_free_rate, &self.thresholds.quality)
    }

    /// All three fundamental sections. Fails only when none produced a signal.
    pub fn analyze_all(
        &self,
        symbol: &str,
        f: &Fundamentals,
        risk_free_rate: f64,
    ) -> Result<Vec<AnalysisSection>, AnalysisError> {
        info!(symbol, risk_free_rate, "running fundamental analysis");
        let sections = vec![
            self.analyze_valuation(symbol, f, risk_free_rate),
            self.analyze_growth(symbol, f),
            self.analyze_quality(symbol, f, risk_free_rate),
        ];

        if sections.iter().all(|s| s.signals.is_empty()) {
            return Err(AnalysisError::InsufficientData(format!(
                "no usable fundamentals for {}",
                symbol
            )));
        }
        Ok(sections)
    }
}

#[async_trait]
impl FundamentalAnalyzer for FundamentalAnalysisEngine {
    async fn analyze(
        &self,
        symbol: &str,
        fundamentals: &Fundamentals,
        risk_free_rate: f64,
    ) -> Result<Vec<AnalysisSection>, AnalysisError> {
        self.analyze_all(symbol, fundamentals, risk_free_rate)
    }
}

impl Default for FundamentalAnalysisEngine {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}
