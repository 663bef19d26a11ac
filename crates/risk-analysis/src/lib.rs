//! Risk section: return statistics from the price history combined with
//! balance-sheet leverage and liquidity.
//!
//! Bullish signals mean lower risk.

pub mod metrics;

use analysis_core::{
    AnalysisError, AnalysisSection, AssetClass, Candle, Fundamentals, Interval, RiskAnalyzer,
    RiskThresholds, SectionKind, SignalSet,
};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

pub use metrics::PriceRiskMetrics;

pub struct RiskAnalysisEngine {
    thresholds: RiskThresholds,
}

impl RiskAnalysisEngine {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    /// Price statistics when the series is long enough, else `None`.
    pub fn price_metrics(
        &self,
        candles: &[Candle],
        benchmark: Option<&[Candle]>,
        risk_free_rate: f64,
        interval: Interval,
        asset_class: AssetClass,
    ) -> Option<PriceRiskMetrics> {
        if candles.len() < self.thresholds.min_bars {
            return None;
        }
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let bench_closes: Option<Vec<f64>> = benchmark
            .filter(|b| b.len() >= self.thresholds.min_bars)
            .map(|b| b.iter().map(|c| c.close).collect());

        PriceRiskMetrics::compute(
            &closes,
            bench_closes.as_deref(),
            risk_free_rate,
            interval.periods_per_year(asset_class),
        )
    }

    pub fn analyze_with_interval(
        &self,
        symbol: &str,
        candles: &[Candle],
        benchmark: Option<&[Candle]>,
        fundamentals: Option<&Fundamentals>,
        risk_free_rate: f64,
        interval: Interval,
        asset_class: AssetClass,
    ) -> Result<AnalysisSection, AnalysisError> {
        info!(symbol, bars = candles.len(), "running risk analysis");
        let t = &self.thresholds;
        let mut signals = SignalSet::new();
        let mut narrative = Vec::new();
        let mut metrics = serde_json::Map::new();

        let price = self.price_metrics(candles, benchmark, risk_free_rate, interval, asset_class);
        let has_balance_sheet = fundamentals.map_or(false, |f| {
            f.debt_to_equity.is_some()
                || f.current_ratio.is_some()
                || f.quick_ratio.is_some()
                || f.payout_ratio.is_some()
                || f.beta.is_some()
        });

        if price.is_none() && !has_balance_sheet {
            return Err(AnalysisError::InsufficientData(format!(
                "need at least {} bars or balance-sheet data for {}, got {} bars",
                t.min_bars,
                symbol,
                candles.len()
            )));
        }

        if let Some(m) = &price {
            metrics.insert("bars".into(), json!(m.bars));
            metrics.insert("annualized_return_pct".into(), json!(m.annualized_return_pct));
            metrics.insert("volatility_pct".into(), json!(m.volatility_pct));
            metrics.insert("max_drawdown_pct".into(), json!(m.max_drawdown_pct));
            metrics.insert("sharpe".into(), json!(m.sharpe));
            metrics.insert("sortino".into(), json!(m.sortino));
            metrics.insert("var_95_pct".into(), json!(m.var_95_pct));
            metrics.insert("cvar_95_pct".into(), json!(m.cvar_95_pct));

            if m.volatility_pct > t.volatility_high_pct {
                signals.push("High Volatility", 2, false);
                narrative.push(format!(
                    "Annualized volatility of {:.1}% means large price swings.",
                    m.volatility_pct
                ));
            } else if m.volatility_pct < t.volatility_low_pct {
                signals.push("Low Volatility", 2, true);
                narrative.push(format!("Annualized volatility is a calm {:.1}%.", m.volatility_pct));
            } else {
                narrative.push(format!("Annualized volatility is {:.1}%.", m.volatility_pct));
            }

            if m.max_drawdown_pct > t.drawdown_severe_pct {
                signals.push("Severe Drawdown", 3, false);
                narrative.push(format!(
                    "The price fell {:.1}% from its peak at the worst point.",
                    m.max_drawdown_pct
                ));
            } else if m.max_drawdown_pct > t.drawdown_moderate_pct {
                signals.push("Moderate Drawdown", 1, false);
                narrative.push(format!("Maximum drawdown over the period was {:.1}%.", m.max_drawdown_pct));
            } else {
                signals.push("Contained Drawdown", 1, true);
                narrative.push(format!("Drawdowns stayed within {:.1}%.", m.max_drawdown_pct));
            }

            if m.sharpe > t.sharpe_good {
                signals.push("Strong Risk-Adjusted Returns", 2, true);
                narrative.push(format!("A Sharpe ratio of {:.2} rewards the risk taken.", m.sharpe));
            } else if m.sharpe < t.sharpe_poor {
                signals.push("Negative Risk-Adjusted Returns", 2, false);
                narrative.push(format!(
                    "A Sharpe ratio of {:.2} means returns trailed the risk-free rate.",
                    m.sharpe
                ));
            }

            if m.var_95_pct > t.var_high_pct {
                signals.push("High Tail Risk", 1, false);
                narrative.push(format!(
                    "On the worst 5% of days the loss exceeds {:.1}% (average {:.1}%).",
                    m.var_95_pct, m.cvar_95_pct
                ));
            }
        }

        // Provider beta first, computed beta as fallback
        let beta = fundamentals
            .and_then(|f| f.beta)
            .or_else(|| price.as_ref().and_then(|m| m.beta));
        if let Some(b) = beta {
            metrics.insert("beta".into(), json!(b));
            if b > t.beta_high {
                signals.push("High Beta", 2, false);
                narrative.push(format!("A beta of {:.2} amplifies market moves.", b));
            } else if b < t.beta_low {
                signals.push("Low Beta", 1, true);
                narrative.push(format!("A beta of {:.2} dampens market moves.", b));
            }
        }

        if let Some(f) = fundamentals {
            self.balance_sheet_signals(f, &mut signals, &mut narrative, &mut metrics);
        }

        let data_score = match &price {
            Some(m) => (m.bars as f64 / 252.0).min(1.0),
            None => 0.3,
        };
        let confidence = data_score * 0.6 + signals.agreement() * 0.4;

        let section = AnalysisSection::from_signals(
            SectionKind::Risk,
            signals,
            narrative,
            serde_json::Value::Object(metrics),
            confidence,
        );
        debug!(symbol, score = section.score, "risk analyzed");
        Ok(section)
    }

    fn balance_sheet_signals(
        &self,
        f: &Fundamentals,
        signals: &mut SignalSet,
        narrative: &mut Vec<String>,
        metrics: &mut serde_json::Map<String, serde_json::Value>,
    ) {
        let t = &self.thresholds;

        if let Some(de) = f.debt_to_equity_ratio() {
            metrics.insert("debt_to_equity".into(), json!(de));
            if de > t.debt_to_equity_high {
                signals.push("High Leverage", 2, false);
                narrative.push(format!("Debt is {:.1}x equity.", de));
            } else if de < t.debt_to_equity_low {
                signals.push("Low Leverage", 2, true);
                narrative.push(format!("Debt is a modest {:.2}x equity.", de));
            }
        }

        if let Some(cr) = f.current_ratio {
            metrics.insert("current_ratio".into(), json!(cr));
            if cr < t.current_ratio_low {
                signals.push("Weak Liquidity", 2, false);
                narrative.push(format!(
                    "A current ratio of {:.2} means short-term liabilities exceed current assets.",
                    cr
                ));
            } else if cr > t.current_ratio_high {
                signals.push("Strong Liquidity", 1, true);
            }
        }

        if let Some(qr) = f.quick_ratio {
            metrics.insert("quick_ratio".into(), json!(qr));
            if qr < t.quick_ratio_low {
                signals.push("Thin Quick Ratio", 1, false);
                narrative.push(format!("Excluding inventory, liquid assets cover {:.2}x liabilities.", qr));
            }
        }

        if let Some(payout) = f.payout_ratio {
            metrics.insert("payout_ratio".into(), json!(payout));
            if payout > t.payout_ratio_high {
                signals.push("Unsustainable Payout", 2, false);
                narrative.push(format!(
                    "The dividend pays out {:.0}% of earnings.",
                    payout * 100.0
                ));
            }
        }
    }
}

#[async_trait]
impl RiskAnalyzer for RiskAnalysisEngine {
    async fn analyze(
        &self,
        symbol: &str,
        candles: &[Candle],
        benchmark: Option<&[Candle]>,
        fundamentals: Option<&Fundamentals>,
        risk_free_rate: f64,
    ) -> Result<AnalysisSection, AnalysisError> {
        self.analyze_with_interval(
            symbol,
            candles,
            benchmark,
            fundamentals,
            risk_free_rate,
            Interval::Daily,
            AssetClass::Equity,
        )
    }
}

impl Default for RiskAnalysisEngine {
    fn default() -> Self {
        Self::new(RiskThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Rating;
    use chrono::{Duration, TimeZone, Utc};

    fn candles_from(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle {
                timestamp: start + Duration::days(i as i64),
                open: c,
                high: c * 1.01,
                low: c * 0.99,
                close: c,
                volume: 1_000.0,
            })
            .collect()
    }

    fn steady_climb(n: usize) -> Vec<f64> {
        // Small alternating gains, never a loss
        (0..n)
            .scan(100.0, |p, i| {
                *p *= if i % 2 == 0 { 1.002 } else { 1.001 };
                Some(*p)
            })
            .collect()
    }

    fn crash(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let base = 100.0 * (1.0 - i as f64 / n as f64 * 0.7);
                if i % 2 == 0 { base * 1.06 } else { base * 0.94 }
            })
            .collect()
    }

    #[test]
    fn calm_climb_is_low_risk() {
        let engine = RiskAnalysisEngine::default();
        let candles = candles_from(&steady_climb(120));
        let section = engine
            .analyze_with_interval("CALM", &candles, None, None, 0.04, Interval::Daily, AssetClass::Equity)
            .unwrap();

        assert_eq!(section.kind, SectionKind::Risk);
        assert_eq!(section.rating, Rating::Strong);
        assert!(section.signals.iter().any(|s| s.name == "Low Volatility"));
        assert_eq!(section.metrics["max_drawdown_pct"], json!(0.0));
    }

    #[test]
    fn crash_is_caution() {
        let engine = RiskAnalysisEngine::default();
        let candles = candles_from(&crash(120));
        let section = engine
            .analyze_with_interval("DOWN", &candles, None, None, 0.04, Interval::Daily, AssetClass::Equity)
            .unwrap();

        assert_eq!(section.rating, Rating::Caution);
        assert!(section.signals.iter().any(|s| s.name == "Severe Drawdown"));
        assert!(section.signals.iter().any(|s| s.name == "High Volatility"));
    }

    #[test]
    fn short_history_uses_balance_sheet_only() {
        let engine = RiskAnalysisEngine::default();
        let candles = candles_from(&steady_climb(10));
        let mut f = Fundamentals::new("LEV");
        f.debt_to_equity = Some(350.0);
        f.current_ratio = Some(0.7);
        f.payout_ratio = Some(1.4);

        let section = engine
            .analyze_with_interval("LEV", &candles, None, Some(&f), 0.04, Interval::Daily, AssetClass::Equity)
            .unwrap();

        assert!(section.metrics.get("volatility_pct").is_none());
        assert_eq!(section.signals.len(), 3);
        assert_eq!(section.rating, Rating::Caution);
        assert!((section.metrics["debt_to_equity"].as_f64().unwrap() - 3.5).abs() < 1e-9);
    }

    #[test]
    fn no_data_is_insufficient() {
        let engine = RiskAnalysisEngine::default();
        let candles = candles_from(&steady_climb(10));
        let result = engine.analyze_with_interval(
            "NONE",
            &candles,
            None,
            Some(&Fundamentals::new("NONE")),
            0.04,
            Interval::Daily,
            AssetClass::Equity,
        );
        assert!(matches!(result, Err(AnalysisError::InsufficientData(_))));
    }

    #[test]
    fn benchmark_beta_used_without_provider_beta() {
        let engine = RiskAnalysisEngine::default();
        let bench = crash(60);
        // Asset moves exactly with the benchmark
        let candles = candles_from(&bench);
        let section = engine
            .analyze_with_interval(
                "TWIN",
                &candles,
                Some(&candles_from(&bench)),
                None,
                0.04,
                Interval::Daily,
                AssetClass::Equity,
            )
            .unwrap();
        assert!((section.metrics["beta"].as_f64().unwrap() - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn trait_uses_daily_annualization() {
        let engine = RiskAnalysisEngine::default();
        let candles = candles_from(&steady_climb(60));
        let via_trait = RiskAnalyzer::analyze(&engine, "CALM", &candles, None, None, 0.04)
            .await
            .unwrap();
        let direct = engine
            .analyze_with_interval("CALM", &candles, None, None, 0.04, Interval::Daily, AssetClass::Equity)
            .unwrap();
        assert_eq!(via_trait.metrics, direct.metrics);
    }

    #[test]
    fn payout_cutoff_is_configurable() {
        let mut f = Fundamentals::new("DIV");
        f.payout_ratio = Some(1.4);
        let candles = candles_from(&steady_climb(10));

        let section = RiskAnalysisEngine::default()
            .analyze_with_interval("DIV", &candles, None, Some(&f), 0.04, Interval::Daily, AssetClass::Equity)
            .unwrap();
        assert!(section.signals.iter().any(|s| s.name == "Unsustainable Payout"));

        let lenient = RiskAnalysisEngine::new(RiskThresholds {
            payout_ratio_high: 1.5,
            ..RiskThresholds::default()
        });
        let section = lenient
            .analyze_with_interval("DIV", &candles, None, Some(&f), 0.04, Interval::Daily, AssetClass::Equity)
            .unwrap();
        assert!(section.signals.iter().all(|s| s.name != "Unsustainable Payout"));
    }

    #[test]
    fn crypto_annualizes_over_calendar_days() {
        let engine = RiskAnalysisEngine::default();
        let candles = candles_from(&crash(120));
        let equity = engine
            .price_metrics(&candles, None, 0.04, Interval::Daily, AssetClass::Equity)
            .unwrap();
        let crypto = engine
            .price_metrics(&candles, None, 0.04, Interval::Daily, AssetClass::Crypto)
            .unwrap();

        let ratio = crypto.volatility_pct / equity.volatility_pct;
        assert!((ratio - (365.0f64 / 252.0).sqrt()).abs() < 1e-9);
    }
}
