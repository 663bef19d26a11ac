use analysis_core::stats::{mean, range_position};
use analysis_core::{
    AnalysisError, AnalysisSection, Candle, Fundamentals, SectionKind, SentimentAnalyzer,
    SentimentThresholds, SignalSet,
};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

/// Bars in a trading year, used when price context comes from candles.
const YEAR_BARS: usize = 252;

/// Price context for range and moving-average checks
#[derive(Debug, Clone, Default, PartialEq)]
struct PriceContext {
    price: Option<f64>,
    year_high: Option<f64>,
    year_low: Option<f64>,
    sma_50: Option<f64>,
    sma_200: Option<f64>,
    year_change: Option<f64>,
}

impl PriceContext {
    /// Provider fields first, candle-derived values for anything missing.
    fn build(f: &Fundamentals, candles: Option<&[Candle]>) -> Self {
        let from_candles = candles.map(Self::from_candles).unwrap_or_default();
        Self {
            price: f.price().or(from_candles.price),
            year_high: f.fifty_two_week_high.or(from_candles.year_high),
            year_low: f.fifty_two_week_low.or(from_candles.year_low),
            sma_50: f.fifty_day_average.or(from_candles.sma_50),
            sma_200: f.two_hundred_day_average.or(from_candles.sma_200),
            year_change: f.fifty_two_week_change.or(from_candles.year_change),
        }
    }

    fn from_candles(candles: &[Candle]) -> Self {
        let Some(last) = candles.last() else {
            return Self::default();
        };
        let year = &candles[candles.len().saturating_sub(YEAR_BARS)..];
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let trailing_mean = |n: usize| (closes.len() >= n).then(|| mean(&closes[closes.len() - n..]));

        Self {
            price: Some(last.close),
            year_high: year.iter().map(|c| c.high).reduce(f64::max),
            year_low: year.iter().map(|c| c.low).reduce(f64::min),
            sma_50: trailing_mean(50),
            sma_200: trailing_mean(200),
            year_change: (candles.len() > YEAR_BARS)
                .then(|| candles[candles.len() - 1 - YEAR_BARS].close)
                .filter(|base| *base > 0.0)
                .map(|base| last.close / base - 1.0),
        }
    }
}

/// Market sentiment from analyst consensus, positioning and price action.
pub struct SentimentAnalysisEngine {
    thresholds: SentimentThresholds,
}

impl SentimentAnalysisEngine {
    pub fn new(thresholds: SentimentThresholds) -> Self {
        Self { thresholds }
    }

    pub fn analyze_sync(
        &self,
        symbol: &str,
        f: &Fundamentals,
        candles: Option<&[Candle]>,
    ) -> Result<AnalysisSection, AnalysisError> {
        info!(symbol, "running sentiment analysis");
        let t = &self.thresholds;
        let ctx = PriceContext::build(f, candles);
        let mut signals = SignalSet::new();
        let mut narrative = Vec::new();
        let mut metrics = serde_json::Map::new();
        let mut present = 0;

        // Analyst consensus, 1 = strong buy, 5 = sell
        let analysts = f.number_of_analyst_opinions.unwrap_or(0.0);
        if let Some(rec) = f.recommendation_mean {
            metrics.insert("recommendation_mean".into(), json!(rec));
            metrics.insert("analyst_count".into(), json!(analysts));
            if analysts >= t.min_analysts {
                present += 1;
                let key = f.recommendation_key.as_deref().unwrap_or("n/a");
                if rec <= t.recommendation_buy {
                    signals.push("Analyst Buy Consensus", 3, true);
                    narrative.push(format!(
                        "{:.0} analysts rate the stock a buy on average ({:.1}, \"{}\").",
                        analysts, rec, key
                    ));
                } else if rec >= t.recommendation_sell {
                    signals.push("Analyst Sell Consensus", 3, false);
                    narrative.push(format!(
                        "{:.0} analysts lean negative ({:.1}, \"{}\").",
                        analysts, rec, key
                    ));
                } else {
                    narrative.push(format!("Analysts are neutral on balance ({:.1}).", rec));
                }
            } else {
                narrative.push(format!(
                    "Only {:.0} analyst opinions, too few for a consensus.",
                    analysts
                ));
            }
        }

        // Price target
        if let (Some(target), Some(price)) = (f.target_mean_price, ctx.price) {
            present += 1;
            let upside = target / price - 1.0;
            metrics.insert("target_mean_price".into(), json!(target));
            metrics.insert("target_upside".into(), json!(upside));
            if upside > t.target_upside_strong {
                signals.push("Large Target Upside", 3, true);
                narrative.push(format!(
                    "The mean price target of {:.2} implies {:.0}% upside.",
                    target,
                    upside * 100.0
                ));
            } else if upside > t.target_upside {
                signals.push("Target Upside", 2, true);
                narrative.push(format!("The mean price target implies {:.0}% upside.", upside * 100.0));
            } else if upside < t.target_downside {
                signals.push("Trading Above Targets", 2, false);
                narrative.push(format!(
                    "The price sits {:.0}% above the mean analyst target.",
                    -upside * 100.0 / (1.0 + upside)
                ));
            }
        }

        // Short interest
        if let Some(short) = f.short_percent_of_float {
            present += 1;
            metrics.insert("short_percent_of_float".into(), json!(short));
            let days = f
                .short_ratio
                .map(|r| format!(", {:.1} days to cover", r))
                .unwrap_or_default();
            if short > t.short_float_high {
                signals.push("High Short Interest", 2, false);
                narrative.push(format!("{:.1}% of the float is sold short{}.", short * 100.0, days));
            } else if short < t.short_float_low {
                signals.push("Low Short Interest", 1, true);
                narrative.push(format!("Short interest is light at {:.1}% of float{}.", short * 100.0, days));
            }
        }

        // Ownership
        if let Some(inst) = f.held_percent_institutions {
            present += 1;
            metrics.insert("held_percent_institutions".into(), json!(inst));
            if inst > t.institutions_high {
                signals.push("Strong Institutional Ownership", 1, true);
                narrative.push(format!("Institutions hold {:.0}% of shares.", inst * 100.0));
            }
        }
        if let Some(insiders) = f.held_percent_insiders {
            metrics.insert("held_percent_insiders".into(), json!(insiders));
            if insiders > t.insiders_high {
                signals.push("Insider Alignment", 1, true);
                narrative.push(format!("Insiders own {:.1}% of the company.", insiders * 100.0));
            }
        }

        // 52-week range
        if let (Some(price), Some(low), Some(high)) = (ctx.price, ctx.year_low, ctx.year_high) {
            if let Some(pos) = range_position(price, low, high) {
                present += 1;
                metrics.insert("range_position".into(), json!(pos));
                if pos >= t.range_high_position {
                    signals.push("Near 52-Week High", 1, true);
                    narrative.push(format!(
                        "Trading near the top of its 52-week range ({:.2} to {:.2}).",
                        low, high
                    ));
                } else if pos <= t.range_low_position {
                    signals.push("Near 52-Week Low", 1, false);
                    narrative.push(format!(
                        "Trading near the bottom of its 52-week range ({:.2} to {:.2}).",
                        low, high
                    ));
                }
            }
        }

        // Moving averages
        if let (Some(price), Some(sma_50), Some(sma_200)) = (ctx.price, ctx.sma_50, ctx.sma_200) {
            present += 1;
            metrics.insert("fifty_day_average".into(), json!(sma_50));
            metrics.insert("two_hundred_day_average".into(), json!(sma_200));
            if price > sma_50 && price > sma_200 {
                signals.push("Above Key Averages", 2, true);
                narrative.push("Price is above both its 50-day and 200-day averages.".to_string());
            } else if price < sma_50 && price < sma_200 {
                signals.push("Below Key Averages", 2, false);
                narrative.push("Price is below both its 50-day and 200-day averages.".to_string());
            }
        }

        if let Some(change) = ctx.year_change {
            present += 1;
            metrics.insert("fifty_two_week_change".into(), json!(change));
            if change > 0.0 {
                signals.push("Positive 12-Month Return", 1, true);
            } else if change < 0.0 {
                signals.push("Negative 12-Month Return", 1, false);
            }
            narrative.push(format!("The 12-month price change is {:+.1}%.", change * 100.0));
        }

        if present == 0 {
            return Err(AnalysisError::InsufficientData(format!(
                "no sentiment inputs for {}",
                symbol
            )));
        }

        let analyst_confidence = (analysts / 10.0).min(1.0);
        let confidence = (analyst_confidence * 0.4 + signals.agreement() * 0.4 + 0.1).min(0.95);

        let section = AnalysisSection::from_signals(
            SectionKind::Sentiment,
            signals,
            narrative,
            serde_json::Value::Object(metrics),
            confidence,
        );
        debug!(symbol, score = section.score, "sentiment analyzed");
        Ok(section)
    }
}

#[async_trait]
impl SentimentAnalyzer for SentimentAnalysisEngine {
    async fn analyze(
        &self,
        symbol: &str,
        fundamentals: &Fundamentals,
        candles: Option<&[Candle]>,
    ) -> Result<AnalysisSection, AnalysisError> {
        self.analyze_sync(symbol, fundamentals, candles)
    }
}

impl Default for SentimentAnalysisEngine {
    fn default() -> Self {
        Self::new(SentimentThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Rating;
    use chrono::{Duration, TimeZone, Utc};

    fn loved_stock() -> Fundamentals {
        let mut f = Fundamentals::new("LOVE");
        f.current_price = Some(100.0);
        f.recommendation_mean = Some(1.7);
        f.recommendation_key = Some("buy".into());
        f.number_of_analyst_opinions = Some(25.0);
        f.target_mean_price = Some(130.0);
        f.short_percent_of_float = Some(0.01);
        f.short_ratio = Some(1.2);
        f.held_percent_institutions = Some(0.75);
        f.fifty_two_week_low = Some(60.0);
        f.fifty_two_week_high = Some(102.0);
        f.fifty_day_average = Some(95.0);
        f.two_hundred_day_average = Some(85.0);
        f.fifty_two_week_change = Some(0.35);
        f
    }

    #[test]
    fn loved_stock_is_strong() {
        let engine = SentimentAnalysisEngine::default();
        let section = engine.analyze_sync("LOVE", &loved_stock(), None).unwrap();

        assert_eq!(section.kind, SectionKind::Sentiment);
        assert_eq!(section.rating, Rating::Strong);
        assert_eq!(section.score, 100.0);
        assert!((section.metrics["target_upside"].as_f64().unwrap() - 0.3).abs() < 1e-9);
        assert!(section.confidence <= 0.95);
    }

    #[test]
    fn shunned_stock_is_caution() {
        let mut f = Fundamentals::new("HATE");
        f.current_price = Some(40.0);
        f.recommendation_mean = Some(3.8);
        f.number_of_analyst_opinions = Some(8.0);
        f.target_mean_price = Some(30.0);
        f.short_percent_of_float = Some(0.25);
        f.fifty_two_week_low = Some(38.0);
        f.fifty_two_week_high = Some(90.0);
        f.fifty_day_average = Some(50.0);
        f.two_hundred_day_average = Some(65.0);
        f.fifty_two_week_change = Some(-0.45);

        let section = SentimentAnalysisEngine::default()
            .analyze_sync("HATE", &f, None)
            .unwrap();
        assert_eq!(section.rating, Rating::Caution);
        assert!(section.signals.iter().all(|s| !s.bullish));
    }

    #[test]
    fn few_analysts_are_ignored() {
        let mut f = Fundamentals::new("THIN");
        f.recommendation_mean = Some(1.2);
        f.number_of_analyst_opinions = Some(2.0);
        f.fifty_two_week_change = Some(0.1);

        let section = SentimentAnalysisEngine::default()
            .analyze_sync("THIN", &f, None)
            .unwrap();
        assert!(!section.signals.iter().any(|s| s.name == "Analyst Buy Consensus"));
        assert!(section.narrative[0].contains("too few"));
    }

    #[test]
    fn candles_fill_missing_price_context() {
        let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        let candles: Vec<Candle> = (0..260)
            .map(|i| {
                let close = 50.0 + i as f64 * 0.2;
                Candle {
                    timestamp: start + Duration::days(i),
                    open: close,
                    high: close + 0.5,
                    low: close - 0.5,
                    close,
                    volume: 1_000.0,
                }
            })
            .collect();

        let section = SentimentAnalysisEngine::default()
            .analyze_sync("UP", &Fundamentals::new("UP"), Some(&candles))
            .unwrap();

        assert!(section.signals.iter().any(|s| s.name == "Above Key Averages"));
        assert!(section.signals.iter().any(|s| s.name == "Near 52-Week High"));
        assert!(section.signals.iter().any(|s| s.name == "Positive 12-Month Return"));
    }

    #[test]
    fn nothing_to_read_is_insufficient() {
        let result = SentimentAnalysisEngine::default().analyze_sync("NONE", &Fundamentals::new("NONE"), None);
        assert!(matches!(result, Err(AnalysisError::InsufficientData(_))));
    }
}
