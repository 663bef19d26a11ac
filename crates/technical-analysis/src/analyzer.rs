use analysis_core::{
    AnalysisError, AnalysisSection, Candle, SectionKind, SignalSet, TechnicalAnalyzer,
    TechnicalThresholds,
};
use async_trait::async_trait;
use serde_json::json;

use crate::indicators::*;
use crate::trend::{detect_trend, Trend};

pub struct TechnicalAnalysisEngine {
    thresholds: TechnicalThresholds,
}

/// Indicator values computed once from the candle series
struct IndicatorSnapshot {
    price: f64,
    rsi: Option<f64>,
    macd: MacdResult,
    sma_short: Vec<f64>,
    sma_medium: Vec<f64>,
    sma_long: Vec<f64>,
    bb: BollingerBands,
    atr: Option<f64>,
    stoch: StochasticResult,
    obv: Vec<f64>,
    /// Price change over the volume lookback, in percent
    roc: Option<f64>,
    vwap: Option<f64>,
    sr: SupportResistance,
    trend: Trend,
}

fn last_two(values: &[f64]) -> Option<(f64, f64)> {
    match values {
        [.., prev, last] => Some((*prev, *last)),
        _ => None,
    }
}

impl TechnicalAnalysisEngine {
    pub fn new(thresholds: TechnicalThresholds) -> Self {
        Self { thresholds }
    }

    fn snapshot(&self, candles: &[Candle]) -> Result<IndicatorSnapshot, AnalysisError> {
        let t = &self.thresholds;
        if candles.len() < t.min_bars {
            return Err(AnalysisError::InsufficientData(format!(
                "Need at least {} candles for technical analysis, got {}",
                t.min_bars,
                candles.len()
            )));
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let Some(&price) = closes.last() else {
            return Err(AnalysisError::InsufficientData(
                "No candles for technical analysis".to_string(),
            ));
        };
        if !price.is_finite() || price <= 0.0 {
            return Err(AnalysisError::InvalidData(format!("Invalid last close: {}", price)));
        }

        Ok(IndicatorSnapshot {
            price,
            rsi: rsi(&closes, t.rsi_period).last().copied(),
            macd: macd(&closes, t.macd_fast, t.macd_slow, t.macd_signal),
            sma_short: sma(&closes, t.sma_short),
            sma_medium: sma(&closes, t.sma_medium),
            sma_long: sma(&closes, t.sma_long),
            bb: bollinger_bands(&closes, t.bb_period, t.bb_std),
            atr: atr(candles, t.atr_period).last().copied(),
            stoch: stochastic(candles, t.stoch_k, t.stoch_d),
            obv: obv(candles),
            roc: rate_of_change(&closes, t.volume_lookback).last().copied(),
            vwap: vwap(candles).last().copied(),
            sr: support_resistance(candles, t.sr_lookback.min(candles.len())),
            trend: detect_trend(candles, t.trend_lookback, t.trend_min_slope),
        })
    }

    pub fn analyze_candles(&self, candles: &[Candle]) -> Result<AnalysisSection, AnalysisError> {
        let t = &self.thresholds;
        let snap = self.snapshot(candles)?;
        let price = snap.price;

        let mut signals = SignalSet::new();
        let mut narrative = Vec::new();

        // RSI (deeper oversold = stronger reversal signal)
        if let Some(last_rsi) = snap.rsi {
            if last_rsi < t.rsi_oversold - t.rsi_extreme_margin {
                signals.push("RSI Deeply Oversold", 3, true);
                narrative.push(format!(
                    "RSI({}) at {:.1} is deeply oversold, a setup that often precedes a rebound.",
                    t.rsi_period, last_rsi
                ));
            } else if last_rsi < t.rsi_oversold {
                signals.push("RSI Oversold", 2, true);
                narrative.push(format!("RSI({}) at {:.1} signals oversold conditions.", t.rsi_period, last_rsi));
            } else if last_rsi > t.rsi_overbought {
                signals.push("RSI Overbought", 2, false);
                narrative.push(format!("RSI({}) at {:.1} signals overbought conditions.", t.rsi_period, last_rsi));
            } else {
                narrative.push(format!("RSI({}) at {:.1} is in neutral territory.", t.rsi_period, last_rsi));
            }
        }

        // MACD
        if let Some((prev_hist, last_hist)) = last_two(&snap.macd.histogram) {
            if last_hist > 0.0 && prev_hist <= 0.0 {
                signals.push("MACD Bullish Cross", 3, true);
                narrative.push("MACD just crossed above its signal line, a fresh bullish momentum shift.".to_string());
            } else if last_hist < 0.0 && prev_hist >= 0.0 {
                signals.push("MACD Bearish Cross", 3, false);
                narrative.push("MACD just crossed below its signal line, a fresh bearish momentum shift.".to_string());
            } else if last_hist > 0.0 {
                signals.push("MACD Above Signal", 1, true);
                narrative.push(format!("MACD histogram is positive ({:.3}), momentum favors buyers.", last_hist));
            } else {
                signals.push("MACD Below Signal", 1, false);
                narrative.push(format!("MACD histogram is negative ({:.3}), momentum favors sellers.", last_hist));
            }
        }

        // Moving averages
        if let (Some(&short_ma), Some(&medium_ma)) = (snap.sma_short.last(), snap.sma_medium.last()) {
            if price > short_ma && price > medium_ma {
                signals.push("Price Above MAs", 2, true);
                narrative.push(format!(
                    "Price {:.2} trades above its {}-period ({:.2}) and {}-period ({:.2}) averages.",
                    price, t.sma_short, short_ma, t.sma_medium, medium_ma
                ));
            } else if price < short_ma && price < medium_ma {
                signals.push("Price Below MAs", 2, false);
                narrative.push(format!(
                    "Price {:.2} trades below its {}-period ({:.2}) and {}-period ({:.2}) averages.",
                    price, t.sma_short, short_ma, t.sma_medium, medium_ma
                ));
            }
        }

        if let Some(&long_ma) = snap.sma_long.last() {
            if price > long_ma {
                signals.push("Above Long-Term Average", 2, true);
                narrative.push(format!(
                    "The long-term trend is intact with price above the {}-period average ({:.2}).",
                    t.sma_long, long_ma
                ));
            } else {
                signals.push("Below Long-Term Average", 2, false);
                narrative.push(format!(
                    "Price sits below the {}-period average ({:.2}), the long-term trend is weak.",
                    t.sma_long, long_ma
                ));
            }
        }

        // Golden / death cross: medium vs long when available, else short vs medium
        let (fast_ma, slow_ma, cross_label) = if snap.sma_long.len() >= 2 {
            (&snap.sma_medium, &snap.sma_long, format!("{}/{}", t.sma_medium, t.sma_long))
        } else {
            (&snap.sma_short, &snap.sma_medium, format!("{}/{}", t.sma_short, t.sma_medium))
        };
        if let (Some((prev_fast, last_fast)), Some((prev_slow, last_slow))) = (last_two(fast_ma), last_two(slow_ma)) {
            if last_fast > last_slow && prev_fast <= prev_slow {
                signals.push("Golden Cross", 4, true);
                narrative.push(format!("A golden cross ({}-period) just formed.", cross_label));
            } else if last_fast < last_slow && prev_fast >= prev_slow {
                signals.push("Death Cross", 4, false);
                narrative.push(format!("A death cross ({}-period) just formed.", cross_label));
            }
        }

        // Bollinger Bands
        let percent_b = snap.bb.percent_b(price);
        if let Some(pb) = percent_b {
            if pb < 0.0 {
                signals.push("Below Lower BB", 2, true);
                narrative.push("Price closed below the lower Bollinger Band, stretched to the downside.".to_string());
            } else if pb > 1.0 {
                signals.push("Above Upper BB", 2, false);
                narrative.push("Price closed above the upper Bollinger Band, stretched to the upside.".to_string());
            } else {
                narrative.push(format!("Price sits at {:.0}% of the Bollinger Band range.", pb * 100.0));
            }
        }

        // Stochastic
        if let Some(&last_k) = snap.stoch.k.last() {
            if last_k < t.stoch_oversold {
                signals.push("Stochastic Oversold", 2, true);
            } else if last_k > t.stoch_overbought {
                signals.push("Stochastic Overbought", 2, false);
            }
        }

        // ATR volatility
        let atr_pct = snap.atr.map(|a| a / price * 100.0);
        if let (Some(atr_value), Some(pct)) = (snap.atr, atr_pct) {
            if pct > t.atr_high_pct {
                signals.push("Elevated Volatility (ATR)", 1, false);
                narrative.push(format!(
                    "ATR({}) of {:.2} is {:.1}% of price, daily swings are wide.",
                    t.atr_period, atr_value, pct
                ));
            } else {
                narrative.push(format!("ATR({}) of {:.2} ({:.1}% of price) shows contained volatility.", t.atr_period, atr_value, pct));
            }
        }

        // OBV confirmation over the volume lookback
        let mut obv_trend: Option<&str> = None;
        let obv_sma = sma(&snap.obv, t.volume_lookback);
        if let (Some(&last_obv), Some(&last_obv_sma), Some(roc)) = (snap.obv.last(), obv_sma.last(), snap.roc) {
            let obv_rising = last_obv > last_obv_sma;
            let price_rising = roc > 0.0;
            if obv_rising == price_rising {
                obv_trend = Some("confirming");
                signals.push("OBV Confirms Trend", 2, price_rising);
                narrative.push("On-balance volume confirms the recent price direction.".to_string());
            } else {
                obv_trend = Some("diverging");
                // Bearish when price rises on falling volume, bullish when the reverse
                signals.push("OBV Divergence", 2, !price_rising);
                narrative.push("On-balance volume diverges from price, the move lacks volume support.".to_string());
            }
        }

        // Support / resistance proximity
        if let Some(support) = snap.sr.support {
            if (price - support) / price * 100.0 < t.sr_proximity_pct {
                signals.push("Near Support Level", 2, true);
                narrative.push(format!(
                    "Price is within {}% of support at {:.2}.",
                    t.sr_proximity_pct, support
                ));
            }
        }
        if let Some(resistance) = snap.sr.resistance {
            if (resistance - price) / price * 100.0 < t.sr_proximity_pct {
                signals.push("Near Resistance Level", 2, false);
                narrative.push(format!(
                    "Price is within {}% of resistance at {:.2}.",
                    t.sr_proximity_pct, resistance
                ));
            }
        }

        match snap.trend {
            Trend::Uptrend => signals.push("Uptrend", 2, true),
            Trend::Downtrend => signals.push("Downtrend", 2, false),
            Trend::Sideways => {}
        }
        narrative.push(format!(
            "Over the last {} bars the series is in {}.",
            t.trend_lookback,
            snap.trend.describe()
        ));

        let confidence = (signals.total_weight() as f64 / 20.0).min(1.0);

        let metrics = json!({
            "price": price,
            "rsi": snap.rsi,
            "macd": snap.macd.macd_line.last(),
            "macd_signal": snap.macd.signal_line.last(),
            "macd_histogram": snap.macd.histogram.last(),
            "sma_short": snap.sma_short.last(),
            "sma_medium": snap.sma_medium.last(),
            "sma_long": snap.sma_long.last(),
            "vwap": snap.vwap,
            "roc_pct": snap.roc,
            "bb_upper": snap.bb.upper.last(),
            "bb_middle": snap.bb.middle.last(),
            "bb_lower": snap.bb.lower.last(),
            "bb_percent_b": percent_b,
            "bb_width": snap.bb.bandwidth(),
            "atr": snap.atr,
            "atr_pct": atr_pct,
            "obv": snap.obv.last(),
            "obv_trend": obv_trend,
            "stochastic_k": snap.stoch.k.last(),
            "stochastic_d": snap.stoch.d.last(),
            "support": snap.sr.support,
            "resistance": snap.sr.resistance,
            "trend": format!("{:?}", snap.trend),
            "signal_count": signals.len(),
        });

        Ok(AnalysisSection::from_signals(
            SectionKind::Technical,
            signals,
            narrative,
            metrics,
            confidence,
        ))
    }
}

#[async_trait]
impl TechnicalAnalyzer for TechnicalAnalysisEngine {
    async fn analyze(&self, symbol: &str, candles: &[Candle]) -> Result<AnalysisSection, AnalysisError> {
        tracing::debug!("Running technical analysis for {} over {} candles", symbol, candles.len());
        self.analyze_candles(candles)
    }
}

impl Default for TechnicalAnalysisEngine {
    fn default() -> Self {
        Self::new(TechnicalThresholds::default())
    }
}
