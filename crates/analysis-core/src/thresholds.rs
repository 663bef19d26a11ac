//! Classification cutoffs used by every analyzer.
//!
//! Each heuristic threshold is defined once here. Ratios are fractions unless
//! the field name says otherwise (`_pct` fields are percentages).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::AnalysisError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub valuation: ValuationThresholds,
    pub growth: GrowthThresholds,
    pub quality: QualityThresholds,
    pub risk: RiskThresholds,
    pub sentiment: SentimentThresholds,
    pub technical: TechnicalThresholds,
}

impl Thresholds {
    /// Load overrides from a JSON file. Absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, AnalysisError> {
        serde_json::from_str(raw).map_err(|e| AnalysisError::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationThresholds {
    pub pe_low: f64,
    pub pe_high: f64,
    /// Forward P/E below this fraction of trailing P/E reads as improving earnings.
    pub forward_pe_discount: f64,
    pub peg_attractive: f64,
    pub peg_expensive: f64,
    pub pb_low: f64,
    pub pb_high: f64,
    pub ps_high: f64,
    pub ev_ebitda_low: f64,
    pub ev_ebitda_high: f64,
    pub fcf_yield_high: f64,
    pub fcf_yield_low: f64,
    pub fair_value_discount: f64,
    pub fair_value_premium: f64,
}

impl Default for ValuationThresholds {
    fn default() -> Self {
        Self {
            pe_low: 15.0,
            pe_high: 30.0,
            forward_pe_discount: 0.9,
            peg_attractive: 1.0,
            peg_expensive: 2.0,
            pb_low: 1.5,
            pb_high: 5.0,
            ps_high: 10.0,
            ev_ebitda_low: 10.0,
            ev_ebitda_high: 20.0,
            fcf_yield_high: 0.05,
            fcf_yield_low: 0.02,
            fair_value_discount: 0.8,
            fair_value_premium: 1.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthThresholds {
    pub revenue_strong: f64,
    pub revenue_moderate: f64,
    pub revenue_decline: f64,
    pub earnings_strong: f64,
    pub earnings_decline: f64,
    pub eps_expansion: f64,
    /// Earnings growth above this multiple of revenue growth reads as operating leverage.
    pub operating_leverage_ratio: f64,
}

impl Default for GrowthThresholds {
    fn default() -> Self {
        Self {
            revenue_strong: 0.15,
            revenue_moderate: 0.05,
            revenue_decline: -0.05,
            earnings_strong: 0.20,
            earnings_decline: -0.10,
            eps_expansion: 0.10,
            operating_leverage_ratio: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub gross_margin_high: f64,
    pub gross_margin_low: f64,
    pub operating_margin_high: f64,
    pub operating_margin_low: f64,
    pub profit_margin_high: f64,
    pub profit_margin_low: f64,
    pub roe_high: f64,
    pub roe_low: f64,
    pub roa_high: f64,
    pub roic_high: f64,
    pub roic_low: f64,
    pub eva_positive_spread: f64,
    pub tax_rate: f64,
    pub equity_risk_premium: f64,
    pub credit_spread: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            gross_margin_high: 0.5,
            gross_margin_low: 0.2,
            operating_margin_high: 0.2,
            operating_margin_low: 0.05,
            profit_margin_high: 0.15,
            profit_margin_low: 0.03,
            roe_high: 0.15,
            roe_low: 0.05,
            roa_high: 0.08,
            roic_high: 0.15,
            roic_low: 0.06,
            eva_positive_spread: 0.02,
            tax_rate: 0.21,
            equity_risk_premium: 0.055,
            credit_spread: 0.02,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub beta_high: f64,
    pub beta_low: f64,
    pub volatility_high_pct: f64,
    pub volatility_low_pct: f64,
    pub drawdown_severe_pct: f64,
    pub drawdown_moderate_pct: f64,
    pub debt_to_equity_high: f64,
    pub debt_to_equity_low: f64,
    pub current_ratio_low: f64,
    pub current_ratio_high: f64,
    pub quick_ratio_low: f64,
    /// Dividends above this fraction of earnings are unsustainable.
    pub payout_ratio_high: f64,
    pub sharpe_good: f64,
    pub sharpe_poor: f64,
    pub var_high_pct: f64,
    pub min_bars: usize,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            beta_high: 1.5,
            beta_low: 0.8,
            volatility_high_pct: 45.0,
            volatility_low_pct: 20.0,
            drawdown_severe_pct: 40.0,
            drawdown_moderate_pct: 20.0,
            debt_to_equity_high: 2.0,
            debt_to_equity_low: 0.5,
            current_ratio_low: 1.0,
            current_ratio_high: 1.5,
            quick_ratio_low: 0.8,
            payout_ratio_high: 1.0,
            sharpe_good: 1.0,
            sharpe_poor: 0.0,
            var_high_pct: 4.0,
            min_bars: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentThresholds {
    pub recommendation_buy: f64,
    pub recommendation_sell: f64,
    pub target_upside_strong: f64,
    pub target_upside: f64,
    pub target_downside: f64,
    pub short_float_high: f64,
    pub short_float_low: f64,
    pub institutions_high: f64,
    pub insiders_high: f64,
    pub min_analysts: f64,
    pub range_high_position: f64,
    pub range_low_position: f64,
}

impl Default for SentimentThresholds {
    fn default() -> Self {
        Self {
            recommendation_buy: 2.0,
            recommendation_sell: 3.5,
            target_upside_strong: 0.20,
            target_upside: 0.10,
            target_downside: -0.10,
            short_float_high: 0.10,
            short_float_low: 0.03,
            institutions_high: 0.6,
            insiders_high: 0.05,
            min_analysts: 3.0,
            range_high_position: 0.85,
            range_low_position: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalThresholds {
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    /// Points beyond `rsi_oversold` that count as deeply oversold
    pub rsi_extreme_margin: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    pub bb_std: f64,
    pub atr_period: usize,
    pub atr_high_pct: f64,
    pub stoch_k: usize,
    pub stoch_d: usize,
    pub stoch_overbought: f64,
    pub stoch_oversold: f64,
    pub sma_short: usize,
    pub sma_medium: usize,
    pub sma_long: usize,
    /// Bars scanned for support and resistance
    pub sr_lookback: usize,
    /// Distance to a level, in % of price, that counts as "near"
    pub sr_proximity_pct: f64,
    pub trend_lookback: usize,
    /// Regression slope, as a fraction of the average bar range, needed to call a trend
    pub trend_min_slope: f64,
    /// Bars over which OBV and price direction are compared
    pub volume_lookback: usize,
    pub min_bars: usize,
}

impl Default for TechnicalThresholds {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            rsi_extreme_margin: 5.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_period: 20,
            bb_std: 2.0,
            atr_period: 14,
            atr_high_pct: 4.0,
            stoch_k: 14,
            stoch_d: 3,
            stoch_overbought: 80.0,
            stoch_oversold: 20.0,
            sma_short: 20,
            sma_medium: 50,
            sma_long: 200,
            sr_lookback: 30,
            sr_proximity_pct: 2.0,
            trend_lookback: 20,
            trend_min_slope: 0.1,
            volume_lookback: 20,
            min_bars: 50,
        }
    }
}
