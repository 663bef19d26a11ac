use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::signals::{Rating, Signal, SignalStrength};

/// OHLCV candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Latest price snapshot for a stock or crypto pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub previous_close: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Fill `change` and `change_percent` from `previous_close` when the provider left them out.
    pub fn with_derived_change(mut self) -> Self {
        if let Some(prev) = self.previous_close.filter(|p| *p > 0.0) {
            if self.change.is_none() {
                self.change = Some(self.price - prev);
            }
            if self.change_percent.is_none() {
                self.change_percent = Some((self.price - prev) / prev * 100.0);
            }
        }
        self
    }
}

/// Fundamentals payload as delivered by the quote provider.
///
/// Ratios (margins, growth, ownership) are fractions: 0.45 means 45%.
/// `debt_to_equity` follows the provider convention and is a percentage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Fundamentals {
    pub symbol: String,
    pub long_name: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub shares_outstanding: Option<f64>,

    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<f64>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    #[serde(rename = "priceToSalesTrailing12Months")]
    pub price_to_sales: Option<f64>,
    pub enterprise_to_ebitda: Option<f64>,
    pub enterprise_to_revenue: Option<f64>,
    pub trailing_eps: Option<f64>,
    pub forward_eps: Option<f64>,
    pub book_value: Option<f64>,

    pub total_revenue: Option<f64>,
    pub gross_profits: Option<f64>,
    pub ebitda: Option<f64>,
    pub operating_cashflow: Option<f64>,
    pub free_cashflow: Option<f64>,
    pub total_cash: Option<f64>,
    pub total_debt: Option<f64>,

    pub gross_margins: Option<f64>,
    pub operating_margins: Option<f64>,
    pub profit_margins: Option<f64>,
    pub ebitda_margins: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,

    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub earnings_quarterly_growth: Option<f64>,

    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub beta: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,

    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_day_average: Option<f64>,
    pub two_hundred_day_average: Option<f64>,
    #[serde(rename = "52WeekChange")]
    pub fifty_two_week_change: Option<f64>,

    pub target_mean_price: Option<f64>,
    pub target_high_price: Option<f64>,
    pub target_low_price: Option<f64>,
    pub recommendation_mean: Option<f64>,
    pub recommendation_key: Option<String>,
    pub number_of_analyst_opinions: Option<f64>,

    pub short_percent_of_float: Option<f64>,
    pub short_ratio: Option<f64>,
    pub held_percent_insiders: Option<f64>,
    pub held_percent_institutions: Option<f64>,
}

impl Fundamentals {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    pub fn price(&self) -> Option<f64> {
        self.current_price.filter(|p| *p > 0.0)
    }

    /// Debt-to-equity as a multiple (provider reports 150.0 for 1.5x).
    pub fn debt_to_equity_ratio(&self) -> Option<f64> {
        self.debt_to_equity.map(|d| d / 100.0)
    }

    /// Book equity: book value per share times shares outstanding.
    pub fn shareholders_equity(&self) -> Option<f64> {
        match (self.book_value, self.shares_outstanding) {
            (Some(bv), Some(shares)) if shares > 0.0 => Some(bv * shares),
            _ => None,
        }
    }

    /// Operating income reconstructed from operating margin and revenue.
    pub fn operating_income(&self) -> Option<f64> {
        match (self.operating_margins, self.total_revenue) {
            (Some(margin), Some(revenue)) if revenue > 0.0 => Some(margin * revenue),
            _ => None,
        }
    }

    /// Market cap, falling back to price times shares.
    pub fn market_value(&self) -> Option<f64> {
        self.market_cap.filter(|m| *m > 0.0).or_else(|| {
            match (self.price(), self.shares_outstanding) {
                (Some(p), Some(s)) if s > 0.0 => Some(p * s),
                _ => None,
            }
        })
    }
}

/// A single point on the Treasury curve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondYield {
    pub series_id: String,
    pub maturity_label: String,
    pub date: NaiveDate,
    /// Percent, e.g. 4.25
    pub yield_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YieldCurve {
    pub points: Vec<BondYield>,
}

impl YieldCurve {
    pub fn get(&self, maturity_label: &str) -> Option<&BondYield> {
        self.points.iter().find(|p| p.maturity_label == maturity_label)
    }

    pub fn ten_year(&self) -> Option<f64> {
        self.get("10Y").map(|p| p.yield_pct)
    }

    /// Long minus short yield, in percentage points.
    pub fn spread(&self, short: &str, long: &str) -> Option<f64> {
        Some(self.get(long)?.yield_pct - self.get(short)?.yield_pct)
    }

    /// 2-year yield above the 10-year.
    pub fn is_inverted(&self) -> bool {
        self.spread("2Y", "10Y").map_or(false, |s| s < 0.0)
    }
}

/// Candle interval for the historical series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Hourly,
    Daily,
    Weekly,
}

impl Interval {
    /// Bars per year, used to annualize return statistics.
    ///
    /// Equity bars follow the exchange calendar (252 sessions of 6.5 hours),
    /// crypto trades around the clock.
    pub fn periods_per_year(&self, asset_class: AssetClass) -> f64 {
        match (asset_class, self) {
            (AssetClass::Equity, Interval::Hourly) => 252.0 * 6.5,
            (AssetClass::Equity, Interval::Daily) => 252.0,
            (AssetClass::Crypto, Interval::Hourly) => 365.0 * 24.0,
            (AssetClass::Crypto, Interval::Daily) => 365.0,
            (_, Interval::Weekly) => 52.0,
        }
    }
}

impl std::str::FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hourly" | "1h" | "hour" => Ok(Interval::Hourly),
            "daily" | "1d" | "day" => Ok(Interval::Daily),
            "weekly" | "1w" | "1wk" | "week" => Ok(Interval::Weekly),
            other => Err(format!("unknown interval '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    Valuation,
    Growth,
    Quality,
    Risk,
    Sentiment,
    Technical,
}

impl SectionKind {
    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Valuation => "Valuation",
            SectionKind::Growth => "Growth",
            SectionKind::Quality => "Quality & Moat",
            SectionKind::Risk => "Risk",
            SectionKind::Sentiment => "Market Sentiment",
            SectionKind::Technical => "Technicals",
        }
    }
}

/// One narrative block of the analysis report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSection {
    pub kind: SectionKind,
    pub rating: Rating,
    /// Normalized signal score, -100 to 100
    pub score: f64,
    pub confidence: f64, // 0.0 to 1.0
    pub signals: Vec<Signal>,
    pub narrative: Vec<String>,
    pub metrics: serde_json::Value,
}

impl AnalysisSection {
    /// Score the collected signals and classify them.
    ///
    /// An empty signal set yields a Moderate section with score 0 and a note
    /// that the data was insufficient.
    pub fn from_signals(
        kind: SectionKind,
        signals: crate::SignalSet,
        mut narrative: Vec<String>,
        metrics: serde_json::Value,
        confidence: f64,
    ) -> Self {
        if signals.is_empty() {
            narrative.push(format!(
                "Insufficient data to draw a {} conclusion.",
                kind.title().to_lowercase()
            ));
        }
        let score = signals.normalized_score();
        Self {
            kind,
            rating: Rating::from_score(score),
            score,
            confidence: confidence.clamp(0.0, 1.0),
            signals: signals.into_vec(),
            narrative,
            metrics,
        }
    }

    pub fn reason(&self) -> String {
        crate::signals::describe(&self.signals)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetClass {
    Equity,
    Crypto,
}

/// Full report for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteAnalysis {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    pub asset_class: AssetClass,
    pub generated_at: DateTime<Utc>,
    pub quote: Option<Quote>,
    pub sections: Vec<AnalysisSection>,
    pub overall_score: f64,
    pub overall_signal: SignalStrength,
    pub overall_rating: Rating,
    pub overall_confidence: f64,
    pub summary: Vec<String>,
    pub risk_free_rate: f64,
}

impl CompleteAnalysis {
    pub fn section(&self, kind: SectionKind) -> Option<&AnalysisSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }
}
