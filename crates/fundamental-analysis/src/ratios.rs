//! Derived ratios computed from the fundamentals payload.
//!
//! Every function returns `None` when an input is missing or would make the
//! ratio meaningless (zero or negative denominators).

use analysis_core::{Fundamentals, QualityThresholds, Rating};
use serde::{Deserialize, Serialize};

/// Total debt plus book equity minus cash.
pub fn invested_capital(f: &Fundamentals) -> Option<f64> {
    let equity = f.shareholders_equity()?;
    let debt = f.total_debt.unwrap_or(0.0);
    let cash = f.total_cash.unwrap_or(0.0);
    let capital = debt + equity - cash;
    (capital > 0.0).then_some(capital)
}

/// Return on invested capital: after-tax operating income over invested capital.
pub fn roic(f: &Fundamentals, tax_rate: f64) -> Option<f64> {
    let nopat = f.operating_income()? * (1.0 - tax_rate);
    Some(nopat / invested_capital(f)?)
}

/// CAPM cost of equity. A missing beta counts as market beta.
pub fn cost_of_equity(risk_free_rate: f64, beta: Option<f64>, equity_risk_premium: f64) -> f64 {
    risk_free_rate + beta.unwrap_or(1.0) * equity_risk_premium
}

/// Weighted average cost of capital using market-value weights.
pub fn wacc(f: &Fundamentals, risk_free_rate: f64, t: &QualityThresholds) -> Option<f64> {
    let equity_value = f.market_value()?;
    let debt_value = f.total_debt.unwrap_or(0.0).max(0.0);
    let total = equity_value + debt_value;
    if total <= 0.0 {
        return None;
    }

    let ke = cost_of_equity(risk_free_rate, f.beta, t.equity_risk_premium);
    let kd = (risk_free_rate + t.credit_spread) * (1.0 - t.tax_rate);

    Some(equity_value / total * ke + debt_value / total * kd)
}

/// ROIC minus WACC: positive when the company earns more than its capital costs.
pub fn eva_spread(roic: f64, wacc: f64) -> f64 {
    roic - wacc
}

/// Economic value added in currency units.
pub fn eva(f: &Fundamentals, risk_free_rate: f64, t: &QualityThresholds) -> Option<f64> {
    let spread = eva_spread(roic(f, t.tax_rate)?, wacc(f, risk_free_rate, t)?);
    Some(spread * invested_capital(f)?)
}

pub fn fcf_yield(f: &Fundamentals) -> Option<f64> {
    let fcf = f.free_cashflow?;
    let market_value = f.market_value()?;
    Some(fcf / market_value)
}

/// Inverse of trailing P/E, falling back to EPS over price.
pub fn earnings_yield(f: &Fundamentals) -> Option<f64> {
    match f.trailing_pe {
        Some(pe) if pe > 0.0 => Some(1.0 / pe),
        _ => Some(f.trailing_eps? / f.price()?),
    }
}

/// Five-year DCF-lite per-share value with a 3% terminal growth rate.
///
/// Growth is clamped to [-5%, 25%]; the discount rate is rf + ERP with an 8% floor.
pub fn dcf_fair_value(
    fcf_per_share: f64,
    growth_rate: f64,
    risk_free_rate: f64,
    equity_risk_premium: f64,
) -> Option<f64> {
    if fcf_per_share <= 0.0 {
        return None;
    }
    let growth = growth_rate.clamp(-0.05, 0.25);
    let discount_rate = (risk_free_rate + equity_risk_premium).max(0.08);
    let terminal_growth = 0.03;

    let projected: f64 = (1_i32..=5)
        .map(|i| fcf_per_share * (1.0 + growth).powi(i) / (1.0 + discount_rate).powi(i))
        .sum();
    let terminal_value =
        fcf_per_share * (1.0 + growth).powi(5) * (1.0 + terminal_growth) / (discount_rate - terminal_growth);
    let terminal_pv = terminal_value / (1.0 + discount_rate).powi(5);

    Some(projected + terminal_pv)
}

/// Moat verdict with the factors that earned (or missed) a point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoatAssessment {
    pub score: u8,
    pub max_score: u8,
    pub rating: Rating,
    pub factors: Vec<(String, bool)>,
}

impl MoatAssessment {
    pub fn verdict(&self) -> &'static str {
        moat_verdict(self.rating)
    }
}

pub fn moat_verdict(rating: Rating) -> &'static str {
    match rating {
        Rating::Strong => "wide moat",
        Rating::Moderate => "narrow moat",
        Rating::Caution => "no discernible moat",
    }
}

/// One point each for high gross margin, high operating margin, high ROE,
/// high ROIC and a positive EVA spread.
pub fn moat_score(f: &Fundamentals, risk_free_rate: f64, t: &QualityThresholds) -> MoatAssessment {
    let roic_value = roic(f, t.tax_rate);
    let spread = match (roic_value, wacc(f, risk_free_rate, t)) {
        (Some(r), Some(w)) => Some(eva_spread(r, w)),
        _ => None,
    };

    let factors = vec![
        (
            "Gross margin above high threshold".to_string(),
            f.gross_margins.map_or(false, |g| g > t.gross_margin_high),
        ),
        (
            "Operating margin above high threshold".to_string(),
            f.operating_margins.map_or(false, |m| m > t.operating_margin_high),
        ),
        (
            "Return on equity above high threshold".to_string(),
            f.return_on_equity.map_or(false, |r| r > t.roe_high),
        ),
        (
            "ROIC above high threshold".to_string(),
            roic_value.map_or(false, |r| r > t.roic_high),
        ),
        (
            "Returns exceed cost of capital".to_string(),
            spread.map_or(false, |s| s > 0.0),
        ),
    ];

    let score = factors.iter().filter(|(_, hit)| *hit).count() as u8;
    let rating = match score {
        4..=5 => Rating::Strong,
        2..=3 => Rating::Moderate,
        _ => Rating::Caution,
    };

    MoatAssessment {
        score,
        max_score: factors.len() as u8,
        rating,
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quality_company() -> Fundamentals {
        let mut f = Fundamentals::new("QUAL");
        f.current_price = Some(100.0);
        f.shares_outstanding = Some(1_000.0);
        f.market_cap = Some(100_000.0);
        f.book_value = Some(20.0); // equity 20,000
        f.total_debt = Some(5_000.0);
        f.total_cash = Some(5_000.0);
        f.total_revenue = Some(50_000.0);
        f.operating_margins = Some(0.30); // operating income 15,000
        f.gross_margins = Some(0.60);
        f.return_on_equity = Some(0.40);
        f.beta = Some(1.0);
        f
    }

    #[test]
    fn roic_uses_after_tax_operating_income() {
        let f = quality_company();
        // invested capital = 5,000 + 20,000 - 5,000 = 20,000
        assert_eq!(invested_capital(&f), Some(20_000.0));
        let r = roic(&f, 0.21).unwrap();
        assert!((r - 15_000.0 * 0.79 / 20_000.0).abs() < 1e-9);
    }

    #[test]
    fn roic_requires_positive_capital() {
        let mut f = quality_company();
        f.total_cash = Some(100_000.0);
        assert!(invested_capital(&f).is_none());
        assert!(roic(&f, 0.21).is_none());
    }

    #[test]
    fn wacc_blends_equity_and_debt() {
        let f = quality_company();
        let t = QualityThresholds::default();
        let w = wacc(&f, 0.04, &t).unwrap();

        let ke = 0.04 + 0.055;
        let kd = (0.04 + 0.02) * 0.79;
        let expected = 100_000.0 / 105_000.0 * ke + 5_000.0 / 105_000.0 * kd;
        assert!((w - expected).abs() < 1e-12);
    }

    #[test]
    fn eva_positive_for_high_roic() {
        let f = quality_company();
        let t = QualityThresholds::default();
        let value = eva(&f, 0.04, &t).unwrap();
        assert!(value > 0.0);
    }

    #[test]
    fn moat_score_counts_factors() {
        let f = quality_company();
        let moat = moat_score(&f, 0.04, &QualityThresholds::default());
        assert_eq!(moat.score, 5);
        assert_eq!(moat.rating, Rating::Strong);
        assert_eq!(moat.verdict(), "wide moat");

        let empty = moat_score(&Fundamentals::new("NONE"), 0.04, &QualityThresholds::default());
        assert_eq!(empty.score, 0);
        assert_eq!(empty.rating, Rating::Caution);
        assert_eq!(empty.max_score, 5);
    }

    #[test]
    fn gross_margin_threshold_is_strict() {
        let mut f = Fundamentals::new("EDGE");
        f.gross_margins = Some(0.5);
        let moat = moat_score(&f, 0.04, &QualityThresholds::default());
        assert_eq!(moat.score, 0);
    }

    #[test]
    fn dcf_rejects_negative_cash_flow() {
        assert!(dcf_fair_value(-1.0, 0.1, 0.04, 0.055).is_none());
        let v = dcf_fair_value(5.0, 0.05, 0.04, 0.055).unwrap();
        // Discount rate 9.5% with terminal growth 3%: roughly 17x FCF
        assert!(v > 70.0 && v < 110.0);
    }

    #[test]
    fn yields() {
        let mut f = quality_company();
        f.free_cashflow = Some(5_000.0);
        f.trailing_pe = Some(20.0);
        assert_eq!(fcf_yield(&f), Some(0.05));
        assert_eq!(earnings_yield(&f), Some(0.05));
    }
}
