use analysis_core::{
    AnalysisSection, Fundamentals, QualityThresholds, SectionKind, SignalSet, ValuationThresholds,
};
use serde_json::json;

use crate::confidence;
use crate::ratios::{dcf_fair_value, fcf_yield};

const VALUATION_FIELDS: u32 = 7;

/// Price multiples, cash-flow yield and a DCF cross-check.
pub fn analyze_valuation(
    f: &Fundamentals,
    risk_free_rate: f64,
    t: &ValuationThresholds,
    q: &QualityThresholds,
) -> AnalysisSection {
    let mut signals = SignalSet::new();
    let mut narrative = Vec::new();
    let mut metrics = serde_json::Map::new();
    let mut present = 0;

    // Trailing P/E
    if let Some(pe) = f.trailing_pe.filter(|pe| *pe > 0.0) {
        present += 1;
        metrics.insert("trailing_pe".into(), json!(pe));
        if pe < t.pe_low {
            signals.push("Low P/E Ratio", 3, true);
            narrative.push(format!("A trailing P/E of {:.1} is below {:.0}, a value-range multiple.", pe, t.pe_low));
        } else if pe > t.pe_high {
            signals.push("High P/E Ratio", 2, false);
            narrative.push(format!("A trailing P/E of {:.1} is rich, investors are paying up for future growth.", pe));
        } else {
            narrative.push(format!("A trailing P/E of {:.1} sits in a fair range.", pe));
        }

        // Forward vs trailing
        if let Some(fpe) = f.forward_pe.filter(|p| *p > 0.0) {
            metrics.insert("forward_pe".into(), json!(fpe));
            if fpe < pe * t.forward_pe_discount {
                signals.push("Forward P/E Compression", 2, true);
                narrative.push(format!(
                    "Forward P/E of {:.1} is well below trailing, analysts expect earnings to rise.",
                    fpe
                ));
            } else if fpe > pe {
                signals.push("Forward P/E Expansion", 1, false);
                narrative.push(format!("Forward P/E of {:.1} is above trailing, earnings are expected to shrink.", fpe));
            }
        }
    } else if f.trailing_eps.map_or(false, |eps| eps <= 0.0) {
        present += 1;
        signals.push("Negative Earnings", 2, false);
        narrative.push("Trailing earnings are negative, so P/E is not meaningful.".to_string());
    }

    // PEG
    if let Some(peg) = f.peg_ratio.filter(|p| *p > 0.0) {
        present += 1;
        metrics.insert("peg_ratio".into(), json!(peg));
        if peg < t.peg_attractive {
            signals.push("Attractive PEG Ratio", 2, true);
            narrative.push(format!("A PEG of {:.2} suggests growth is priced cheaply.", peg));
        } else if peg > t.peg_expensive {
            signals.push("Expensive PEG Ratio", 1, false);
            narrative.push(format!("A PEG of {:.2} means the price runs ahead of expected growth.", peg));
        }
    }

    // Price to book
    if let Some(pb) = f.price_to_book.filter(|p| *p > 0.0) {
        present += 1;
        metrics.insert("price_to_book".into(), json!(pb));
        if pb < t.pb_low {
            signals.push("Low Price/Book", 2, true);
            narrative.push(format!("Shares trade at {:.2}x book value.", pb));
        } else if pb > t.pb_high {
            signals.push("High Price/Book", 1, false);
            narrative.push(format!("At {:.1}x book, the market prices in substantial intangible value.", pb));
        }
    }

    // Price to sales
    if let Some(ps) = f.price_to_sales.filter(|p| *p > 0.0) {
        present += 1;
        metrics.insert("price_to_sales".into(), json!(ps));
        if ps > t.ps_high {
            signals.push("High Price/Sales", 1, false);
            narrative.push(format!("A price-to-sales multiple of {:.1}x leaves little room for disappointment.", ps));
        }
    }

    // EV / EBITDA
    if let Some(ev_ebitda) = f.enterprise_to_ebitda.filter(|v| *v > 0.0) {
        present += 1;
        metrics.insert("ev_to_ebitda".into(), json!(ev_ebitda));
        if ev_ebitda < t.ev_ebitda_low {
            signals.push("Low EV/EBITDA", 2, true);
            narrative.push(format!("EV/EBITDA of {:.1}x is inexpensive on an enterprise basis.", ev_ebitda));
        } else if ev_ebitda > t.ev_ebitda_high {
            signals.push("High EV/EBITDA", 2, false);
            narrative.push(format!("EV/EBITDA of {:.1}x is expensive on an enterprise basis.", ev_ebitda));
        }
    }

    // Free cash flow yield
    if let Some(yield_) = fcf_yield(f) {
        present += 1;
        metrics.insert("fcf_yield".into(), json!(yield_));
        if yield_ > t.fcf_yield_high {
            signals.push("High FCF Yield", 3, true);
            narrative.push(format!("A free-cash-flow yield of {:.1}% is generous.", yield_ * 100.0));
        } else if yield_ < 0.0 {
            signals.push("Negative Free Cash Flow", 2, false);
            narrative.push("The company is burning free cash flow.".to_string());
        } else if yield_ < t.fcf_yield_low {
            signals.push("Low FCF Yield", 1, false);
            narrative.push(format!("A free-cash-flow yield of {:.1}% is thin.", yield_ * 100.0));
        }
    }

    // DCF-lite cross-check
    if let (Some(fcf), Some(shares), Some(price)) = (f.free_cashflow, f.shares_outstanding, f.price()) {
        if shares > 0.0 {
            let growth = f.revenue_growth.unwrap_or(0.03);
            if let Some(fair_value) = dcf_fair_value(fcf / shares, growth, risk_free_rate, q.equity_risk_premium) {
                let ratio = price / fair_value;
                metrics.insert("fair_value_estimate".into(), json!(fair_value));
                metrics.insert("price_to_fair_value".into(), json!(ratio));
                if ratio < t.fair_value_discount {
                    signals.push("Below DCF Fair Value", 3, true);
                    narrative.push(format!(
                        "A simple DCF puts fair value near {:.2}, {:.0}% above the current price.",
                        fair_value,
                        (fair_value / price - 1.0) * 100.0
                    ));
                } else if ratio > t.fair_value_premium {
                    signals.push("Above DCF Fair Value", 2, false);
                    narrative.push(format!(
                        "A simple DCF puts fair value near {:.2}, below the current price of {:.2}.",
                        fair_value, price
                    ));
                } else {
                    narrative.push(format!("A simple DCF puts fair value near {:.2}, close to the market price.", fair_value));
                }
            }
        }
    }

    let confidence = confidence(signals.len(), present, VALUATION_FIELDS);
    AnalysisSection::from_signals(
        SectionKind::Valuation,
        signals,
        narrative,
        serde_json::Value::Object(metrics),
        confidence,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Rating;

    fn thresholds() -> (ValuationThresholds, QualityThresholds) {
        (ValuationThresholds::default(), QualityThresholds::default())
    }

    #[test]
    fn cheap_stock_rates_strong() {
        let (t, q) = thresholds();
        let mut f = Fundamentals::new("CHEAP");
        f.current_price = Some(20.0);
        f.trailing_pe = Some(9.0);
        f.forward_pe = Some(7.5);
        f.peg_ratio = Some(0.8);
        f.price_to_book = Some(1.1);
        f.enterprise_to_ebitda = Some(6.0);
        f.market_cap = Some(2_000.0);
        f.shares_outstanding = Some(100.0);
        f.free_cashflow = Some(200.0);

        let section = analyze_valuation(&f, 0.04, &t, &q);
        assert_eq!(section.kind, SectionKind::Valuation);
        assert_eq!(section.rating, Rating::Strong);
        assert!(section.signals.iter().all(|s| s.bullish));
        assert!((section.metrics["fcf_yield"].as_f64().unwrap() - 0.1).abs() < 1e-9);
        assert!(section.metrics["fair_value_estimate"].as_f64().unwrap() > 20.0);
    }

    #[test]
    fn expensive_stock_rates_caution() {
        let (t, q) = thresholds();
        let mut f = Fundamentals::new("RICH");
        f.current_price = Some(500.0);
        f.trailing_pe = Some(80.0);
        f.forward_pe = Some(90.0);
        f.peg_ratio = Some(4.0);
        f.price_to_book = Some(20.0);
        f.price_to_sales = Some(25.0);
        f.enterprise_to_ebitda = Some(55.0);

        let section = analyze_valuation(&f, 0.04, &t, &q);
        assert_eq!(section.rating, Rating::Caution);
        assert!(section.signals.iter().all(|s| !s.bullish));
    }

    #[test]
    fn negative_eps_flags_losses() {
        let (t, q) = thresholds();
        let mut f = Fundamentals::new("LOSS");
        f.trailing_eps = Some(-1.2);

        let section = analyze_valuation(&f, 0.04, &t, &q);
        assert_eq!(section.signals.len(), 1);
        assert_eq!(section.signals[0].name, "Negative Earnings");
    }

    #[test]
    fn empty_payload_is_moderate() {
        let (t, q) = thresholds();
        let section = analyze_valuation(&Fundamentals::new("NONE"), 0.04, &t, &q);
        assert_eq!(section.rating, Rating::Moderate);
        assert!(section.signals.is_empty());
        assert!(section.confidence < 0.5);
    }
}
