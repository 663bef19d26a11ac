use analysis_core::{AnalysisSection, Fundamentals, GrowthThresholds, SectionKind, SignalSet, ValuationThresholds};
use serde_json::json;

use crate::confidence;

const GROWTH_FIELDS: u32 = 4;

pub fn analyze_growth(f: &Fundamentals, t: &GrowthThresholds, v: &ValuationThresholds) -> AnalysisSection {
    let mut signals = SignalSet::new();
    let mut narrative = Vec::new();
    let mut metrics = serde_json::Map::new();
    let mut present = 0;

    if let Some(growth) = f.revenue_growth {
        present += 1;
        metrics.insert("revenue_growth".into(), json!(growth));
        let pct = growth * 100.0;
        if growth > t.revenue_strong {
            signals.push("Strong Revenue Growth", 3, true);
            narrative.push(format!("Revenue is growing {:.1}% year over year.", pct));
        } else if growth > t.revenue_moderate {
            signals.push("Revenue Growth", 2, true);
            narrative.push(format!("Revenue is growing a steady {:.1}%.", pct));
        } else if growth < t.revenue_decline {
            signals.push("Revenue Decline", 3, false);
            narrative.push(format!("Revenue is shrinking {:.1}% year over year.", pct.abs()));
        } else {
            narrative.push(format!("Revenue is roughly flat ({:+.1}%).", pct));
        }
    }

    if let Some(growth) = f.earnings_growth.or(f.earnings_quarterly_growth) {
        present += 1;
        metrics.insert("earnings_growth".into(), json!(growth));
        if growth > t.earnings_strong {
            signals.push("Strong Earnings Growth", 3, true);
            narrative.push(format!("Earnings grew {:.1}%.", growth * 100.0));
        } else if growth > 0.0 {
            signals.push("Earnings Growth", 1, true);
            narrative.push(format!("Earnings grew a modest {:.1}%.", growth * 100.0));
        } else if growth < t.earnings_decline {
            signals.push("Earnings Decline", 3, false);
            narrative.push(format!("Earnings fell {:.1}%.", growth.abs() * 100.0));
        } else {
            signals.push("Earnings Softness", 1, false);
            narrative.push(format!("Earnings slipped {:.1}%.", growth.abs() * 100.0));
        }
    }

    // Forward EPS against trailing EPS
    if let (Some(trailing), Some(forward)) = (f.trailing_eps, f.forward_eps) {
        present += 1;
        if trailing > 0.0 {
            let expansion = forward / trailing - 1.0;
            metrics.insert("eps_expansion".into(), json!(expansion));
            if expansion > t.eps_expansion {
                signals.push("Expected EPS Expansion", 2, true);
                narrative.push(format!(
                    "Analysts expect EPS to rise from {:.2} to {:.2}.",
                    trailing, forward
                ));
            } else if expansion < 0.0 {
                signals.push("Expected EPS Contraction", 2, false);
                narrative.push(format!(
                    "Analysts expect EPS to fall from {:.2} to {:.2}.",
                    trailing, forward
                ));
            }
        } else if forward > 0.0 {
            signals.push("Return to Profitability", 2, true);
            narrative.push("Forward estimates point to a return to positive earnings.".to_string());
        }
    }

    // Earnings growth relative to sales growth
    if let (Some(rev), Some(earn)) = (f.revenue_growth, f.earnings_growth) {
        present += 1;
        if rev > 0.0 && earn > rev * t.operating_leverage_ratio {
            signals.push("Operating Leverage", 1, true);
            narrative.push("Earnings are compounding faster than sales, margins are expanding.".to_string());
        } else if rev > 0.0 && earn < 0.0 {
            signals.push("Margin Compression", 2, false);
            narrative.push("Sales are growing but earnings are not keeping up.".to_string());
        }
    }

    // PEG as a growth-versus-price cross-check
    if let (Some(peg), Some(rev)) = (f.peg_ratio.filter(|p| *p > 0.0), f.revenue_growth) {
        if peg < v.peg_attractive && rev > t.revenue_moderate {
            signals.push("Growth at Reasonable Price", 1, true);
            narrative.push(format!("A PEG of {:.2} means that growth is not yet fully priced in.", peg));
        }
    }

    let confidence = confidence(signals.len(), present, GROWTH_FIELDS);
    AnalysisSection::from_signals(
        SectionKind::Growth,
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

    #[test]
    fn fast_grower_is_strong() {
        let mut f = Fundamentals::new("FAST");
        f.revenue_growth = Some(0.30);
        f.earnings_growth = Some(0.55);
        f.trailing_eps = Some(2.0);
        f.forward_eps = Some(2.6);

        let section = analyze_growth(&f, &GrowthThresholds::default(), &ValuationThresholds::default());
        assert_eq!(section.rating, Rating::Strong);
        assert_eq!(section.score, 100.0);
        assert!(section.signals.iter().any(|s| s.name == "Operating Leverage"));
    }

    #[test]
    fn shrinking_business_is_caution() {
        let mut f = Fundamentals::new("SLOW");
        f.revenue_growth = Some(-0.12);
        f.earnings_growth = Some(-0.30);
        f.trailing_eps = Some(3.0);
        f.forward_eps = Some(2.5);

        let section = analyze_growth(&f, &GrowthThresholds::default(), &ValuationThresholds::default());
        assert_eq!(section.rating, Rating::Caution);
        assert!(section.narrative[0].contains("shrinking"));
    }

    #[test]
    fn quarterly_growth_is_fallback() {
        let mut f = Fundamentals::new("QTR");
        f.earnings_quarterly_growth = Some(0.25);

        let section = analyze_growth(&f, &GrowthThresholds::default(), &ValuationThresholds::default());
        assert_eq!(section.signals.len(), 1);
        assert_eq!(section.signals[0].name, "Strong Earnings Growth");
    }

    #[test]
    fn reasonable_price_follows_peg_cutoff() {
        let mut f = Fundamentals::new("GARP");
        f.revenue_growth = Some(0.10);
        f.peg_ratio = Some(0.8);

        let growth = GrowthThresholds::default();
        let section = analyze_growth(&f, &growth, &ValuationThresholds::default());
        assert!(section.signals.iter().any(|s| s.name == "Growth at Reasonable Price"));

        let strict = ValuationThresholds {
            peg_attractive: 0.5,
            ..ValuationThresholds::default()
        };
        let section = analyze_growth(&f, &growth, &strict);
        assert!(!section.signals.iter().any(|s| s.name == "Growth at Reasonable Price"));
    }

    #[test]
    fn operating_leverage_ratio_is_configurable() {
        let mut f = Fundamentals::new("LEVER");
        f.revenue_growth = Some(0.10);
        f.earnings_growth = Some(0.18);

        let section = analyze_growth(&f, &GrowthThresholds::default(), &ValuationThresholds::default());
        assert!(section.signals.iter().any(|s| s.name == "Operating Leverage"));

        let loose = GrowthThresholds {
            operating_leverage_ratio: 2.0,
            ..GrowthThresholds::default()
        };
        let section = analyze_growth(&f, &loose, &ValuationThresholds::default());
        assert!(!section.signals.iter().any(|s| s.name == "Operating Leverage"));
    }
}
