use analysis_core::{AnalysisSection, Fundamentals, QualityThresholds, SectionKind, SignalSet};
use serde_json::json;

use crate::confidence;
use crate::ratios::{eva, eva_spread, invested_capital, moat_score, roic, wacc};

const QUALITY_FIELDS: u32 = 6;

/// Margins, returns on capital, EVA and the moat verdict.
pub fn analyze_quality(f: &Fundamentals, risk_free_rate: f64, t: &QualityThresholds) -> AnalysisSection {
    let mut signals = SignalSet::new();
    let mut narrative = Vec::new();
    let mut metrics = serde_json::Map::new();
    let mut present = 0;

    if let Some(gm) = f.gross_margins {
        present += 1;
        metrics.insert("gross_margin".into(), json!(gm));
        if gm > t.gross_margin_high {
            signals.push("High Gross Margin", 2, true);
            narrative.push(format!("Gross margin of {:.1}% points to pricing power.", gm * 100.0));
        } else if gm < t.gross_margin_low {
            signals.push("Thin Gross Margin", 1, false);
            narrative.push(format!("Gross margin of {:.1}% leaves little cushion.", gm * 100.0));
        }
    }

    if let Some(om) = f.operating_margins {
        present += 1;
        metrics.insert("operating_margin".into(), json!(om));
        if om > t.operating_margin_high {
            signals.push("High Operating Margin", 2, true);
            narrative.push(format!("Operating margin is a healthy {:.1}%.", om * 100.0));
        } else if om < 0.0 {
            signals.push("Operating Losses", 3, false);
            narrative.push("The business loses money at the operating line.".to_string());
        } else if om < t.operating_margin_low {
            signals.push("Low Operating Margin", 1, false);
            narrative.push(format!("Operating margin is only {:.1}%.", om * 100.0));
        }
    }

    if let Some(pm) = f.profit_margins {
        present += 1;
        metrics.insert("profit_margin".into(), json!(pm));
        if pm > t.profit_margin_high {
            signals.push("High Net Margin", 1, true);
        } else if pm < t.profit_margin_low {
            signals.push("Low Net Margin", 1, false);
        }
    }

    if let Some(roe) = f.return_on_equity {
        present += 1;
        metrics.insert("return_on_equity".into(), json!(roe));
        if roe > t.roe_high {
            signals.push("High ROE", 2, true);
            narrative.push(format!("Return on equity of {:.1}% is strong.", roe * 100.0));
        } else if roe < t.roe_low {
            signals.push("Low ROE", 2, false);
            narrative.push(format!("Return on equity of {:.1}% is weak.", roe * 100.0));
        }
    }

    if let Some(roa) = f.return_on_assets {
        metrics.insert("return_on_assets".into(), json!(roa));
        if roa > t.roa_high {
            signals.push("High ROA", 1, true);
        }
    }

    let roic_value = roic(f, t.tax_rate);
    let wacc_value = wacc(f, risk_free_rate, t);

    if let Some(r) = roic_value {
        present += 1;
        metrics.insert("roic".into(), json!(r));
        if let Some(capital) = invested_capital(f) {
            metrics.insert("invested_capital".into(), json!(capital));
        }
        if r > t.roic_high {
            signals.push("High ROIC", 3, true);
            narrative.push(format!("Return on invested capital is {:.1}%.", r * 100.0));
        } else if r < t.roic_low {
            signals.push("Low ROIC", 2, false);
            narrative.push(format!("Return on invested capital is just {:.1}%.", r * 100.0));
        } else {
            narrative.push(format!("Return on invested capital is a middling {:.1}%.", r * 100.0));
        }
    }

    if let Some(w) = wacc_value {
        metrics.insert("wacc".into(), json!(w));
    }

    if let (Some(r), Some(w)) = (roic_value, wacc_value) {
        present += 1;
        let spread = eva_spread(r, w);
        metrics.insert("eva_spread".into(), json!(spread));
        if let Some(value) = eva(f, risk_free_rate, t) {
            metrics.insert("eva".into(), json!(value));
        }
        if spread > t.eva_positive_spread {
            signals.push("Value Creation (ROIC > WACC)", 3, true);
            narrative.push(format!(
                "ROIC exceeds the {:.1}% cost of capital by {:.1} points, the company is creating economic value.",
                w * 100.0,
                spread * 100.0
            ));
        } else if spread < 0.0 {
            signals.push("Value Destruction (ROIC < WACC)", 3, false);
            narrative.push(format!(
                "ROIC trails the {:.1}% cost of capital, growth at these returns destroys value.",
                w * 100.0
            ));
        } else {
            narrative.push("ROIC roughly matches the cost of capital.".to_string());
        }
    }

    let moat = moat_score(f, risk_free_rate, t);
    metrics.insert("moat_score".into(), json!(moat.score));
    metrics.insert("moat_max_score".into(), json!(moat.max_score));
    metrics.insert("moat_rating".into(), json!(moat.rating));
    narrative.push(format!(
        "Moat score {}/{}: {}.",
        moat.score,
        moat.max_score,
        moat.verdict()
    ));

    let confidence = confidence(signals.len(), present, QUALITY_FIELDS);
    AnalysisSection::from_signals(
        SectionKind::Quality,
        signals,
        narrative,
        serde_json::Value::Object(metrics),
        confidence,
    )
}
