use analysis_core::{
    AnalysisSection, AssetClass, CompleteAnalysis, Quote, Rating, SectionKind, SignalStrength, YieldCurve,
};
use chrono::{DateTime, Utc};
use fundamental_analysis::ratios::moat_verdict;

/// Everything the report is built from, already fetched and analyzed.
#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub symbol: String,
    pub name: Option<String>,
    pub asset_class: AssetClass,
    pub quote: Option<Quote>,
    pub sections: Vec<AnalysisSection>,
    pub yield_curve: Option<YieldCurve>,
    pub risk_free_rate: f64,
    pub generated_at: DateTime<Utc>,
}

/// Weight of each section in the overall score.
pub fn section_weight(kind: SectionKind) -> f64 {
    match kind {
        SectionKind::Valuation => 0.20,
        SectionKind::Growth => 0.15,
        SectionKind::Quality => 0.20,
        SectionKind::Risk => 0.15,
        SectionKind::Sentiment => 0.10,
        SectionKind::Technical => 0.20,
    }
}

/// Combine analyzed sections into the complete report. Weights are
/// renormalized over the sections that are present.
pub fn compose(inputs: ReportInputs) -> CompleteAnalysis {
    let total_weight: f64 = inputs.sections.iter().map(|s| section_weight(s.kind)).sum();
    let (overall_score, overall_confidence) = if total_weight > 0.0 {
        let score = inputs
            .sections
            .iter()
            .map(|s| s.score * section_weight(s.kind))
            .sum::<f64>()
            / total_weight;
        let confidence = inputs
            .sections
            .iter()
            .map(|s| s.confidence * section_weight(s.kind))
            .sum::<f64>()
            / total_weight;
        (score, confidence)
    } else {
        (0.0, 0.0)
    };

    let overall_signal = SignalStrength::from_score(overall_score.round() as i32);
    let overall_rating = Rating::from_score(overall_score);
    let summary = summarize(&inputs, overall_score, overall_rating, overall_signal, overall_confidence);

    CompleteAnalysis {
        symbol: inputs.symbol,
        name: inputs.name,
        asset_class: inputs.asset_class,
        generated_at: inputs.generated_at,
        quote: inputs.quote,
        sections: inputs.sections,
        overall_score,
        overall_signal,
        overall_rating,
        overall_confidence,
        summary,
        risk_free_rate: inputs.risk_free_rate,
    }
}

fn summarize(
    inputs: &ReportInputs,
    score: f64,
    rating: Rating,
    signal: SignalStrength,
    confidence: f64,
) -> Vec<String> {
    let mut lines = Vec::new();

    if inputs.sections.is_empty() {
        lines.push("No analysis sections were available.".to_string());
        return lines;
    }

    lines.push(format!(
        "Overall {} ({}), score {:+.0}, confidence {:.0}%.",
        rating,
        signal.to_label(),
        score,
        confidence * 100.0
    ));

    if inputs.sections.len() >= 2 {
        let by_score = |a: &&AnalysisSection, b: &&AnalysisSection| a.score.total_cmp(&b.score);
        if let Some(best) = inputs.sections.iter().max_by(by_score) {
            lines.push(format!(
                "Strongest area: {} ({}, {:+.0}).",
                best.kind.title(),
                best.rating,
                best.score
            ));
        }
        if let Some(worst) = inputs.sections.iter().min_by(by_score) {
            lines.push(format!(
                "Weakest area: {} ({}, {:+.0}).",
                worst.kind.title(),
                worst.rating,
                worst.score
            ));
        }
    }

    if let Some(quality) = inputs.sections.iter().find(|s| s.kind == SectionKind::Quality) {
        lines.extend(moat_line(quality));
    }

    if let Some(curve) = inputs.yield_curve.as_ref().filter(|c| c.is_inverted()) {
        let two = curve.get("2Y").map(|p| p.yield_pct).unwrap_or_default();
        let ten = curve.get("10Y").map(|p| p.yield_pct).unwrap_or_default();
        lines.push(format!(
            "Warning: the Treasury yield curve is inverted (2Y {:.2}% vs 10Y {:.2}%).",
            two, ten
        ));
    }

    lines
}

fn moat_line(quality: &AnalysisSection) -> Option<String> {
    let metrics = &quality.metrics;
    let score = metrics.get("moat_score")?.as_u64()?;
    let max = metrics.get("moat_max_score").and_then(|v| v.as_u64()).unwrap_or(5);
    let rating: Rating = serde_json::from_value(metrics.get("moat_rating")?.clone()).ok()?;

    let mut line = format!("Moat score {}/{} ({})", score, max, moat_verdict(rating));
    match metrics.get("eva_spread").and_then(|v| v.as_f64()) {
        Some(spread) if spread >= 0.0 => line.push_str(&format!(
            "; ROIC exceeds WACC by {:.1} points, EVA positive.",
            spread * 100.0
        )),
        Some(spread) => line.push_str(&format!(
            "; ROIC trails WACC by {:.1} points, EVA negative.",
            -spread * 100.0
        )),
        None => line.push('.'),
    }
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{BondYield, SignalSet};
    use chrono::NaiveDate;
    use serde_json::json;

    fn section(kind: SectionKind, bullish: usize, bearish: usize, confidence: f64) -> AnalysisSection {
        let mut signals = SignalSet::new();
        for i in 0..bullish {
            signals.push(format!("bull {}", i), 1, true);
        }
        for i in 0..bearish {
            signals.push(format!("bear {}", i), 1, false);
        }
        AnalysisSection::from_signals(kind, signals, Vec::new(), json!({}), confidence)
    }

    fn inputs(sections: Vec<AnalysisSection>) -> ReportInputs {
        ReportInputs {
            symbol: "TEST".to_string(),
            name: None,
            asset_class: AssetClass::Equity,
            quote: None,
            sections,
            yield_curve: None,
            risk_free_rate: 0.045,
            generated_at: Utc::now(),
        }
    }

    fn point(label: &str, pct: f64) -> BondYield {
        BondYield {
            series_id: label.to_string(),
            maturity_label: label.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 24).unwrap(),
            yield_pct: pct,
        }
    }

    #[test]
    fn weights_sum_to_one() {
        let total: f64 = [
            SectionKind::Valuation,
            SectionKind::Growth,
            SectionKind::Quality,
            SectionKind::Risk,
            SectionKind::Sentiment,
            SectionKind::Technical,
        ]
        .iter()
        .map(|k| section_weight(*k))
        .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn weights_renormalize_over_present_sections() {
        // Technical +100 (weight 0.20) and Sentiment -100 (weight 0.10)
        let report = compose(inputs(vec![
            section(SectionKind::Technical, 2, 0, 0.9),
            section(SectionKind::Sentiment, 0, 2, 0.3),
        ]));

        assert!((report.overall_score - 100.0 / 3.0).abs() < 1e-9);
        assert!((report.overall_confidence - 0.7).abs() < 1e-9);
        assert_eq!(report.overall_rating, Rating::Strong);
        assert_eq!(report.overall_signal, SignalStrength::Buy);
        assert!(report.summary[1].starts_with("Strongest area: Technicals"));
        assert!(report.summary[2].starts_with("Weakest area: Market Sentiment"));
    }

    #[test]
    fn empty_report_is_neutral() {
        let report = compose(inputs(Vec::new()));
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.overall_rating, Rating::Moderate);
        assert_eq!(report.overall_signal, SignalStrength::Neutral);
        assert_eq!(report.summary, vec!["No analysis sections were available.".to_string()]);
    }

    #[test]
    fn moat_and_curve_lines() {
        let mut quality = section(SectionKind::Quality, 3, 0, 0.8);
        quality.metrics = json!({
            "moat_score": 4,
            "moat_max_score": 5,
            "moat_rating": "Strong",
            "eva_spread": 0.123
        });
        let mut input = inputs(vec![quality, section(SectionKind::Risk, 1, 1, 0.5)]);
        input.yield_curve = Some(YieldCurve {
            points: vec![point("2Y", 4.95), point("10Y", 4.40)],
        });

        let report = compose(input);
        assert!(report
            .summary
            .iter()
            .any(|l| l == "Moat score 4/5 (wide moat); ROIC exceeds WACC by 12.3 points, EVA positive."));
        assert!(report.summary.last().unwrap().contains("inverted (2Y 4.95% vs 10Y 4.40%)"));
    }
}
